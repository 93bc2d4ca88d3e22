use hidtunnel_bridge::ShellEndpoint;
use hidtunnel_channel::ReportChannel;
use hidtunnel_frame::{check_report, decode, encode_into, Frame, DATA_MARKER, REPORT_LEN};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::arq::ArqState;
use crate::config::SessionConfig;
use crate::error::Result;

/// Direction of tunnelled payload, as reported to a traffic tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Payload received from the peer and written to the shell.
    Inbound,
    /// Shell output taken from the queue and sent to the peer.
    Outbound,
}

type Tap = Box<dyn FnMut(Direction, &[u8]) + Send>;

/// Counters for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub reports_read: u64,
    pub reports_ignored: u64,
    pub read_timeouts: u64,
    pub frames_accepted: u64,
    pub duplicates: u64,
    pub bytes_delivered: u64,
    pub reports_sent: u64,
    pub frames_advanced: u64,
    pub retransmissions: u64,
    pub bytes_sent: u64,
    /// Deepest output queue observed at a poll. Grows without bound when
    /// the shell outpaces the link.
    pub peak_queue_depth: usize,
}

/// One tunnel session: a report channel, a shell, and the ARQ state
/// between them.
///
/// A session lives as long as its shell. When the shell exits, build a new
/// session for the next one.
pub struct Session<C, S> {
    channel: C,
    shell: S,
    config: SessionConfig,
    state: ArqState,
    out_report: [u8; REPORT_LEN],
    stats: SessionStats,
    tap: Option<Tap>,
}

impl<C: ReportChannel, S: ShellEndpoint> Session<C, S> {
    /// Create a session with default configuration.
    pub fn new(channel: C, shell: S) -> Self {
        Self::with_config(channel, shell, SessionConfig::default())
    }

    /// Create a session with explicit configuration.
    pub fn with_config(channel: C, shell: S, config: SessionConfig) -> Self {
        let mut out_report = [0u8; REPORT_LEN];
        out_report[2] = DATA_MARKER;
        Self {
            channel,
            shell,
            config,
            state: ArqState::new(),
            out_report,
            stats: SessionStats::default(),
            tap: None,
        }
    }

    /// Observe every payload delivered to or taken from the shell.
    ///
    /// Retransmissions are not reported again.
    pub fn with_tap(mut self, tap: impl FnMut(Direction, &[u8]) + Send + 'static) -> Self {
        self.tap = Some(Box::new(tap));
        self
    }

    /// Poll until the shell exits, then return the session counters.
    pub fn run(&mut self) -> Result<SessionStats> {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "tunnel session started"
        );

        while self.shell.is_running() {
            self.poll_once()?;
            std::thread::sleep(self.config.poll_interval);
        }

        info!(
            reports_read = self.stats.reports_read,
            bytes_delivered = self.stats.bytes_delivered,
            bytes_sent = self.stats.bytes_sent,
            peak_queue_depth = self.stats.peak_queue_depth,
            "tunnel session ended"
        );
        Ok(self.stats.clone())
    }

    /// Read at most one report and answer it. Does not sleep.
    ///
    /// Returns the reply frame, or `None` if nothing was sent.
    pub fn poll_once(&mut self) -> Result<Option<Frame>> {
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.shell.queue_depth());

        match self.channel.read_report()? {
            Some(raw) => self.handle_report(&raw),
            None => {
                self.stats.read_timeouts += 1;
                Ok(None)
            }
        }
    }

    /// Process one raw report and write the reply.
    ///
    /// Reports of the wrong length or with a foreign marker are ignored
    /// without touching the session state.
    pub fn handle_report(&mut self, raw: &[u8]) -> Result<Option<Frame>> {
        self.stats.reports_read += 1;

        let report = match check_report(raw) {
            Ok(report) => report,
            Err(reason) => {
                self.stats.reports_ignored += 1;
                trace!(%reason, "ignoring report");
                return Ok(None);
            }
        };

        let inbound = decode(report);
        let shell = &self.shell;
        let step = self.state.on_frame(&inbound, || shell.take_chunk());

        trace!(
            seq = inbound.sequence,
            ack = inbound.ack,
            len = inbound.payload.len(),
            fresh = step.fresh,
            advanced = step.advanced,
            "inbound frame"
        );

        if step.fresh {
            self.stats.frames_accepted += 1;
        } else {
            self.stats.duplicates += 1;
            debug!(seq = inbound.sequence, "duplicate frame, payload dropped");
        }

        if let Some(payload) = &step.delivered {
            self.shell.write_stdin(payload)?;
            self.stats.bytes_delivered += payload.len() as u64;
            if let Some(tap) = self.tap.as_mut() {
                tap(Direction::Inbound, &payload[..]);
            }
        }

        if step.advanced {
            self.stats.frames_advanced += 1;
            self.stats.bytes_sent += step.reply.payload.len() as u64;
            if !step.reply.payload.is_empty() {
                if let Some(tap) = self.tap.as_mut() {
                    tap(Direction::Outbound, &step.reply.payload[..]);
                }
            }
        } else {
            self.stats.retransmissions += 1;
        }

        encode_into(&step.reply, &mut self.out_report);
        self.channel.write_report(&self.out_report)?;
        self.stats.reports_sent += 1;

        Ok(Some(step.reply))
    }

    /// ARQ state, for inspection.
    pub fn state(&self) -> &ArqState {
        &self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Borrow the report channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Borrow the shell endpoint.
    pub fn shell(&self) -> &S {
        &self.shell
    }

    /// Consume the session and return its parts.
    pub fn into_parts(self) -> (C, S) {
        (self.channel, self.shell)
    }
}
