//! Stop-and-wait ARQ bookkeeping, independent of any I/O.

use bytes::Bytes;
use hidtunnel_frame::{Frame, MAX_PAYLOAD};

const SEQ_MODULUS: u8 = 4;

/// Sequence state of one tunnel session.
///
/// Both directions share a single report exchange: every inbound report is
/// answered by exactly one outbound report that acknowledges the inbound
/// side and carries (or repeats) the one outstanding outbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArqState {
    last_accepted_seq: u8,
    outbound_seq: u8,
    pending: Bytes,
}

/// Outcome of feeding one inbound frame to [`ArqState::on_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Payload to hand to the shell. `None` for duplicates and empty frames.
    pub delivered: Option<Bytes>,
    /// True if the inbound frame carried the next expected sequence.
    pub fresh: bool,
    /// True if the peer acknowledged the outstanding frame and a new one was prepared.
    pub advanced: bool,
    /// The frame to send in reply.
    pub reply: Frame,
}

impl Default for ArqState {
    fn default() -> Self {
        Self {
            // 3 means nothing accepted yet: the first expected sequence is 0
            last_accepted_seq: SEQ_MODULUS - 1,
            outbound_seq: 0,
            pending: Bytes::new(),
        }
    }
}

impl ArqState {
    /// Fresh state for a new session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence of the last inbound frame accepted.
    pub fn last_accepted_seq(&self) -> u8 {
        self.last_accepted_seq
    }

    /// Sequence of the outstanding outbound frame.
    pub fn outbound_seq(&self) -> u8 {
        self.outbound_seq
    }

    /// Payload of the outstanding outbound frame.
    pub fn pending_payload(&self) -> &Bytes {
        &self.pending
    }

    /// Sequence the next new inbound frame must carry.
    pub fn next_expected_seq(&self) -> u8 {
        (self.last_accepted_seq + 1) % SEQ_MODULUS
    }

    /// Process one inbound frame and build the reply.
    ///
    /// `next_chunk` is called at most once, and only when the peer has
    /// acknowledged the outstanding outbound frame.
    pub fn on_frame<F>(&mut self, frame: &Frame, next_chunk: F) -> Step
    where
        F: FnOnce() -> Option<Bytes>,
    {
        let fresh = frame.sequence == self.next_expected_seq();
        let mut delivered = None;
        if fresh {
            self.last_accepted_seq = frame.sequence;
            if !frame.payload.is_empty() {
                delivered = Some(frame.payload.clone());
            }
        }

        let advanced = frame.ack == self.outbound_seq;
        if advanced {
            self.outbound_seq = (self.outbound_seq + 1) % SEQ_MODULUS;
            self.pending = match next_chunk() {
                Some(chunk) if chunk.len() > MAX_PAYLOAD => chunk.slice(..MAX_PAYLOAD),
                Some(chunk) => chunk,
                None => Bytes::new(),
            };
        }

        let reply = Frame::with_payload(
            frame.device_index,
            self.outbound_seq,
            self.last_accepted_seq,
            self.pending.clone(),
        );

        Step {
            delivered,
            fresh,
            advanced,
            reply,
        }
    }
}
