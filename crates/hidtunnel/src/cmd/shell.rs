use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hidtunnel_bridge::{OutputBridge, ShellCommand, ShellEndpoint, ShellProcess};
use hidtunnel_channel::{ChannelConfig, HidReportChannel, SubChannel};
use hidtunnel_session::{Session, SessionConfig};
use tracing::{debug, info, warn};

use crate::cmd::ShellArgs;
use crate::exit::{bridge_error, channel_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_raw, print_stats, OutputFormat};

/// How long a finished run waits for its output readers to reach end of stream.
const READER_GRACE: Duration = Duration::from_millis(200);

pub fn run(args: ShellArgs, format: OutputFormat) -> CliResult<i32> {
    let poll_interval = parse_duration(&args.poll_interval)?;
    let read_timeout = parse_duration(&args.read_timeout)?;
    let command = shell_command(&args);

    let channel_config = ChannelConfig {
        vendor_id: args.device.vid,
        product_id: args.device.pid,
        report_length: SubChannel::HidppLong.report_length(),
        read_timeout: Some(read_timeout),
    };
    let session_config = SessionConfig::default().with_poll_interval(poll_interval);

    let mut channel = open_channel(&channel_config)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut runs = 0u64;
    while running.load(Ordering::SeqCst) {
        runs += 1;
        let process =
            ShellProcess::spawn(&command).map_err(|err| bridge_error("spawn failed", err))?;
        let pid = process.id();
        let bridge = OutputBridge::start(process, command.capture_stderr)
            .map_err(|err| bridge_error("bridge setup failed", err))?;
        let shell = Interruptible {
            inner: bridge,
            running: Arc::clone(&running),
        };

        let mut session = Session::with_config(&mut channel, shell, session_config.clone());
        if args.echo {
            session = session.with_tap(|_, data| print_raw(data));
        }
        let result = session.run();

        let (_, mut shell) = session.into_parts();
        if let Err(err) = shell.inner.terminate() {
            warn!(pid, error = %err, "failed to stop shell");
        }
        let detached = shell.inner.join_readers_timeout(READER_GRACE);
        if detached > 0 {
            warn!(pid, detached, "output pipe still held open, detaching reader");
        }
        let queue = shell.inner.queue();
        debug!(
            pid,
            output_bytes = queue.enqueued_bytes(),
            peak_queue_depth = queue.peak_depth(),
            unsent_chunks = queue.depth(),
            "shell output totals"
        );

        let stats = result.map_err(|err| session_error("session failed", err))?;
        if !args.echo {
            print_stats(runs, &stats, format);
        }

        if args.once || !running.load(Ordering::SeqCst) {
            break;
        }
        warn!(run = runs, pid, program = %command.program, "shell exited, restarting");
    }

    if !running.load(Ordering::SeqCst) {
        info!(runs, "interrupted, shutting down");
    }
    Ok(SUCCESS)
}

/// An output bridge that also stops when the process is interrupted.
struct Interruptible {
    inner: OutputBridge,
    running: Arc<AtomicBool>,
}

impl ShellEndpoint for Interruptible {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.inner.is_running()
    }

    fn write_stdin(&self, data: &[u8]) -> hidtunnel_bridge::Result<()> {
        self.inner.write_stdin(data)
    }

    fn take_chunk(&self) -> Option<Bytes> {
        self.inner.take_chunk()
    }

    fn queue_depth(&self) -> usize {
        self.inner.queue_depth()
    }
}

fn shell_command(args: &ShellArgs) -> ShellCommand {
    let command = match &args.shell {
        Some(program) => ShellCommand::new(program.as_str()),
        None => ShellCommand::default(),
    };
    command
        .with_args(args.args.iter().cloned())
        .with_stderr(!args.no_stderr)
}

#[cfg(target_os = "linux")]
fn open_channel(config: &ChannelConfig) -> CliResult<HidReportChannel> {
    use hidtunnel_channel::{open_receiver, ChannelError};

    let mut receiver =
        open_receiver(config).map_err(|err| channel_error("open failed", err))?;
    info!(
        hidpp_short = receiver.hidpp_short.is_some(),
        hidpp_long = receiver.hidpp_long.is_some(),
        dj_long = receiver.dj_long.is_some(),
        "receiver sub-channels"
    );

    receiver.take_long().ok_or_else(|| {
        channel_error(
            "open failed",
            ChannelError::NotFound {
                vendor_id: config.vendor_id,
                product_id: config.product_id,
                report_length: config.report_length,
            },
        )
    })
}

#[cfg(not(target_os = "linux"))]
fn open_channel(config: &ChannelConfig) -> CliResult<HidReportChannel> {
    hidtunnel_channel::open_report_channel(config)
        .map_err(|err| channel_error("open failed", err))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

/// Parse `250ms`, `2s` or a bare number of seconds.
fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, from_value): (&str, fn(u64) -> Duration) =
        if let Some(num) = input.strip_suffix("ms") {
            (num, Duration::from_millis)
        } else if let Some(num) = input.strip_suffix('s') {
            (num, Duration::from_secs)
        } else {
            (input, Duration::from_secs)
        };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(from_value(value))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cmd::DeviceArgs;

    fn shell_args(shell: Option<&str>, args: &[&str], no_stderr: bool) -> ShellArgs {
        ShellArgs {
            device: DeviceArgs {
                vid: 0x046d,
                pid: 0xc52b,
            },
            shell: shell.map(str::to_string),
            no_stderr,
            echo: false,
            once: false,
            poll_interval: "4ms".to_string(),
            read_timeout: "100ms".to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("4ms").unwrap(), Duration::from_millis(4));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0ms").unwrap_err().code, USAGE);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-5ms").is_err());
    }

    #[test]
    fn default_command_is_platform_shell() {
        let command = shell_command(&shell_args(None, &[], false));
        assert_eq!(command, ShellCommand::default());
    }

    #[test]
    fn command_carries_program_args_and_stderr_choice() {
        let command = shell_command(&shell_args(Some("/bin/bash"), &["--norc", "-i"], true));
        assert_eq!(command.program, "/bin/bash");
        assert_eq!(command.args, vec!["--norc", "-i"]);
        assert!(!command.capture_stderr);
    }

    #[test]
    #[cfg(unix)]
    fn interruption_stops_a_live_shell() {
        let process = ShellProcess::spawn(&ShellCommand::new("cat")).unwrap();
        let bridge = OutputBridge::start(process, true).unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let mut shell = Interruptible {
            inner: bridge,
            running: Arc::clone(&running),
        };
        assert!(shell.is_running());

        running.store(false, Ordering::SeqCst);
        assert!(!shell.is_running());
        shell.inner.terminate().unwrap();
        assert!(!shell.inner.is_running());
        assert_eq!(shell.inner.join_readers_timeout(READER_GRACE * 25), 0);
    }

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        shell: ShellArgs,
    }

    #[test]
    fn trailing_arguments_go_to_the_shell() {
        let parsed = Harness::try_parse_from(["x", "--shell", "/bin/sh", "--", "-c", "id"])
            .expect("shell args should parse");
        let command = shell_command(&parsed.shell);
        assert_eq!(command.args, vec!["-c", "id"]);
    }
}
