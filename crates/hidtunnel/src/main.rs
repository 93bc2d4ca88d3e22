mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "hidtunnel",
    version,
    about = "Shell tunnel over a Unifying receiver"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shell_subcommand_with_defaults() {
        let cli = Cli::try_parse_from(["hidtunnel", "shell"]).expect("shell args should parse");
        let Command::Shell(args) = cli.command else {
            panic!("expected shell subcommand");
        };
        assert_eq!(args.poll_interval, "4ms");
        assert_eq!(args.read_timeout, "100ms");
        assert!(!args.echo);
        assert!(!args.once);
        assert!(args.args.is_empty());
    }

    #[test]
    fn parses_device_ids_as_hex() {
        let cli = Cli::try_parse_from([
            "hidtunnel",
            "shell",
            "--vid",
            "0x046d",
            "--pid",
            "c534",
            "--echo",
            "--once",
        ])
        .expect("shell args should parse");
        let Command::Shell(args) = cli.command else {
            panic!("expected shell subcommand");
        };
        assert_eq!(args.device.vid, 0x046d);
        assert_eq!(args.device.pid, 0xc534);
        assert!(args.echo);
        assert!(args.once);
    }

    #[test]
    fn rejects_bad_device_id() {
        let err = Cli::try_parse_from(["hidtunnel", "shell", "--vid", "logitech"])
            .expect_err("non-hex vid should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["hidtunnel", "devices", "--all", "--format", "json"])
            .expect("devices args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Devices(ref args) if args.all));
    }
}
