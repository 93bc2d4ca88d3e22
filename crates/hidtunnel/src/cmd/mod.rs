use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod devices;
pub mod shell;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tunnel a shell through the receiver until interrupted.
    Shell(ShellArgs),
    /// List hidraw devices and the report lengths they declare.
    Devices(DevicesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Shell(args) => shell::run(args, format),
        Command::Devices(args) => devices::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Which USB device to talk to.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// USB vendor ID (hex).
    #[arg(long, env = "HIDTUNNEL_VID", default_value = "046d", value_parser = parse_hex_id)]
    pub vid: u16,
    /// USB product ID (hex).
    #[arg(long, env = "HIDTUNNEL_PID", default_value = "c52b", value_parser = parse_hex_id)]
    pub pid: u16,
}

#[derive(Args, Debug)]
pub struct ShellArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Program to run as the shell. Defaults to the platform shell.
    #[arg(long, env = "HIDTUNNEL_SHELL")]
    pub shell: Option<String>,
    /// Do not forward the shell's stderr.
    #[arg(long)]
    pub no_stderr: bool,
    /// Copy tunnelled traffic in both directions to stdout.
    #[arg(long)]
    pub echo: bool,
    /// Exit when the shell exits instead of starting a new one.
    #[arg(long)]
    pub once: bool,
    /// Pause between polls (e.g. 4ms).
    #[arg(long, default_value = "4ms")]
    pub poll_interval: String,
    /// Upper bound for one report read (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub read_timeout: String,
    /// Arguments passed to the shell program.
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DevicesArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// List every hidraw node, not just the selected receiver.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a USB ID written as hex, with or without a `0x` prefix.
pub fn parse_hex_id(input: &str) -> Result<u16, String> {
    let input = input.trim();
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    u16::from_str_radix(digits, 16).map_err(|_| format!("invalid USB ID `{input}`"))
}
