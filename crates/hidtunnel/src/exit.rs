use std::fmt;
use std::io;

use hidtunnel_bridge::BridgeError;
use hidtunnel_channel::ChannelError;
use hidtunnel_session::SessionError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DEVICE_NOT_FOUND: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const UNSUPPORTED: i32 = 69;
pub const INTERNAL: i32 = 125;
pub const SPAWN_FAILED: i32 = 127;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => DEVICE_NOT_FOUND,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Open { source, .. } | ChannelError::Io(source) => {
            io_error(context, source)
        }
        ChannelError::NotFound { .. } => {
            CliError::new(DEVICE_NOT_FOUND, format!("{context}: {err}"))
        }
        ChannelError::UnsupportedPlatform(_) => {
            CliError::new(UNSUPPORTED, format!("{context}: {err}"))
        }
        ChannelError::WrongLength { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn bridge_error(context: &str, err: BridgeError) -> CliError {
    match err {
        BridgeError::Spawn { .. } => CliError::new(SPAWN_FAILED, format!("{context}: {err}")),
        BridgeError::MissingPipe(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        BridgeError::Io(source) => CliError::new(FAILURE, format!("{context}: {source}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Channel(err) => channel_error(context, err),
        SessionError::Bridge(err) => bridge_error(context, err),
    }
}
