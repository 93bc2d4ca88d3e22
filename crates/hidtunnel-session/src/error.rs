/// Errors that end a tunnel session.
///
/// Protocol anomalies (foreign reports, duplicates) never surface here;
/// they are absorbed by the session. Only I/O failures on the device or the
/// shell do.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The report channel failed.
    #[error("channel error: {0}")]
    Channel(#[from] hidtunnel_channel::ChannelError),

    /// Writing to the shell failed.
    #[error("bridge error: {0}")]
    Bridge(#[from] hidtunnel_bridge::BridgeError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
