/// Errors raised while running the child process bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The shell process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// A stdio pipe was not captured or was already taken.
    #[error("{0} pipe not available")]
    MissingPipe(&'static str),

    /// Writing to the child's stdin failed.
    #[error("bridge I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
