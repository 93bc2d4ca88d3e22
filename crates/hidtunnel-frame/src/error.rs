/// Reasons a raw read is not a usable tunnel report.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// The read did not return exactly one full report.
    #[error("report length {len} (expected {expected})")]
    WrongLength { len: usize, expected: usize },

    /// Byte 2 carries neither the data nor the control marker.
    #[error("foreign report marker 0x{0:02x}")]
    ForeignMarker(u8),
}

pub type Result<T> = std::result::Result<T, FrameError>;
