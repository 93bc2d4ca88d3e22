use std::path::PathBuf;

/// Errors that can occur while locating or using a HID report channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No device matched the requested vendor, product and report length.
    #[error("no HID device {vendor_id:04x}:{product_id:04x} with {report_length}-byte reports")]
    NotFound {
        vendor_id: u16,
        product_id: u16,
        report_length: usize,
    },

    /// Failed to open the device node.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read device metadata during enumeration.
    #[error("failed to enumerate {path}: {source}")]
    Enumerate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on an open channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A report of the wrong size was handed to the channel for writing.
    #[error("report length mismatch ({len} bytes, channel uses {expected})")]
    WrongLength { len: usize, expected: usize },

    /// Report channels are not implemented for this platform.
    #[error("HID report channels are not supported on {0}")]
    UnsupportedPlatform(&'static str),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
