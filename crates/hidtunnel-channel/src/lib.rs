//! Fixed-length HID report channels.
//!
//! A report channel moves whole reports of one fixed size in both
//! directions. A Unifying receiver exposes three of them, told apart only by
//! report length:
//! - HID++ short (7 bytes)
//! - HID++ long (20 bytes)
//! - DJ long (32 bytes)
//!
//! This is the lowest layer of hidtunnel. Everything else builds on top of
//! the [`ReportChannel`] trait provided here.

pub mod descriptor;
pub mod error;
pub mod subchannel;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod hidraw;

pub use descriptor::{parse_report_lengths, ReportLengths};
pub use error::{ChannelError, Result};
pub use subchannel::{SubChannel, RECEIVER_PRODUCT_ID, RECEIVER_VENDOR_ID};
pub use traits::{ChannelConfig, HidReportChannel, ReportChannel};

#[cfg(target_os = "linux")]
pub use hidraw::{enumerate, open_receiver, open_report_channel, HidrawInfo, ReceiverChannels};

/// Open the first device matching `config`.
#[cfg(not(target_os = "linux"))]
pub fn open_report_channel(_config: &ChannelConfig) -> Result<HidReportChannel> {
    Err(ChannelError::UnsupportedPlatform(std::env::consts::OS))
}
