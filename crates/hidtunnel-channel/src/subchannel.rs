//! Logical sub-channels of a Unifying receiver.
//!
//! The receiver multiplexes several report streams over one USB interface.
//! They are distinguished purely by report length.

/// Logitech USB vendor ID.
pub const RECEIVER_VENDOR_ID: u16 = 0x046d;

/// Unifying receiver product ID.
pub const RECEIVER_PRODUCT_ID: u16 = 0xc52b;

/// A receiver sub-channel, identified by its fixed report length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubChannel {
    /// HID++ short reports (report ID 0x10).
    HidppShort,
    /// HID++ long reports (report ID 0x11). Carries the tunnel.
    HidppLong,
    /// DJ long reports (report ID 0x21).
    DjLong,
}

impl SubChannel {
    /// All sub-channels, shortest first.
    pub const ALL: [SubChannel; 3] = [Self::HidppShort, Self::HidppLong, Self::DjLong];

    /// Total report length in bytes, including the report ID.
    pub const fn report_length(self) -> usize {
        match self {
            Self::HidppShort => 7,
            Self::HidppLong => 20,
            Self::DjLong => 32,
        }
    }

    /// Report ID placed in byte 0 of every report on this sub-channel.
    pub const fn report_id(self) -> u8 {
        match self {
            Self::HidppShort => 0x10,
            Self::HidppLong => 0x11,
            Self::DjLong => 0x21,
        }
    }

    /// Look up a sub-channel by report length.
    pub fn from_report_length(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.report_length() == len)
    }

    /// Human-readable name for logs and listings.
    pub const fn name(self) -> &'static str {
        match self {
            Self::HidppShort => "HIDPP_SHORT",
            Self::HidppLong => "HIDPP_LONG",
            Self::DjLong => "DJ_LONG",
        }
    }
}
