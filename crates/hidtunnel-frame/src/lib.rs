//! Bit-packed tunnel frames inside fixed 20-byte HID++ long reports.
//!
//! Every report carries:
//! - A preamble byte (the HID++ long report ID)
//! - The peer's device index
//! - A marker byte whose low bit flags control frames
//! - A packed byte with 2-bit sequence, 2-bit ack and 4-bit length/type
//! - Up to 16 payload bytes
//!
//! [`check_report`] screens raw reads; once a report passes, decoding and
//! encoding cannot fail.

pub mod codec;
pub mod error;

pub use codec::{
    check_report, decode, encode, encode_into, payload_len, Frame, CONTROL_FULL_PAYLOAD,
    CONTROL_MARKER, DATA_MARKER, HEADER_SIZE, MAX_PAYLOAD, PREAMBLE, REPORT_LEN,
};
pub use error::{FrameError, Result};
