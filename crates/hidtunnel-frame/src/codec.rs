use bytes::Bytes;

use crate::error::{FrameError, Result};

/// Total size of a tunnel report: header (4) + payload (16) = 20 bytes.
pub const REPORT_LEN: usize = 20;

/// Header bytes preceding the payload.
pub const HEADER_SIZE: usize = 4;

/// Largest payload a single report can carry.
pub const MAX_PAYLOAD: usize = REPORT_LEN - HEADER_SIZE;

/// Byte 0 of every outbound report (HID++ long report ID).
pub const PREAMBLE: u8 = 0x11;

/// Byte 2 marker for data frames.
pub const DATA_MARKER: u8 = 0xba;

/// Byte 2 marker for control frames (data marker with bit 0 set).
pub const CONTROL_MARKER: u8 = DATA_MARKER | CONTROL_BIT;

/// Control type announcing a payload that fills all 16 bytes.
pub const CONTROL_FULL_PAYLOAD: u8 = 0;

const CONTROL_BIT: u8 = 0x01;
const SEQ_MASK: u8 = 0x03;
const ACK_SHIFT: u8 = 2;
const FIELD_SHIFT: u8 = 4;
const FIELD_MASK: u8 = 0x0f;

/// One tunnel frame, the decoded view of a 20-byte report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// Peer address byte, echoed back in replies.
    pub device_index: u8,
    /// Whether the 4-bit field is a control type instead of a length.
    pub is_control: bool,
    /// Sequence number, 0..=3.
    pub sequence: u8,
    /// Last sequence accepted from the other side, 0..=3.
    pub ack: u8,
    /// Control type; meaningful only when `is_control` is set.
    pub control_type: u8,
    /// Frame payload, at most [`MAX_PAYLOAD`] bytes.
    pub payload: Bytes,
}

impl Frame {
    /// A frame carrying `payload`, picking data or full-payload control form.
    ///
    /// Payloads longer than [`MAX_PAYLOAD`] are truncated.
    pub fn with_payload(device_index: u8, sequence: u8, ack: u8, payload: Bytes) -> Self {
        let payload = if payload.len() > MAX_PAYLOAD {
            payload.slice(..MAX_PAYLOAD)
        } else {
            payload
        };
        Self {
            device_index,
            is_control: payload.len() == MAX_PAYLOAD,
            sequence: sequence & SEQ_MASK,
            ack: ack & SEQ_MASK,
            control_type: CONTROL_FULL_PAYLOAD,
            payload,
        }
    }

    /// Value of the 4-bit length/control-type field as it goes on the wire.
    ///
    /// A data frame can express lengths up to 15 only; a 16-byte payload is
    /// sent as control type [`CONTROL_FULL_PAYLOAD`].
    pub fn length_field(&self) -> u8 {
        if self.is_control {
            self.control_type & FIELD_MASK
        } else {
            (self.payload.len() as u8) & FIELD_MASK
        }
    }
}

/// Number of payload bytes implied by a decoded header.
///
/// The 4-bit field is the length for every frame, except that control
/// type 0 stands for a full 16-byte payload.
pub fn payload_len(is_control: bool, field: u8) -> usize {
    match (is_control, field) {
        (true, CONTROL_FULL_PAYLOAD) => MAX_PAYLOAD,
        (_, len) => usize::from(len),
    }
}

/// Check that a raw read is a tunnel report.
///
/// The wire format has no checksum; this is the only integrity test. The
/// preamble byte is not inspected.
pub fn check_report(raw: &[u8]) -> Result<&[u8; REPORT_LEN]> {
    let report: &[u8; REPORT_LEN] = raw.try_into().map_err(|_| FrameError::WrongLength {
        len: raw.len(),
        expected: REPORT_LEN,
    })?;
    match report[2] {
        DATA_MARKER | CONTROL_MARKER => Ok(report),
        other => Err(FrameError::ForeignMarker(other)),
    }
}

/// Decode a report into a [`Frame`].
///
/// Never fails: any 20 bytes decode to some frame.
///
/// Report layout:
/// ```text
/// ┌──────────┬──────────┬──────────────┬───────────────────────┬──────────────┐
/// │ 0        │ 1        │ 2            │ 3                     │ 4..20        │
/// │ preamble │ dev idx  │ marker|ctrl  │ len/type:4 ack:2 seq:2│ payload      │
/// └──────────┴──────────┴──────────────┴───────────────────────┴──────────────┘
/// ```
pub fn decode(report: &[u8; REPORT_LEN]) -> Frame {
    let is_control = report[2] & CONTROL_BIT != 0;
    let bitmask = report[3];
    let field = (bitmask >> FIELD_SHIFT) & FIELD_MASK;
    let len = payload_len(is_control, field);

    Frame {
        device_index: report[1],
        is_control,
        sequence: bitmask & SEQ_MASK,
        ack: (bitmask >> ACK_SHIFT) & SEQ_MASK,
        control_type: if is_control { field } else { 0 },
        payload: Bytes::copy_from_slice(&report[HEADER_SIZE..HEADER_SIZE + len]),
    }
}

/// Encode `frame` into a reused report buffer.
///
/// Bytes after the payload keep whatever the buffer held before.
pub fn encode_into(frame: &Frame, report: &mut [u8; REPORT_LEN]) {
    report[0] = PREAMBLE;
    report[1] = frame.device_index;
    report[2] = if frame.is_control {
        report_marker(report[2]) | CONTROL_BIT
    } else {
        report_marker(report[2]) & !CONTROL_BIT
    };
    report[3] = (frame.sequence & SEQ_MASK)
        | ((frame.ack & SEQ_MASK) << ACK_SHIFT)
        | (frame.length_field() << FIELD_SHIFT);

    let len = frame.payload.len().min(MAX_PAYLOAD);
    report[HEADER_SIZE..HEADER_SIZE + len].copy_from_slice(&frame.payload[..len]);
}

/// Encode `frame` into a fresh, zero-padded report.
pub fn encode(frame: &Frame) -> [u8; REPORT_LEN] {
    let mut report = [0u8; REPORT_LEN];
    report[2] = DATA_MARKER;
    encode_into(frame, &mut report);
    report
}

/// Base marker to keep in byte 2; anything foreign is reset to the data marker.
fn report_marker(current: u8) -> u8 {
    match current {
        DATA_MARKER | CONTROL_MARKER => current,
        _ => DATA_MARKER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(seq: u8, ack: u8, payload: &'static [u8]) -> Frame {
        Frame::with_payload(0x03, seq, ack, Bytes::from_static(payload))
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for len in 0..=MAX_PAYLOAD {
            let payload: Vec<u8> = (0..len as u8).map(|b| b.wrapping_mul(7)).collect();
            let original = Frame::with_payload(0x02, (len % 4) as u8, 3, Bytes::from(payload));
            let report = encode(&original);
            assert_eq!(decode(&report), original, "payload length {len}");
        }
    }

    #[test]
    fn test_header_layout() {
        let report = encode(&frame(2, 1, b"abc"));

        assert_eq!(report[0], PREAMBLE);
        assert_eq!(report[1], 0x03);
        assert_eq!(report[2], DATA_MARKER);
        assert_eq!(report[3], 2 | (1 << 2) | (3 << 4));
        assert_eq!(&report[4..7], b"abc");
        assert!(report[7..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_full_payload_uses_control_type_zero() {
        let report = encode(&frame(1, 0, b"0123456789abcdef"));

        assert_eq!(report[2], CONTROL_MARKER);
        assert_eq!(report[3] >> 4, CONTROL_FULL_PAYLOAD);

        let decoded = decode(&report);
        assert!(decoded.is_control);
        assert_eq!(decoded.payload.as_ref(), b"0123456789abcdef");
    }

    #[test]
    fn test_empty_frame_is_data_frame() {
        let decoded = decode(&encode(&frame(0, 0, b"")));
        assert!(!decoded.is_control);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_oversized_payload_truncated() {
        let f = frame(0, 0, b"0123456789abcdefXYZ");
        assert_eq!(f.payload.len(), MAX_PAYLOAD);
        assert!(f.is_control);
    }

    #[test]
    fn test_sequence_and_ack_wrap() {
        let f = frame(5, 7, b"x");
        assert_eq!(f.sequence, 1);
        assert_eq!(f.ack, 3);
    }

    #[test]
    fn test_encode_into_clears_control_bit() {
        let mut report = [0u8; REPORT_LEN];
        report[2] = DATA_MARKER;
        encode_into(&frame(0, 0, b"0123456789abcdef"), &mut report);
        assert_eq!(report[2], CONTROL_MARKER);

        encode_into(&frame(1, 0, b"hi"), &mut report);
        assert_eq!(report[2], DATA_MARKER);
        // stale bytes past the payload are left alone
        assert_eq!(&report[4..8], b"hi23");
        assert_eq!(decode(&report).payload.as_ref(), b"hi");
    }

    #[test]
    fn test_nonzero_control_type_is_payload_length() {
        let mut report = [0u8; REPORT_LEN];
        report[2] = CONTROL_MARKER;
        report[3] = 0x50;
        report[4..9].copy_from_slice(b"hello");
        report[9] = b'!';

        let decoded = decode(&report);
        assert!(decoded.is_control);
        assert_eq!(decoded.control_type, 5);
        assert_eq!(decoded.payload.as_ref(), b"hello");
        assert_eq!(decoded.length_field(), 5);
        assert_eq!(encode(&decoded), {
            let mut expected = report;
            expected[0] = PREAMBLE;
            expected[9] = 0;
            expected
        });
    }

    #[test]
    fn test_payload_len_mapping() {
        assert_eq!(payload_len(true, CONTROL_FULL_PAYLOAD), MAX_PAYLOAD);
        assert_eq!(payload_len(true, 7), 7);
        assert_eq!(payload_len(false, 0), 0);
        assert_eq!(payload_len(false, 15), 15);
    }

    #[test]
    fn test_check_report_wrong_length() {
        let err = check_report(&[0x11, 0x01, 0xba]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::WrongLength {
                len: 3,
                expected: 20
            }
        ));
    }

    #[test]
    fn test_check_report_foreign_marker() {
        let mut raw = [0u8; REPORT_LEN];
        raw[2] = 0x8f;
        assert!(matches!(
            check_report(&raw),
            Err(FrameError::ForeignMarker(0x8f))
        ));

        raw[2] = CONTROL_MARKER;
        assert!(check_report(&raw).is_ok());
    }
}
