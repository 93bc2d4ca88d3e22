//! Minimal HID report descriptor walker.
//!
//! Only the items needed to compute report sizes are interpreted: Report
//! Size, Report Count, Report ID, Push/Pop, and the Input/Output main items.
//! Everything else is skipped.

use std::collections::BTreeMap;

const LONG_ITEM_PREFIX: u8 = 0xfe;

const TYPE_MAIN: u8 = 0;
const TYPE_GLOBAL: u8 = 1;

const MAIN_INPUT: u8 = 0x8;
const MAIN_OUTPUT: u8 = 0x9;

const GLOBAL_REPORT_SIZE: u8 = 0x7;
const GLOBAL_REPORT_ID: u8 = 0x8;
const GLOBAL_REPORT_COUNT: u8 = 0x9;
const GLOBAL_PUSH: u8 = 0xa;
const GLOBAL_POP: u8 = 0xb;

/// Total report lengths (report ID byte included) declared by a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportLengths {
    /// Distinct input report lengths, ascending.
    pub input: Vec<usize>,
    /// Distinct output report lengths, ascending.
    pub output: Vec<usize>,
}

impl ReportLengths {
    /// True if the device both sends and accepts reports of `len` bytes.
    pub fn supports(&self, len: usize) -> bool {
        self.input.contains(&len) && self.output.contains(&len)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Globals {
    report_size: u32,
    report_count: u32,
    report_id: u8,
}

/// Walk `desc` and collect the byte length of every input and output report.
///
/// Truncated trailing items are ignored rather than rejected.
pub fn parse_report_lengths(desc: &[u8]) -> ReportLengths {
    let mut globals = Globals::default();
    let mut stack: Vec<Globals> = Vec::new();
    let mut input_bits: BTreeMap<u8, u32> = BTreeMap::new();
    let mut output_bits: BTreeMap<u8, u32> = BTreeMap::new();

    let mut pos = 0usize;
    while pos < desc.len() {
        let prefix = desc[pos];

        if prefix == LONG_ITEM_PREFIX {
            let Some(&data_len) = desc.get(pos + 1) else {
                break;
            };
            pos += 3 + usize::from(data_len);
            continue;
        }

        let size = match prefix & 0x03 {
            3 => 4,
            n => usize::from(n),
        };
        let Some(data) = desc.get(pos + 1..pos + 1 + size) else {
            break;
        };
        let value = data
            .iter()
            .rev()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));

        let item_type = (prefix >> 2) & 0x03;
        let tag = prefix >> 4;
        let field_bits = globals.report_size.saturating_mul(globals.report_count);

        match (item_type, tag) {
            (TYPE_MAIN, MAIN_INPUT) => {
                let bits = input_bits.entry(globals.report_id).or_default();
                *bits = bits.saturating_add(field_bits);
            }
            (TYPE_MAIN, MAIN_OUTPUT) => {
                let bits = output_bits.entry(globals.report_id).or_default();
                *bits = bits.saturating_add(field_bits);
            }
            (TYPE_GLOBAL, GLOBAL_REPORT_SIZE) => globals.report_size = value,
            (TYPE_GLOBAL, GLOBAL_REPORT_ID) => globals.report_id = value as u8,
            (TYPE_GLOBAL, GLOBAL_REPORT_COUNT) => globals.report_count = value,
            (TYPE_GLOBAL, GLOBAL_PUSH) => stack.push(globals),
            (TYPE_GLOBAL, GLOBAL_POP) => {
                if let Some(saved) = stack.pop() {
                    globals = saved;
                }
            }
            _ => {}
        }

        pos += 1 + size;
    }

    ReportLengths {
        input: to_lengths(&input_bits),
        output: to_lengths(&output_bits),
    }
}

fn to_lengths(bits: &BTreeMap<u8, u32>) -> Vec<usize> {
    let mut lengths: Vec<usize> = bits
        .iter()
        .map(|(&id, &bits)| (bits as usize).div_ceil(8) + usize::from(id != 0))
        .collect();
    lengths.sort_unstable();
    lengths.dedup();
    lengths
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Vendor collections of a Unifying receiver's HID++ interface.
    pub(crate) const RECEIVER_HIDPP_DESCRIPTOR: &[u8] = &[
        0x06, 0x00, 0xff, // usage page (vendor)
        0x09, 0x01, // usage
        0xa1, 0x01, // collection (application)
        0x85, 0x10, // report id 0x10
        0x75, 0x08, // report size 8
        0x95, 0x06, // report count 6
        0x15, 0x00, 0x26, 0xff, 0x00, // logical min/max
        0x09, 0x01, 0x81, 0x00, // input
        0x09, 0x01, 0x91, 0x00, // output
        0xc0, // end collection
        0x06, 0x00, 0xff, 0x09, 0x02, 0xa1, 0x01, //
        0x85, 0x11, // report id 0x11
        0x75, 0x08, 0x95, 0x13, // 19 bytes
        0x15, 0x00, 0x26, 0xff, 0x00, //
        0x09, 0x02, 0x81, 0x00, 0x09, 0x02, 0x91, 0x00, //
        0xc0, //
        0x06, 0x00, 0xff, 0x09, 0x04, 0xa1, 0x01, //
        0x85, 0x20, // report id 0x20, input only
        0x75, 0x08, 0x95, 0x0e, 0x09, 0x41, 0x81, 0x00, //
        0x85, 0x21, // report id 0x21
        0x95, 0x1f, 0x09, 0x42, 0x81, 0x00, 0x09, 0x42, 0x91, 0x00, //
        0xc0,
    ];

    #[test]
    fn receiver_descriptor_lengths() {
        let lengths = parse_report_lengths(RECEIVER_HIDPP_DESCRIPTOR);
        assert_eq!(lengths.input, vec![7, 15, 20, 32]);
        assert_eq!(lengths.output, vec![7, 20, 32]);
        assert!(lengths.supports(20));
        assert!(!lengths.supports(15));
    }

    #[test]
    fn unnumbered_reports_have_no_id_byte() {
        // boot keyboard style: 8 x 8 bit input, no report id
        let desc = [0x75, 0x08, 0x95, 0x08, 0x81, 0x00];
        let lengths = parse_report_lengths(&desc);
        assert_eq!(lengths.input, vec![8]);
        assert!(lengths.output.is_empty());
    }

    #[test]
    fn push_pop_restores_globals() {
        let desc = [
            0x75, 0x08, 0x95, 0x04, // size 8, count 4
            0xa4, // push
            0x95, 0x01, 0x81, 0x00, // 1 byte input
            0xb4, // pop
            0x91, 0x00, // 4 byte output
        ];
        let lengths = parse_report_lengths(&desc);
        assert_eq!(lengths.input, vec![1]);
        assert_eq!(lengths.output, vec![4]);
    }

    #[test]
    fn truncated_item_is_ignored() {
        let desc = [0x75, 0x08, 0x95, 0x02, 0x81, 0x00, 0x26, 0xff];
        let lengths = parse_report_lengths(&desc);
        assert_eq!(lengths.input, vec![2]);
    }

    #[test]
    fn long_items_are_skipped() {
        let desc = [0xfe, 0x02, 0x10, 0xaa, 0xbb, 0x75, 0x08, 0x95, 0x03, 0x91, 0x00];
        let lengths = parse_report_lengths(&desc);
        assert_eq!(lengths.output, vec![3]);
    }
}
