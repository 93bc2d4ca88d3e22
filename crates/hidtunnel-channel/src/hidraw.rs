use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::descriptor::{parse_report_lengths, ReportLengths};
use crate::error::{ChannelError, Result};
use crate::subchannel::SubChannel;
use crate::traits::{ChannelConfig, HidReportChannel};

const SYSFS_HIDRAW: &str = "/sys/class/hidraw";
const DEV_ROOT: &str = "/dev";

/// Metadata for one hidraw node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidrawInfo {
    /// Device node, e.g. `/dev/hidraw3`.
    pub node: PathBuf,
    /// USB vendor ID.
    pub vendor_id: u16,
    /// USB product ID.
    pub product_id: u16,
    /// `HID_NAME` reported by the kernel.
    pub name: String,
    /// Report lengths declared by the report descriptor.
    pub report_lengths: ReportLengths,
}

impl HidrawInfo {
    /// True if this node belongs to `config`'s device and carries its report length.
    pub fn matches(&self, config: &ChannelConfig) -> bool {
        self.vendor_id == config.vendor_id
            && self.product_id == config.product_id
            && self.report_lengths.supports(config.report_length)
    }
}

/// List every hidraw node on the system.
pub fn enumerate() -> Result<Vec<HidrawInfo>> {
    enumerate_in(Path::new(SYSFS_HIDRAW), Path::new(DEV_ROOT))
}

/// List hidraw nodes below `sys_root`, mapping them to nodes under `dev_root`.
///
/// Nodes whose metadata cannot be read are skipped.
pub fn enumerate_in(sys_root: &Path, dev_root: &Path) -> Result<Vec<HidrawInfo>> {
    let entries = match std::fs::read_dir(sys_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ChannelError::Enumerate {
                path: sys_root.to_path_buf(),
                source,
            })
        }
    };

    let mut devices = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ChannelError::Enumerate {
            path: sys_root.to_path_buf(),
            source,
        })?;
        let node_name = entry.file_name();
        let device_dir = entry.path().join("device");

        let uevent = match std::fs::read_to_string(device_dir.join("uevent")) {
            Ok(text) => text,
            Err(err) => {
                debug!(node = ?node_name, error = %err, "skipping hidraw node without uevent");
                continue;
            }
        };
        let Some((vendor_id, product_id)) = parse_hid_id(&uevent) else {
            debug!(node = ?node_name, "skipping hidraw node without HID_ID");
            continue;
        };
        let descriptor = match std::fs::read(device_dir.join("report_descriptor")) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(node = ?node_name, error = %err, "skipping hidraw node without descriptor");
                continue;
            }
        };

        devices.push(HidrawInfo {
            node: dev_root.join(&node_name),
            vendor_id,
            product_id,
            name: parse_uevent_field(&uevent, "HID_NAME")
                .unwrap_or_default()
                .to_string(),
            report_lengths: parse_report_lengths(&descriptor),
        });
    }

    devices.sort_by(|a, b| a.node.cmp(&b.node));
    Ok(devices)
}

/// Open the first hidraw node matching `config`.
pub fn open_report_channel(config: &ChannelConfig) -> Result<HidReportChannel> {
    let devices = enumerate()?;
    open_from(&devices, config)
}

/// Open the first entry of `devices` matching `config`.
pub fn open_from(devices: &[HidrawInfo], config: &ChannelConfig) -> Result<HidReportChannel> {
    let Some(info) = devices.iter().find(|d| d.matches(config)) else {
        return Err(ChannelError::NotFound {
            vendor_id: config.vendor_id,
            product_id: config.product_id,
            report_length: config.report_length,
        });
    };

    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&info.node)
        .map_err(|source| ChannelError::Open {
            path: info.node.clone(),
            source,
        })?;

    info!(
        node = ?info.node,
        name = %info.name,
        report_length = config.report_length,
        "opened report channel"
    );

    Ok(HidReportChannel::from_file(
        file,
        info.node.clone(),
        config.report_length,
        config.read_timeout,
    ))
}

/// All sub-channels of one receiver. Sub-channels that could not be opened
/// are `None`.
#[derive(Debug, Default)]
pub struct ReceiverChannels {
    pub hidpp_short: Option<HidReportChannel>,
    pub hidpp_long: Option<HidReportChannel>,
    pub dj_long: Option<HidReportChannel>,
}

impl ReceiverChannels {
    /// Take the sub-channel that carries the tunnel.
    pub fn take_long(&mut self) -> Option<HidReportChannel> {
        self.hidpp_long.take()
    }
}

/// Open every sub-channel of the receiver identified by `base`.
///
/// `base.report_length` is ignored; each sub-channel supplies its own.
pub fn open_receiver(base: &ChannelConfig) -> Result<ReceiverChannels> {
    let devices = enumerate()?;
    let mut channels = ReceiverChannels::default();

    for sub in SubChannel::ALL {
        let config = ChannelConfig {
            report_length: sub.report_length(),
            ..base.clone()
        };
        let opened = match open_from(&devices, &config) {
            Ok(channel) => Some(channel),
            Err(ChannelError::NotFound { .. }) => {
                debug!(subchannel = sub.name(), "sub-channel not present");
                None
            }
            Err(err) => return Err(err),
        };
        match sub {
            SubChannel::HidppShort => channels.hidpp_short = opened,
            SubChannel::HidppLong => channels.hidpp_long = opened,
            SubChannel::DjLong => channels.dj_long = opened,
        }
    }

    Ok(channels)
}

fn parse_uevent_field<'a>(uevent: &'a str, key: &str) -> Option<&'a str> {
    uevent.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k == key).then_some(v.trim())
    })
}

/// Parse `HID_ID=bus:vendor:product` (hex, 4/8/8 digits) into vendor and product.
fn parse_hid_id(uevent: &str) -> Option<(u16, u16)> {
    let value = parse_uevent_field(uevent, "HID_ID")?;
    let mut parts = value.split(':');
    let _bus = parts.next()?;
    let vendor = u32::from_str_radix(parts.next()?, 16).ok()?;
    let product = u32::from_str_radix(parts.next()?, 16).ok()?;
    Some((u16::try_from(vendor).ok()?, u16::try_from(product).ok()?))
}
