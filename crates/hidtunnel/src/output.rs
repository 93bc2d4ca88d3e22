use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hidtunnel_session::SessionStats;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One hidraw node as listed by `hidtunnel devices`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceOutput {
    pub node: String,
    pub vendor_id: String,
    pub product_id: String,
    pub name: String,
    pub input_lengths: Vec<usize>,
    pub output_lengths: Vec<usize>,
    /// Receiver sub-channels this node can carry.
    pub subchannels: Vec<&'static str>,
}

pub fn print_devices(devices: &[DeviceOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(devices).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NODE", "ID", "NAME", "INPUT", "OUTPUT", "SUBCHANNEL"]);
            for device in devices {
                table.add_row(vec![
                    device.node.clone(),
                    format!("{}:{}", device.vendor_id, device.product_id),
                    device.name.clone(),
                    join_lengths(&device.input_lengths),
                    join_lengths(&device.output_lengths),
                    join_names(&device.subchannels),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for device in devices {
                println!(
                    "{} {}:{} \"{}\" in=[{}] out=[{}] subchannels={}",
                    device.node,
                    device.vendor_id,
                    device.product_id,
                    device.name,
                    join_lengths(&device.input_lengths),
                    join_lengths(&device.output_lengths),
                    join_names(&device.subchannels),
                );
            }
        }
        OutputFormat::Raw => {
            for device in devices {
                println!("{}", device.node);
            }
        }
    }
}

/// Print the counters of a finished session. Raw prints nothing so that
/// stdout stays pure traffic when `--echo` is on.
pub fn print_stats(run: u64, stats: &SessionStats, format: OutputFormat) {
    #[derive(Serialize)]
    struct StatsOutput<'a> {
        run: u64,
        #[serde(flatten)]
        stats: &'a SessionStats,
    }

    match format {
        OutputFormat::Json => {
            let out = StatsOutput { run, stats };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "RUN",
                    "READ",
                    "ACCEPTED",
                    "DUPLICATES",
                    "IN BYTES",
                    "SENT",
                    "RETRANSMITTED",
                    "OUT BYTES",
                    "PEAK QUEUE",
                ])
                .add_row(vec![
                    run.to_string(),
                    stats.reports_read.to_string(),
                    stats.frames_accepted.to_string(),
                    stats.duplicates.to_string(),
                    stats.bytes_delivered.to_string(),
                    stats.reports_sent.to_string(),
                    stats.retransmissions.to_string(),
                    stats.bytes_sent.to_string(),
                    stats.peak_queue_depth.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "run={} read={} accepted={} duplicates={} in_bytes={} sent={} retransmitted={} out_bytes={} peak_queue={}",
                run,
                stats.reports_read,
                stats.frames_accepted,
                stats.duplicates,
                stats.bytes_delivered,
                stats.reports_sent,
                stats.retransmissions,
                stats.bytes_sent,
                stats.peak_queue_depth,
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn join_lengths(lengths: &[usize]) -> String {
    lengths
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn join_names(names: &[&str]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_serializes_hex_ids() {
        let device = DeviceOutput {
            node: "/dev/hidraw1".to_string(),
            vendor_id: "046d".to_string(),
            product_id: "c52b".to_string(),
            name: "Logitech USB Receiver".to_string(),
            input_lengths: vec![7, 20, 32],
            output_lengths: vec![7, 20, 32],
            subchannels: vec!["HIDPP_SHORT", "HIDPP_LONG", "DJ_LONG"],
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["vendor_id"], "046d");
        assert_eq!(json["subchannels"][1], "HIDPP_LONG");
        assert_eq!(json["input_lengths"][1], 20);
    }

    #[test]
    fn lengths_are_comma_joined() {
        assert_eq!(join_lengths(&[7, 20, 32]), "7,20,32");
        assert_eq!(join_lengths(&[]), "");
        assert_eq!(join_names(&[]), "-");
    }
}
