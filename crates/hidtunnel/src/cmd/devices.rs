use crate::cmd::DevicesArgs;
use crate::exit::CliResult;
use crate::output::OutputFormat;

#[cfg(target_os = "linux")]
pub fn run(args: DevicesArgs, format: OutputFormat) -> CliResult<i32> {
    use hidtunnel_channel::{enumerate, HidrawInfo, SubChannel};
    use tracing::debug;

    use crate::exit::{channel_error, SUCCESS};
    use crate::output::{print_devices, DeviceOutput};

    let devices = enumerate().map_err(|err| channel_error("enumeration failed", err))?;
    debug!(count = devices.len(), "enumerated hidraw nodes");

    let is_selected = |info: &HidrawInfo| {
        info.vendor_id == args.device.vid && info.product_id == args.device.pid
    };

    let listed: Vec<DeviceOutput> = devices
        .iter()
        .filter(|info| args.all || is_selected(info))
        .map(|info| DeviceOutput {
            node: info.node.display().to_string(),
            vendor_id: format!("{:04x}", info.vendor_id),
            product_id: format!("{:04x}", info.product_id),
            name: info.name.clone(),
            input_lengths: info.report_lengths.input.clone(),
            output_lengths: info.report_lengths.output.clone(),
            subchannels: if is_selected(info) {
                SubChannel::ALL
                    .into_iter()
                    .filter(|sub| info.report_lengths.supports(sub.report_length()))
                    .map(SubChannel::name)
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    print_devices(&listed, format);
    Ok(SUCCESS)
}

#[cfg(not(target_os = "linux"))]
pub fn run(_args: DevicesArgs, _format: OutputFormat) -> CliResult<i32> {
    use hidtunnel_channel::ChannelError;

    use crate::exit::channel_error;

    Err(channel_error(
        "enumeration failed",
        ChannelError::UnsupportedPlatform(std::env::consts::OS),
    ))
}
