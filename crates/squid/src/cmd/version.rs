use serde::Serialize;

use crate::cmd::{parse_duration, LinkOptions, VersionArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct VersionOutput {
    port: String,
    /// `None` when the controller answered without a version byte.
    firmware: Option<String>,
    major: Option<u8>,
    minor: Option<u8>,
}

pub fn run(args: VersionArgs, link: &LinkOptions, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let (client, port) = link.open_with_command_timeout(timeout)?;

    let version = client
        .version()
        .map_err(|err| client_error("version request failed", err))?;

    let out = VersionOutput {
        port,
        firmware: version.map(|v| v.to_string()),
        major: version.map(|v| v.major),
        minor: version.map(|v| v.minor),
    };
    let firmware = out.firmware.as_deref().unwrap_or("unknown");

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["PORT", "FIRMWARE"],
            [vec![out.port.as_str(), firmware]],
        ),
        OutputFormat::Pretty => println!("Firmware version: {firmware}"),
    }
    Ok(SUCCESS)
}
