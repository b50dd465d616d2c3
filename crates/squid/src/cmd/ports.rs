use serde::Serialize;
use squid_transport::serial::pick_port;
use squid_transport::{available_ports, PortInfo};

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{flag, print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'static str,
    vid: Option<u16>,
    pid: Option<u16>,
    manufacturer: Option<&'a str>,
    product: Option<&'a str>,
    detected: bool,
}

impl<'a> PortOutput<'a> {
    fn new(port: &'a PortInfo, detected: Option<&str>) -> Self {
        Self {
            name: &port.name,
            kind: port.kind,
            vid: port.vid,
            pid: port.pid,
            manufacturer: port.manufacturer.as_deref(),
            product: port.product.as_deref(),
            detected: detected == Some(port.name.as_str()),
        }
    }

    fn usb_id(&self) -> String {
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
            _ => "-".to_string(),
        }
    }
}

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = available_ports()
        .map_err(|err| transport_error("port enumeration failed", err))?;
    let detected = pick_port(&ports);
    let out: Vec<PortOutput<'_>> = ports
        .iter()
        .map(|port| PortOutput::new(port, detected.as_deref()))
        .collect();

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["PORT", "TYPE", "USB ID", "PRODUCT", "DETECTED"],
            out.iter().map(|p| {
                vec![
                    p.name.to_string(),
                    p.kind.to_string(),
                    p.usb_id(),
                    p.product.or(p.manufacturer).unwrap_or("-").to_string(),
                    flag(p.detected).to_string(),
                ]
            }),
        ),
        OutputFormat::Pretty => {
            if out.is_empty() {
                println!("No serial ports found");
            }
            for port in &out {
                let marker = if port.detected { " (auto-detected)" } else { "" };
                println!("{} [{} {}]{marker}", port.name, port.kind, port.usb_id());
            }
        }
    }
    Ok(SUCCESS)
}
