use serde::Serialize;
use squid_client::MotorStatus;
use squid_frame::MAX_AXES;

use crate::cmd::{parse_duration, LinkOptions, StatusArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{flag, mask, print_json, print_table, OutputFormat};

#[derive(Serialize)]
pub struct StatusOutput<'a> {
    port: &'a str,
    active: u16,
    completed: u16,
    status_pins: u16,
    active_axes: Vec<u32>,
    completed_axes: Vec<u32>,
    idle: bool,
}

impl<'a> StatusOutput<'a> {
    pub fn new(port: &'a str, status: &MotorStatus) -> Self {
        Self {
            port,
            active: status.active,
            completed: status.completed,
            status_pins: status.status_pins,
            active_axes: status.active_axes(),
            completed_axes: status.completed_axes(),
            idle: status.is_idle(),
        }
    }
}

pub fn run(args: StatusArgs, link: &LinkOptions, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let (client, port) = link.open_with_command_timeout(timeout)?;

    let status = client
        .status()
        .map_err(|err| client_error("status request failed", err))?;

    print_status(&port, &status, format);
    Ok(SUCCESS)
}

pub fn print_status(port: &str, status: &MotorStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatusOutput::new(port, status)),
        OutputFormat::Table => {
            let rows = (1..=MAX_AXES as u32).map(|axis| {
                let pin = status.status_pins & (1 << (axis - 1)) != 0;
                vec![
                    axis.to_string(),
                    flag(status.is_active(axis)).to_string(),
                    flag(status.is_completed(axis)).to_string(),
                    u8::from(pin).to_string(),
                ]
            });
            print_table(vec!["AXIS", "ACTIVE", "COMPLETED", "STATUS PIN"], rows);
        }
        OutputFormat::Pretty => {
            println!("Active motors:    {}", mask(status.active));
            println!("Completed motors: {}", mask(status.completed));
            println!("STATUS pins:      {}", mask(status.status_pins));
        }
    }
}
