use serde::Serialize;

use crate::cmd::{parse_duration, LinkOptions, StopArgs};
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct StopOutput {
    port: String,
    stopped: bool,
}

pub fn run(args: StopArgs, link: &LinkOptions, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let (client, port) = link.open_with_command_timeout(timeout)?;

    let stopped = client
        .stop()
        .map_err(|err| client_error("stop request failed", err))?;

    let out = StopOutput { port, stopped };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["PORT", "STOPPED"],
            [vec![out.port.clone(), out.stopped.to_string()]],
        ),
        OutputFormat::Pretty if stopped => println!("Stop command sent successfully"),
        OutputFormat::Pretty => {}
    }

    if !stopped {
        return Err(CliError::new(
            FAILURE,
            "controller did not acknowledge stop",
        ));
    }
    Ok(SUCCESS)
}
