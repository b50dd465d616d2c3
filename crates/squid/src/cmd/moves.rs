use std::time::{Duration, Instant};

use serde::Serialize;
use squid_client::MotorCommand;
use squid_frame::MAX_AXES;
use tracing::warn;

use crate::cmd::{parse_duration, parse_motor_spec, LinkOptions, MoveArgs, MultiMoveArgs};
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct AxisOutput {
    axis: u32,
    acceleration: u32,
    max_speed: u32,
    steps: u32,
}

impl From<&MotorCommand> for AxisOutput {
    fn from(motor: &MotorCommand) -> Self {
        Self {
            axis: motor.axis,
            acceleration: motor.acceleration,
            max_speed: motor.max_speed,
            steps: motor.steps,
        }
    }
}

#[derive(Serialize)]
struct MoveOutput {
    port: String,
    mode: &'static str,
    accepted: bool,
    elapsed_ms: f64,
    axes: Vec<AxisOutput>,
}

pub fn run_move(args: MoveArgs, link: &LinkOptions, format: OutputFormat) -> CliResult<i32> {
    let motor = MotorCommand::new(args.motor, args.accel, args.speed, args.steps);
    let timeout = parse_duration(&args.timeout)?;
    execute(&[motor], args.async_mode, timeout, link, format)
}

pub fn run_multi(args: MultiMoveArgs, link: &LinkOptions, format: OutputFormat) -> CliResult<i32> {
    let motors = args
        .motors
        .iter()
        .map(|spec| parse_motor_spec(spec))
        .collect::<CliResult<Vec<_>>>()?;
    let timeout = parse_duration(&args.timeout)?;
    execute(&motors, args.async_mode, timeout, link, format)
}

fn execute(
    motors: &[MotorCommand],
    async_mode: bool,
    timeout: Duration,
    link: &LinkOptions,
    format: OutputFormat,
) -> CliResult<i32> {
    // The controller validates axes itself; out-of-range input is passed through.
    if motors.len() > MAX_AXES {
        warn!(
            axes = motors.len(),
            max = MAX_AXES,
            "more axes than the controller drives"
        );
    }
    let in_range = |axis: u32| (1..=MAX_AXES as u32).contains(&axis);
    if let Some(motor) = motors.iter().find(|m| !in_range(m.axis)) {
        warn!(axis = motor.axis, "axis outside 1..={MAX_AXES}");
    }

    let (client, port) = link.open(Default::default())?;

    let started = Instant::now();
    let result = if async_mode {
        client.async_move_with_timeout(motors, timeout)
    } else {
        client.sync_move_with_timeout(motors, timeout)
    };
    let accepted = result
        .map_err(|err| client_error("move request failed", err))?;
    let elapsed = started.elapsed();

    let out = MoveOutput {
        port,
        mode: if async_mode { "async" } else { "sync" },
        accepted,
        elapsed_ms: (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
        axes: motors.iter().map(AxisOutput::from).collect(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["AXIS", "ACCEL", "SPEED", "STEPS"],
            out.axes.iter().map(|a| {
                vec![
                    a.axis.to_string(),
                    a.acceleration.to_string(),
                    a.max_speed.to_string(),
                    a.steps.to_string(),
                ]
            }),
        ),
        OutputFormat::Pretty if accepted => match motors {
            [motor] => println!(
                "Move completed: motor {}, {} steps ({:.3} s)",
                motor.axis,
                motor.steps,
                elapsed.as_secs_f64()
            ),
            _ => println!(
                "Multi-move completed: {} motors ({:.3} s)",
                motors.len(),
                elapsed.as_secs_f64()
            ),
        },
        OutputFormat::Pretty => {}
    }

    if !accepted {
        return Err(CliError::new(
            FAILURE,
            format!("move failed ({:.3} s)", elapsed.as_secs_f64()),
        ));
    }
    Ok(SUCCESS)
}
