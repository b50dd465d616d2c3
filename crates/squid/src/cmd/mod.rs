use std::time::Duration;

use clap::{Args, Subcommand};
use squid_client::{Client, ClientConfig, MotorCommand};
use squid_transport::{detect_port, Endpoint, SerialConfig, SerialLink, TransportConfig};
use tracing::info;

use crate::exit::{client_error, transport_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod moves;
pub mod ports;
pub mod status;
pub mod stop;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query the controller firmware version.
    Version(VersionArgs),
    /// Show active, completed and STATUS pin masks.
    Status(StatusArgs),
    /// Halt all axes.
    Stop(StopArgs),
    /// Move a single axis.
    Move(MoveArgs),
    /// Move several axes, each given as AXIS:ACCEL:SPEED:STEPS.
    MultiMove(MultiMoveArgs),
    /// Poll status until no axis is moving.
    Watch(WatchArgs),
    /// List serial ports and the one auto-detection would pick.
    Ports(PortsArgs),
}

pub fn run(command: Command, link: &LinkOptions, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Version(args) => version::run(args, link, format),
        Command::Status(args) => status::run(args, link, format),
        Command::Stop(args) => stop::run(args, link, format),
        Command::Move(args) => moves::run_move(args, link, format),
        Command::MultiMove(args) => moves::run_multi(args, link, format),
        Command::Watch(args) => watch::run(args, link, format),
        Command::Ports(args) => ports::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Response timeout (e.g. 5s, 500ms).
    #[arg(long, short = 't', default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Response timeout (e.g. 5s, 500ms).
    #[arg(long, short = 't', default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct StopArgs {
    /// Response timeout (e.g. 5s, 500ms).
    #[arg(long, short = 't', default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Axis number (1-10).
    #[arg(long, short = 'm')]
    pub motor: u32,
    /// Number of steps.
    #[arg(long, short = 's')]
    pub steps: u32,
    /// Maximum speed.
    #[arg(long, default_value_t = 1000)]
    pub speed: u32,
    /// Acceleration.
    #[arg(long, default_value_t = 500)]
    pub accel: u32,
    /// Return as soon as the controller accepts the move.
    #[arg(long = "async")]
    pub async_mode: bool,
    /// Response timeout; a synchronous move must finish within it.
    #[arg(long, short = 't', default_value = "300s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct MultiMoveArgs {
    /// Axis specs as AXIS:ACCEL:SPEED:STEPS.
    #[arg(required = true, value_name = "SPEC")]
    pub motors: Vec<String>,
    /// Return as soon as the controller accepts the move.
    #[arg(long = "async")]
    pub async_mode: bool,
    /// Response timeout; a synchronous move must finish within it.
    #[arg(long, short = 't', default_value = "300s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Delay between status polls (e.g. 250ms).
    #[arg(long, default_value = "250ms")]
    pub interval: String,
    /// Give up if axes are still moving after this long.
    #[arg(long, short = 't')]
    pub timeout: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

/// How to reach the controller.
#[derive(Debug, Clone)]
pub struct LinkOptions {
    pub port: Option<String>,
    pub baud_rate: u32,
    pub poll_interval: Duration,
}

impl LinkOptions {
    pub fn endpoint(&self) -> CliResult<Endpoint> {
        if let Some(port) = &self.port {
            return Ok(Endpoint::parse(port));
        }
        let port = detect_port().map_err(|err| {
            transport_error("no controller port found, use --port to specify", err)
        })?;
        info!(port = %port, "auto-detected port");
        Ok(Endpoint::parse(&port))
    }

    /// Open the link and wrap it in a client.
    pub fn open(&self, config: ClientConfig) -> CliResult<(Client<Box<dyn SerialLink>>, String)> {
        let endpoint = self.endpoint()?;
        let config = ClientConfig {
            transport: TransportConfig {
                poll_interval: self.poll_interval,
                ..config.transport
            },
            ..config
        };
        let serial = SerialConfig::with_baud_rate(self.baud_rate);
        let client = Client::open(&endpoint, &serial, config)
            .map_err(|err| client_error("connect failed", err))?;
        Ok((client, endpoint.to_string()))
    }

    /// Open a client whose plain commands use `timeout`.
    pub fn open_with_command_timeout(
        &self,
        timeout: Duration,
    ) -> CliResult<(Client<Box<dyn SerialLink>>, String)> {
        self.open(ClientConfig {
            command_timeout: timeout,
            ..ClientConfig::default()
        })
    }
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Parse `AXIS:ACCEL:SPEED:STEPS`.
pub fn parse_motor_spec(spec: &str) -> CliResult<MotorCommand> {
    let invalid = || {
        CliError::usage(format!(
            "invalid motor spec {spec:?}, use AXIS:ACCEL:SPEED:STEPS"
        ))
    };

    let fields = spec
        .split(':')
        .map(|field| field.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    match fields.as_slice() {
        [axis, accel, speed, steps] => Ok(MotorCommand::new(*axis, *accel, *speed, *steps)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("0s").is_err());
        assert_eq!(parse_duration("bad").unwrap_err().code, USAGE);
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_motor_spec_fields() {
        assert_eq!(
            parse_motor_spec("3:500:1000:5000").unwrap(),
            MotorCommand::new(3, 500, 1000, 5000)
        );
    }

    #[test]
    fn parse_motor_spec_rejects_bad_input() {
        assert_eq!(parse_motor_spec("1:2:3").unwrap_err().code, USAGE);
        assert!(parse_motor_spec("1:2:3:4:5").is_err());
        assert!(parse_motor_spec("1:x:3:4").is_err());
        assert!(parse_motor_spec("1:-2:3:4").is_err());
    }

    #[test]
    fn explicit_port_skips_detection() {
        let link = LinkOptions {
            port: Some("tcp://127.0.0.1:4001".to_string()),
            baud_rate: 115_200,
            poll_interval: Duration::from_millis(100),
        };
        assert_eq!(
            link.endpoint().unwrap(),
            Endpoint::Tcp("127.0.0.1:4001".to_string())
        );
    }
}
