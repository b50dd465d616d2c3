mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{parse_duration, Command, LinkOptions};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "squid",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SQUID_BUILD_TARGET"), ")"),
    about = "Squid stepper controller CLI"
)]
struct Cli {
    /// Serial port or `tcp://HOST:PORT` bridge. Auto-detected when omitted.
    #[arg(long, short = 'p', env = "SQUID_PORT", global = true)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(
        long,
        short = 'b',
        env = "SQUID_BAUDRATE",
        default_value_t = 115_200,
        global = true
    )]
    baudrate: u32,

    /// Longest a single read may block (e.g. 100ms).
    #[arg(long, value_name = "DURATION", default_value = "100ms", global = true)]
    poll_interval: String,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = parse_duration(&cli.poll_interval).and_then(|poll_interval| {
        let link = LinkOptions {
            port: cli.port,
            baud_rate: cli.baudrate,
            poll_interval,
        };
        cmd::run(cli.command, &link, format)
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
