use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cmd::status::{print_status, StatusOutput};
use crate::cmd::{parse_duration, LinkOptions, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{mask, print_json, OutputFormat};

pub fn run(args: WatchArgs, link: &LinkOptions, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (client, port) = link.open(Default::default())?;
    let started = Instant::now();

    while running.load(Ordering::SeqCst) {
        let status = client
            .status()
            .map_err(|err| client_error("status request failed", err))?;

        match format {
            OutputFormat::Json => print_json(&StatusOutput::new(&port, &status)),
            OutputFormat::Pretty => println!(
                "[{:>8.3}s] active {}  completed {}",
                started.elapsed().as_secs_f64(),
                mask(status.active),
                mask(status.completed)
            ),
            OutputFormat::Table if status.is_idle() => print_status(&port, &status, format),
            OutputFormat::Table => {}
        }

        if status.is_idle() {
            return Ok(SUCCESS);
        }

        if let Some(timeout) = timeout {
            if started.elapsed() >= timeout {
                let axes = status.active_axes();
                return Err(CliError::new(
                    TIMEOUT,
                    format!("axes still moving after {timeout:?}: {axes:?}"),
                ));
            }
        }

        sleep_while_running(interval, &running);
    }

    debug!("watch interrupted");
    Ok(SUCCESS)
}

/// Sleep in short slices so Ctrl-C is noticed promptly.
fn sleep_while_running(interval: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
