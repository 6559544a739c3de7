use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info};
use std::io::{self, IsTerminal};
use std::process::ExitCode;

use sensor_dashboard::cli::Args;
use sensor_dashboard::dashboard::run_dashboard;
use sensor_dashboard::errors::DashboardError;
use sensor_dashboard::link::{available_ports, describe_port, SerialLink};
use sensor_dashboard::metrics::METRICS;
use sensor_dashboard::poller::{spawn_poller, Poller};
use sensor_dashboard::snapshot::load_snapshot;

// Readings queued between the poller and the UI loop
const UPDATE_CHANNEL_CAPACITY: usize = 16;

fn main() -> ExitCode {
    // Logs go to stderr, the panel to stdout
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), DashboardError> {
    if args.list_ports {
        list_ports()?;
        return Ok(());
    }

    let config = args.resolve_config()?;
    info!(
        "Starting {} on {} at {} baud, polling every {:?}",
        config.title,
        config.link.port,
        config.link.baud_rate,
        config.poll_interval()
    );

    let snapshot = load_snapshot(config.image_path.as_deref(), config.image_width, config.image_height);

    let (tx, rx) = bounded(UPDATE_CHANNEL_CAPACITY);
    let poller = Poller::new(SerialLink::new(config.link.clone()), config.poll_interval())
        .with_poll_limit(args.max_polls);
    // Detached: the poller ends with the process
    let _poller = spawn_poller(poller, tx)?;

    let stdout = io::stdout();
    let clear_screen = stdout.is_terminal();
    let mut out = stdout.lock();
    run_dashboard(&config, &snapshot, rx, &mut out, clear_screen)?;

    METRICS.lock().print_summary();
    Ok(())
}

fn list_ports() -> Result<(), DashboardError> {
    println!("Available serial ports:");
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("  (none)");
    }
    for port in &ports {
        println!("  {}", describe_port(port));
    }
    Ok(())
}
