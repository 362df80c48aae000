//! rcdrive: drive an RC vehicle from Raspberry Pi GPIO lines.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  CdevLineBinder / SimLineBinder   SystemClock   LogEventSink   │
//! │  (LineBinder)                     (Clock)       (EventSink)    │
//! │  TcpTransport + io_task (network surface)                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        DriveService → FailSafeSession (pure logic)     │    │
//! │  │  Interpreter · PulseGenerator · SignalLines            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use rcdrive::adapters::clock::SystemClock;
use rcdrive::adapters::gpio::SimLineBinder;
use rcdrive::adapters::log_sink::LogEventSink;
use rcdrive::adapters::tcp_transport::TcpTransport;
use rcdrive::app::ports::LineBinder;
use rcdrive::app::service::DriveService;
use rcdrive::config::DriveConfig;
use rcdrive::drivers::task;
use rcdrive::error::DriveError;
use rcdrive::motion::MAX_DUTY;
use rcdrive::rpc::channels::DriveChannels;
use rcdrive::rpc::{engine, io_task};
use rcdrive::safety::FailSafeSession;

type Session<P> = FailSafeSession<P, SystemClock>;

// ── CLI ───────────────────────────────────────────────────────

/// Drive a two-motor RC vehicle through an H-bridge on Raspberry Pi GPIO.
#[derive(Parser, Debug)]
#[command(name = "rcdrive", version, about, long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG still wins)
    #[arg(short, long)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use in-memory lines instead of the GPIO character device
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve drive commands over HTTP
    Serve {
        #[arg(long)]
        network_address: Option<String>,
        #[arg(long)]
        network_port: Option<u16>,
    },
    /// Run one operation, then exit
    Run {
        /// idle, stop, halt, forward, backward, left, right, cw, ccw
        operation: String,
        #[arg(allow_hyphen_values = true)]
        seconds: f64,
        /// Duty cycle 0-10
        #[arg(long, default_value_t = i64::from(MAX_DUTY))]
        speed: i64,
    },
    /// Drive a square: forward then left, four times
    Demo {
        /// Length of each leg
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

// ── Entry point ───────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => DriveConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DriveConfig::default(),
    };
    if let Command::Serve {
        network_address,
        network_port,
    } = &cli.command
    {
        if let Some(addr) = network_address {
            config.listen_address = addr.clone();
        }
        if let Some(port) = network_port {
            config.listen_port = *port;
        }
    }
    config.validate().context("invalid configuration")?;

    #[cfg(feature = "gpio-cdev")]
    {
        if !cli.simulate {
            let mut binder = rcdrive::adapters::gpio::CdevLineBinder::open(&config.gpio_chip)
                .with_context(|| format!("opening {}", config.gpio_chip))?;
            return launch(&cli.command, &config, &mut binder);
        }
    }
    #[cfg(not(feature = "gpio-cdev"))]
    {
        if !cli.simulate {
            warn!("built without the gpio-cdev feature; driving simulated lines");
        }
    }

    launch(&cli.command, &config, &mut SimLineBinder)
}

fn launch<B>(command: &Command, config: &DriveConfig, binder: &mut B) -> Result<()>
where
    B: LineBinder,
    B::Pin: Send + 'static,
{
    let assignment = config.assignment().context("pin assignment")?;
    let session = FailSafeSession::open(assignment, binder, SystemClock::new(), config.pulse_period())
        .context("binding drive lines")?;

    match command {
        Command::Serve { .. } => serve(session, config),
        Command::Run {
            operation,
            seconds,
            speed,
        } => run_once(session, operation, *speed, *seconds),
        Command::Demo { seconds } => demo(session, *seconds),
    }
}

// ── Commands ──────────────────────────────────────────────────

fn serve<P: OutputPin + Send + 'static>(session: Session<P>, config: &DriveConfig) -> Result<()> {
    let channels = Arc::new(DriveChannels::new());
    let halt = session.halt_handle();

    let transport = TcpTransport::bind(config.listen_addr()?, config.max_clients)
        .context("starting listener")?;
    let io = io_task::spawn(
        transport,
        channels.clone(),
        config.command_defaults(),
        config.request_timeout(),
    )
        .context("spawning I/O thread")?;

    let worker_channels = channels.clone();
    let worker = task::spawn(task::DRIVE_WORKER, move || {
        let service = DriveService::new(session);
        engine::run_worker(service, &worker_channels, &mut LogEventSink::new())
    })
    .context("spawning drive worker")?;

    ctrlc::set_handler(move || {
        info!("interrupt: halting and shutting down");
        halt.trigger();
        channels.request_shutdown();
    })
    .context("installing Ctrl-C handler")?;

    info!("serving; press Ctrl-C to stop");
    let worker_result = worker
        .join()
        .map_err(|_| anyhow!("drive worker panicked"))?;
    io.join().map_err(|_| anyhow!("I/O thread panicked"))?;
    worker_result.context("closing session")
}

fn run_once<P: OutputPin>(
    mut session: Session<P>,
    operation: &str,
    speed: i64,
    seconds: f64,
) -> Result<()> {
    install_halt(&session)?;
    let outcome = session.drive(operation, speed, seconds);
    session.close().context("closing session")?;
    finish(outcome, || format!("{operation} at {speed} for {seconds}s"))
}

fn demo<P: OutputPin>(mut session: Session<P>, seconds: f64) -> Result<()> {
    install_halt(&session)?;
    let full = i64::from(MAX_DUTY);
    let leg = [("forward", full, seconds), ("left", full, seconds)];
    let route: Vec<_> = leg.iter().copied().cycle().take(leg.len() * 4).collect();
    info!("demo: {} legs of {}s", route.len(), seconds);
    let outcome = session.drive_sequence(&route);
    session.close().context("closing session")?;
    finish(outcome, || "demo route".to_owned())
}

fn install_halt<P: OutputPin>(session: &Session<P>) -> Result<()> {
    let halt = session.halt_handle();
    ctrlc::set_handler(move || halt.trigger()).context("installing Ctrl-C handler")
}

fn finish(outcome: rcdrive::Result<()>, what: impl FnOnce() -> String) -> Result<()> {
    match outcome {
        Err(DriveError::Interrupted) => {
            warn!("{}: interrupted", what());
            Ok(())
        }
        other => other.with_context(what),
    }
}
