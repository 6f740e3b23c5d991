//! # Analog Fly
//!
//! Fly a virtual 6DOF tracker around with a joystick or gamepad.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, or `config/default.toml`)
//!    - Set up logging with tracing subscriber (and rolling files if configured)
//!    - Open every configured evdev device; a device that fails to open is
//!      logged and the axes using it stay still
//!    - Start the TCP report server, or fall back to JSON lines on stdout
//!
//! 2. **Main Loop**
//!    - Tick the tracker at `tick_rate_hz`
//!    - Reports go out at `update_rate_hz`, plus one immediately for each
//!      newly connected client
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C stops the loop and releases every input subscription
//!
//! Expected output:
//! ```text
//! INFO analog_fly: Analog Fly v0.1.0 starting...
//! INFO analog_fly::source::joystick: Opened input device /dev/input/event0 (Wireless Controller)
//! INFO analog_fly::session::tcp: Serving tracker reports on 127.0.0.1:3883
//! INFO analog_fly::fly::tracker: Analog fly tracker ready: sensor 0, axes [x, y, z, rx, rz], reset bound, 1 sources, update every 16.666ms
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use analog_fly::config::{Config, LoggingConfig};
use analog_fly::fly::AnalogFlyTracker;
use analog_fly::runner::run_until;
use analog_fly::session::jsonl::JsonlSink;
use analog_fly::session::tcp::{serve, BroadcastSink};
use analog_fly::session::{ReportSink, SubscriberNotifier};
use analog_fly::source::joystick::EvdevJoystick;
use analog_fly::source::SourceRegistry;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for rolling log files
const LOG_FILE_PREFIX: &str = "analog-fly.log";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("Analog Fly v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let mut registry = open_devices(&config);

    let notifier = SubscriberNotifier::new();
    let sink: Box<dyn ReportSink> = if config.server.enabled {
        let broadcast = BroadcastSink::new(config.server.backlog);
        let listener = TcpListener::bind(config.server.listen.as_str())
            .await
            .with_context(|| format!("Failed to listen on {}", config.server.listen))?;
        let lines = broadcast.sender();
        let server_notifier = notifier.clone();
        tokio::spawn(serve(listener, lines, server_notifier));
        Box::new(broadcast)
    } else {
        info!("Report server disabled, writing reports to stdout");
        Box::new(JsonlSink::new(std::io::stdout()))
    };

    let mut tracker =
        AnalogFlyTracker::new(config.tracker_params(), &mut registry, sink, notifier)?;

    let tick_period = config.tick_period();
    info!("Starting tick loop every {:?}", tick_period);
    info!("Press Ctrl+C to exit");

    let ticks = run_until(&mut tracker, tick_period, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    tracker.shutdown();
    info!("Total ticks: {}, reports: {}", ticks, tracker.reports());

    Ok(())
}

/// Installs the global subscriber; the guard must live until exit.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (file_layer, guard) = match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

/// Opens every configured device, skipping the ones that fail.
fn open_devices(config: &Config) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for device in &config.devices {
        match EvdevJoystick::open(&device.path, device.axis_range()) {
            Ok(joystick) => {
                registry.insert_device(device.name.clone(), Rc::new(RefCell::new(joystick)));
            }
            Err(e) => warn!("Device '{}' not available: {}", device.name, e),
        }
    }
    registry
}
