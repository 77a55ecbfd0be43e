//! # gotogo-link
//!
//! Receive live telemetry from the vehicle controller and print it as JSON Lines.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging on stderr (stdout carries the telemetry stream)
//!    - Load configuration and apply command-line overrides
//!
//! 2. **Monitor Loop**
//!    - The connection supervisor opens the link and reconnects after faults
//!    - Every frame, status change and diagnostic is written to stdout
//!    - Ctrl+C stops the supervisor and closes the link
//!
//! # Examples
//!
//! ```bash
//! gotogo-link ports
//! gotogo-link monitor --transport wifi --host 192.168.1.100
//! RUST_LOG=gotogo_link=debug gotogo-link monitor --port /dev/ttyACM0
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use gotogo_link::config::Config;
use gotogo_link::discovery;
use gotogo_link::supervisor::ConnectionSupervisor;
use gotogo_link::telemetry::{dispatch, JsonLinesSink};
use gotogo_link::transport::TransportKind;

/// Interval between session liveness checks in the monitor loop
const LIVENESS_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "gotogo-link", version, about = "Vehicle telemetry link")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List serial ports and mark the one auto-detection would pick
    Ports,

    /// Connect and stream telemetry events to stdout
    Monitor(MonitorArgs),
}

#[derive(Debug, Args)]
struct MonitorArgs {
    /// Configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// serial | network | wireless (aliases: usb, wifi, tcp, bluetooth)
    #[arg(short, long, value_name = "KIND")]
    transport: Option<TransportKind>,

    /// Serial device path
    #[arg(short, long, value_name = "PATH")]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, value_name = "N")]
    baud: Option<u32>,

    /// Controller host for the network transport
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Controller TCP port
    #[arg(long, value_name = "N")]
    tcp_port: Option<u16>,
}

impl MonitorArgs {
    /// Merge command-line overrides into `config`
    fn apply(&self, config: &mut Config) {
        let connection = &mut config.connection;
        if let Some(transport) = self.transport {
            connection.transport = transport;
        }
        if let Some(port) = &self.port {
            connection.serial_port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            connection.baud_rate = baud;
        }
        if let Some(host) = &self.host {
            connection.host = host.clone();
        }
        if let Some(tcp_port) = self.tcp_port {
            connection.tcp_port = tcp_port;
        }
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => Config::default(),
        };
        self.apply(&mut config);
        config.validate().context("invalid connection settings")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays a clean event stream
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .init();

    match cli.command {
        Command::Ports => list_ports(),
        Command::Monitor(args) => monitor(args).await,
    }
}

fn list_ports() -> Result<()> {
    let ports = discovery::discover();
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    let selected = discovery::select_best(&ports).map(|port| port.device_path.clone());

    println!("Found {} serial port(s):", ports.len());
    for port in &ports {
        let marker = if selected.as_deref() == Some(port.device_path.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<24} {:<32} {}",
            marker, port.device_path, port.description, port.hardware_id
        );
    }
    if let Some(path) = selected {
        println!("\nAuto-detect would use: {}", path);
    }
    Ok(())
}

async fn monitor(args: MonitorArgs) -> Result<()> {
    let config = args.load_config()?;
    let params = config.to_parameters();

    info!("gotogo-link v{} starting ({})", env!("CARGO_PKG_VERSION"), params);

    let (mut supervisor, mut events) = ConnectionSupervisor::new(
        Arc::new(config.transport_factory()),
        config.supervisor_settings(),
    );
    supervisor.start(params).await;

    let mut sink = JsonLinesSink::new(std::io::stdout());
    let mut liveness = interval(LIVENESS_CHECK_INTERVAL);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => dispatch(&mut sink, &event),
                None => break,
            },

            _ = liveness.tick() => {
                if !supervisor.is_running() {
                    // The session gave up; flush what it left in the queue
                    while let Ok(event) = events.try_recv() {
                        dispatch(&mut sink, &event);
                    }
                    warn!("Telemetry session ended ({})", supervisor.state());
                    break;
                }
                debug!(
                    "Link {}: {} frames, {} errors written",
                    supervisor.state(),
                    sink.frames_written(),
                    sink.errors_written()
                );
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    supervisor.stop().await;
    while let Ok(event) = events.try_recv() {
        dispatch(&mut sink, &event);
    }

    info!(
        "Total frames written: {} ({} errors)",
        sink.frames_written(),
        sink.errors_written()
    );
    Ok(())
}
