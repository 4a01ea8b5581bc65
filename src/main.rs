//! ==============================================================================
//! main.rs - turbidity host entry point
//! ==============================================================================
//!
//! purpose:
//!     `serve` owns the sensor board and relays its lines to every viewer.
//!     `watch` is one viewer: it follows the relay and shows live data, or a
//!     simulated reading until live data shows up.
//!
//! architecture (serve):
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                      host (this file)                        │
//!     │  ┌─────────────┐        ┌────────────┐      ┌────────────┐  │
//!     │  │ serial task │ lines  │   relay    │ sse  │ web server │  │
//!     │  │ (sensor.rs) │ ─────▶ │ (relay.rs) │ ───▶ │ (port 3000)│  │
//!     │  └─────────────┘        └────────────┘      └────────────┘  │
//!     └─────────────────────────────────────────────────────────────┘
//!
//!     if the serial port cannot be opened the server still runs; viewers
//!     simply never see live data and keep simulating.
//!
//! ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::net::TcpListener;

use turbidity_host::config::HostConfig;
use turbidity_host::relay::{pump, BroadcastRelay};
use turbidity_host::sensor::SensorLineReader;
use turbidity_host::server::{self, HostState};
use turbidity_host::session::ViewerSession;
use turbidity_host::viewer::{ConsolePresenter, Viewer};
use turbidity_host::{logging, SensorState};

#[derive(Parser)]
#[command(name = "turbidity-host")]
#[command(about = "Live turbidity relay with simulated fallback", long_about = None)]
struct Cli {
    /// Path to turbidity.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the sensor and relay its lines to viewers
    Serve,

    /// Follow a running server as one viewer session
    Watch {
        /// Server base url, overrides viewer.server_url
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // step 1: load configuration, then start logging at the configured level
    let mut config = HostConfig::load_or_default(cli.config.as_deref())?;
    logging::init(&config.logging.level);
    config.log_summary();

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Watch { server } => {
            if let Some(url) = server {
                config.viewer.server_url = url;
            }
            watch(config).await
        }
    }
}

async fn serve(config: HostConfig) -> Result<()> {
    // step 2: shared state
    let relay = BroadcastRelay::new(config.server.relay_capacity);
    let state = HostState::new(relay.clone(), &config.serial.path);

    // step 3: open the sensor; failure degrades to simulation-only viewers
    match SensorLineReader::open(&config.serial) {
        Ok(reader) => {
            state.set_sensor(SensorState::Online).await;
            let ingest_state = state.clone();
            let show_data = config.logging.show_sensor_data;
            tokio::spawn(async move {
                let result = pump(reader.into_lines(), relay, show_data).await;
                match result {
                    Ok(()) => tracing::error!("[SENSOR] serial stream ended, viewers will simulate"),
                    Err(e) => tracing::error!("[SENSOR] {}, viewers will simulate", e),
                }
                ingest_state.set_sensor(SensorState::Offline).await;
            });
        }
        Err(e) => {
            tracing::error!("[SENSOR] {} - continuing without live data", e);
            state.set_sensor(SensorState::Offline).await;
        }
    }

    // step 4: web server until ctrl-c
    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("[STARTUP] Dashboard live at http://{}", addr);

    let app = server::router(state, &config.server.static_dir);
    server::run_server(listener, app, shutdown_signal()).await?;

    // dropping the reader task's port on exit is the only teardown
    tracing::info!("[SHUTDOWN] server stopped");
    Ok(())
}

async fn watch(config: HostConfig) -> Result<()> {
    let viewer = Viewer::new(&config).context("failed to build weather client")?;
    let session = ViewerSession::new(config.viewer.chart_points);

    tracing::info!("[VIEWER] following {}", config.viewer.server_url);
    let session = viewer.run(session, ConsolePresenter, shutdown_signal()).await;
    tracing::info!(state = ?session.state(), last = %session.reading(), "[VIEWER] final reading");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
