//! ==============================================================================
//! server.rs - http + push server
//! ==============================================================================
//!
//! routes:
//!     GET /events      server-sent events, one `sensorData` event per line
//!     GET /api/status  sensor state, viewer count, lines relayed (json)
//!     *                static dashboard assets, when the directory exists
//!
//! the push route never replays: a viewer sees only lines relayed after it
//! connected. closing the connection drops its subscription.
//!
//! ==============================================================================

use crate::domain::{SensorState, StatusReport, SENSOR_DATA_EVENT};
use crate::relay::BroadcastRelay;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::Json,
    routing::get,
    Router,
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::future::{Future, IntoFuture};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

// ==============================================================================
// shared state
// ==============================================================================
// the relay is written by the sensor task and read by every push connection;
// the sensor state is written by main.rs and read by the status api.

#[derive(Clone)]
pub struct HostState {
    pub relay: BroadcastRelay,
    pub sensor: Arc<RwLock<SensorState>>,
    pub port: Arc<str>,
}

impl HostState {
    pub fn new(relay: BroadcastRelay, port: &str) -> Self {
        Self { relay, sensor: Arc::new(RwLock::new(SensorState::Connecting)), port: Arc::from(port) }
    }

    pub async fn set_sensor(&self, state: SensorState) {
        *self.sensor.write().await = state;
    }
}

pub fn router(state: HostState, static_dir: &Path) -> Router {
    let app = Router::new()
        .route("/events", get(events_handler))
        .route("/api/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    if static_dir.is_dir() {
        app.fallback_service(ServeDir::new(static_dir))
    } else {
        tracing::warn!("[SERVER] static dir {} not found, serving api only", static_dir.display());
        app
    }
}

/// Serve until `shutdown` resolves.
///
/// push connections never finish on their own, so shutdown drops them
/// instead of waiting for them to drain.
pub async fn run_server<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result.context("web server error")?,
        _ = shutdown => tracing::info!("[SERVER] shutdown requested, closing push connections"),
    }
    Ok(())
}

async fn events_handler(
    State(state): State<HostState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.relay.subscribe();
    tracing::info!(viewers = state.relay.viewer_count(), "[SERVER] viewer connected");

    let stream = subscription
        .into_stream()
        .map(|line| Ok(sensor_event(&line)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// sse fields cannot carry a bare carriage return, so one inside a line is
/// sent as a space; everything else goes out untouched
fn sensor_event(line: &str) -> Event {
    let event = Event::default().event(SENSOR_DATA_EVENT);
    if line.contains('\r') {
        event.data(line.replace('\r', " "))
    } else {
        event.data(line)
    }
}

/// json api endpoint for programmatic access
async fn status_handler(State(state): State<HostState>) -> Json<StatusReport> {
    let sensor = *state.sensor.read().await;
    Json(StatusReport {
        sensor,
        port: state.port.to_string(),
        viewers: state.relay.viewer_count(),
        lines_relayed: state.relay.lines_relayed(),
    })
}
