//! ==============================================================================
//! viewer.rs - runs one viewer session against a relay server
//! ==============================================================================
//!
//! purpose:
//!     the terminal counterpart of the dashboard page. one process = one
//!     session with its own latch, simulator, chart and temperature.
//!
//! architecture:
//!
//! ```text
//!     ┌──────────────┐   lines    ┌──────────────────────────────────────┐
//!     │ push follower│ ─────────▶ │              tick loop               │
//!     │ (reconnects) │            │  tick: clock, temperature, simulate  │
//!     └──────────────┘            │  push: extract, latch, display       │
//!     ┌──────────────┐   temps    │  temp: update display                │
//!     │ weather task │ ─────────▶ │                                      │
//!     │ (per tick)   │            └──────────────────┬───────────────────┘
//!     └──────────────┘                               │ snapshots
//!                                                    ▼
//!                                              ┌───────────┐
//!                                              │ presenter │
//!                                              └───────────┘
//!
//!     network work happens in spawned tasks, so a slow weather api or a dead
//!     server never delays the next tick.
//! ```
//!
//! ==============================================================================

use crate::config::HostConfig;
use crate::domain::{Source, SENSOR_DATA_EVENT};
use crate::error::WeatherError;
use crate::push::EventDecoder;
use crate::session::{PushOutcome, SessionSnapshot, ViewerSession};
use crate::weather::{fetch_temperature, ConfiguredLocation, Locator, Temperature, WeatherClient};

use chrono::Local;
use futures::StreamExt;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// why a snapshot is being presented
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Update {
    Started,
    Tick,
    Live,
    Temperature,
}

/// Presentation layer: receives every state change of the session.
pub trait Presenter: Send {
    fn render(&mut self, update: Update, snapshot: &SessionSnapshot);
}

/// Prints one status line per update.
#[derive(Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn render(&mut self, _update: Update, snapshot: &SessionSnapshot) {
        let source = match snapshot.reading.source {
            Source::Live => "live",
            Source::Simulated => "simulated",
        };
        println!(
            "[{}] Turbidity: {} NTU ({}) | {} | Outdoor: {} °C",
            snapshot.last_update.as_deref().unwrap_or("--:--"),
            snapshot.display,
            source,
            snapshot.quality,
            snapshot.temperature,
        );
    }
}

pub struct Viewer {
    server_url: String,
    tick: Duration,
    reconnect: Duration,
    locator: Arc<dyn Locator>,
    weather: WeatherClient,
    http: reqwest::Client,
}

impl Viewer {
    pub fn new(config: &HostConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            server_url: config.viewer.server_url.clone(),
            tick: Duration::from_secs(config.viewer.tick_seconds.max(1)),
            reconnect: Duration::from_secs(config.viewer.reconnect_seconds.max(1)),
            locator: Arc::new(ConfiguredLocation::new(&config.location)),
            weather: WeatherClient::new(&config.weather)?,
            // no overall timeout: the push response is meant to stay open
            http: reqwest::Client::new(),
        })
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_reconnect(mut self, reconnect: Duration) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_locator(mut self, locator: Arc<dyn Locator>) -> Self {
        self.locator = locator;
        self
    }

    /// Drive `session` until `shutdown` resolves, then hand it back.
    pub async fn run<R, P, F>(self, mut session: ViewerSession<R>, mut presenter: P, shutdown: F) -> ViewerSession<R>
    where
        R: Rng,
        P: Presenter,
        F: Future<Output = ()>,
    {
        let (push_tx, mut push_rx) = mpsc::unbounded_channel::<String>();
        let follower = tokio::spawn(follow_push_channel(
            self.http.clone(),
            events_url(&self.server_url),
            push_tx,
            self.reconnect,
        ));

        let (temp_tx, mut temp_rx) = mpsc::channel::<(u64, Temperature)>(8);
        let mut fetches_started = 0u64;
        let mut newest_applied = 0u64;

        session.touch_clock(Local::now());
        presenter.render(Update::Started, &session.snapshot());
        fetches_started += 1;
        self.spawn_temperature_fetch(fetches_started, temp_tx.clone());

        // the first tick comes one full period after start, like a page timer
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    session.on_tick(Local::now());
                    fetches_started += 1;
                    self.spawn_temperature_fetch(fetches_started, temp_tx.clone());
                    presenter.render(Update::Tick, &session.snapshot());
                }
                Some(payload) = push_rx.recv() => {
                    if let PushOutcome::Applied { .. } = session.on_push(&payload, Local::now()) {
                        presenter.render(Update::Live, &session.snapshot());
                    }
                }
                Some((seq, temperature)) = temp_rx.recv() => {
                    // a slow older fetch must not overwrite a newer answer
                    if seq > newest_applied {
                        newest_applied = seq;
                        session.set_temperature(temperature);
                        presenter.render(Update::Temperature, &session.snapshot());
                    }
                }
            }
        }

        follower.abort();
        tracing::info!("[VIEWER] session ended");
        session
    }

    fn spawn_temperature_fetch(&self, seq: u64, tx: mpsc::Sender<(u64, Temperature)>) {
        let locator = Arc::clone(&self.locator);
        let weather = self.weather.clone();
        tokio::spawn(async move {
            let temperature = fetch_temperature(locator.as_ref(), &weather).await;
            let _ = tx.send((seq, temperature)).await;
        });
    }
}

fn events_url(server_url: &str) -> String {
    format!("{}/events", server_url.trim_end_matches('/'))
}

/// Keep a push connection open, forwarding every `sensorData` payload.
/// Reconnects after `reconnect` whenever the connection fails or ends; stops
/// once the session side has gone away.
async fn follow_push_channel(
    http: reqwest::Client,
    url: String,
    tx: mpsc::UnboundedSender<String>,
    reconnect: Duration,
) {
    loop {
        match read_push_channel(&http, &url, &tx).await {
            Ok(()) => tracing::info!("[VIEWER] push channel closed by server"),
            Err(e) => tracing::warn!("[VIEWER] push channel unavailable ({}), simulating", e),
        }
        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(reconnect).await;
    }
}

async fn read_push_channel(
    http: &reqwest::Client,
    url: &str,
    tx: &mpsc::UnboundedSender<String>,
) -> Result<(), reqwest::Error> {
    let response = http
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await?
        .error_for_status()?;
    tracing::info!("[VIEWER] connected to {}", url);

    let mut body = response.bytes_stream();
    let mut decoder = EventDecoder::new();
    while let Some(chunk) = body.next().await {
        for message in decoder.feed(&chunk?) {
            if message.event == SENSOR_DATA_EVENT && tx.send(message.data).is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}
