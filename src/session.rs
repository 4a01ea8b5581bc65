//! ==============================================================================
//! session.rs - per-viewer live/simulated state
//! ==============================================================================
//!
//! purpose:
//!     everything one viewer holds: the displayed reading, its quality, the
//!     rolling chart, the clock and the ambient temperature.
//!
//! state machine:
//!
//! ```text
//!     ┌───────────────┐  first extracted value   ┌────────────────┐
//!     │ AwaitingLive  │ ───────────────────────▶ │ LiveConfirmed  │
//!     │ (simulating)  │                          │   (terminal)   │
//!     └───────────────┘                          └────────────────┘
//!
//!     unparseable payloads leave the state and the display untouched.
//!     once live, the simulator is never consulted again for this session.
//! ```
//!
//! sessions share nothing; two viewers can be in different states.
//!
//! relationships:
//!     - uses: extract.rs, simulator.rs, quality.rs
//!     - driven by: viewer.rs (tick loop + push channel)
//!
//! ==============================================================================

use crate::domain::{Reading, Source};
use crate::extract::extract_value;
use crate::quality::Quality;
use crate::simulator::{Simulator, SEED_VALUE};
use crate::weather::Temperature;

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FeedState {
    AwaitingLive,
    LiveConfirmed,
}

/// One-way latch recording whether live data has ever been seen.
#[derive(Clone, Copy, Debug)]
pub struct LiveLatch {
    state: FeedState,
}

impl Default for LiveLatch {
    fn default() -> Self {
        Self { state: FeedState::AwaitingLive }
    }
}

impl LiveLatch {
    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn allows_simulation(&self) -> bool {
        self.state == FeedState::AwaitingLive
    }

    /// Record a live value. Returns true only on the transition itself.
    pub fn confirm(&mut self) -> bool {
        let first = self.state == FeedState::AwaitingLive;
        self.state = FeedState::LiveConfirmed;
        first
    }
}

/// Fixed-size window of the most recent applied readings.
#[derive(Clone, Debug)]
pub struct ChartHistory {
    capacity: usize,
    points: VecDeque<ChartPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    pub source: Source,
}

impl ChartHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, points: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, point: ChartPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter()
    }
}

/// What a push message did to the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PushOutcome {
    /// a value was extracted and is now displayed
    Applied { reading: Reading, first_live: bool },
    /// nothing could be extracted; the session is unchanged
    Ignored,
}

/// What one tick did to the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickOutcome {
    pub simulated: Option<Reading>,
}

/// Serializable view handed to the presentation layer.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub state: FeedState,
    pub reading: Reading,
    pub display: String,
    pub quality: Quality,
    pub temperature: String,
    pub last_update: Option<String>,
    pub chart: Vec<ChartPoint>,
}

fn clock_label(at: DateTime<Local>) -> String {
    at.format("%I:%M %p").to_string()
}

/// One viewer's independent runtime state.
pub struct ViewerSession<R = StdRng> {
    latch: LiveLatch,
    simulator: Simulator<R>,
    reading: Reading,
    chart: ChartHistory,
    temperature: Temperature,
    last_update: Option<DateTime<Local>>,
}

impl ViewerSession<StdRng> {
    pub fn new(chart_points: usize) -> Self {
        Self::with_simulator(chart_points, Simulator::from_entropy())
    }
}

impl<R: Rng> ViewerSession<R> {
    pub fn with_simulator(chart_points: usize, simulator: Simulator<R>) -> Self {
        Self {
            latch: LiveLatch::default(),
            simulator,
            reading: Reading::simulated(SEED_VALUE),
            chart: ChartHistory::new(chart_points),
            temperature: Temperature::Unavailable,
            last_update: None,
        }
    }

    pub fn state(&self) -> FeedState {
        self.latch.state()
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub fn quality(&self) -> Quality {
        Quality::classify(self.reading.value)
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    pub fn chart(&self) -> &ChartHistory {
        &self.chart
    }

    /// Handle one broadcast payload.
    pub fn on_push(&mut self, payload: &str, now: DateTime<Local>) -> PushOutcome {
        let Some(value) = extract_value(payload) else {
            tracing::debug!(payload, "no reading in push message");
            return PushOutcome::Ignored;
        };

        let first_live = self.latch.confirm();
        if first_live {
            tracing::info!(value, "live data received, simulation stopped");
        }
        let reading = Reading::live(value);
        self.apply(reading, now);
        PushOutcome::Applied { reading, first_live }
    }

    /// Periodic refresh: the clock always moves, the simulator only runs
    /// while no live value has been seen.
    pub fn on_tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        self.last_update = Some(now);
        if !self.latch.allows_simulation() {
            return TickOutcome { simulated: None };
        }

        let value = self.simulator.next_value(Some(self.displayed_value()));
        let reading = Reading::simulated(value);
        self.apply(reading, now);
        TickOutcome { simulated: Some(reading) }
    }

    /// Set the clock without touching the reading (session start).
    pub fn touch_clock(&mut self, now: DateTime<Local>) {
        self.last_update = Some(now);
    }

    pub fn set_temperature(&mut self, temperature: Temperature) {
        self.temperature = temperature;
    }

    /// the walk steps from what is on screen, not the unrounded value
    fn displayed_value(&self) -> f64 {
        self.reading.to_string().parse().unwrap_or(self.reading.value)
    }

    fn apply(&mut self, reading: Reading, now: DateTime<Local>) {
        self.reading = reading;
        self.chart.push(ChartPoint { label: clock_label(now), value: reading.value, source: reading.source });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            reading: self.reading,
            display: self.reading.to_string(),
            quality: self.quality(),
            temperature: self.temperature.to_string(),
            last_update: self.last_update.map(clock_label),
            chart: self.chart.points().cloned().collect(),
        }
    }
}
