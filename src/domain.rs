use serde::{Deserialize, Serialize};
use std::fmt;

/// event name every relayed sensor line is pushed under
pub const SENSOR_DATA_EVENT: &str = "sensorData";

/// where a displayed reading came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// parsed from a line the physical sensor produced
    Live,
    /// synthesized locally while no live data has arrived
    Simulated,
}

/// a single turbidity measurement (NTU-like, unitless)
///
/// live values are kept exactly as parsed, simulated ones are already clamped
/// by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub source: Source,
}

impl Reading {
    pub fn live(value: f64) -> Self {
        Self { value, source: Source::Live }
    }

    pub fn simulated(value: f64) -> Self {
        Self { value, source: Source::Simulated }
    }

    pub fn is_live(&self) -> bool {
        self.source == Source::Live
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            Source::Live => write!(f, "{}", self.value),
            Source::Simulated => write!(f, "{:.1}", self.value),
        }
    }
}

/// state of the single serial connection, as reported by the status api
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorState {
    #[default]
    Connecting,
    Online,
    Offline,
}

/// body of `GET /api/status`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusReport {
    pub sensor: SensorState,
    /// configured serial path
    pub port: String,
    /// currently connected push subscribers
    pub viewers: usize,
    /// lines relayed since the process started
    pub lines_relayed: u64,
}
