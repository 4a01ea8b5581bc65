//! ==============================================================================
//! weather.rs - ambient temperature for a viewer's location
//! ==============================================================================
//!
//! purpose:
//!     resolves where the viewer is, then asks a weather api for the current
//!     outdoor temperature there.
//!
//! failure model:
//!     every failure (no location, no key, transport, non-2xx, odd body)
//!     becomes `Temperature::Unavailable`. the turbidity pipeline never sees
//!     any of it, and nothing is retried until the next scheduled tick.
//!
//! relationships:
//!     - used by: viewer.rs (spawned once per tick, never awaited by the tick)
//!     - uses: reqwest (http client with a request timeout)
//!
//! ==============================================================================

use crate::config::{LocationConfig, WeatherConfig};
use crate::error::{LocationError, WeatherError};

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// what the temperature display shows
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Temperature {
    Celsius(f64),
    #[default]
    Unavailable,
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temperature::Celsius(c) => write!(f, "{:.1}", c),
            Temperature::Unavailable => f.write_str("N/A"),
        }
    }
}

/// Source of the viewer's position.
#[async_trait]
pub trait Locator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, LocationError>;
}

/// Position taken from configuration. Without one the viewer behaves like
/// a client with no geolocation support.
#[derive(Clone, Debug)]
pub struct ConfiguredLocation {
    coords: Option<Coordinates>,
}

impl ConfiguredLocation {
    pub fn new(config: &LocationConfig) -> Self {
        let coords = match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        };
        Self { coords }
    }

    pub fn fixed(latitude: f64, longitude: f64) -> Self {
        Self { coords: Some(Coordinates { latitude, longitude }) }
    }
}

#[async_trait]
impl Locator for ConfiguredLocation {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        self.coords.ok_or(LocationError::Unsupported)
    }
}

#[derive(Deserialize)]
struct CurrentWeather {
    current: Option<CurrentConditions>,
}

#[derive(Deserialize)]
struct CurrentConditions {
    temp_c: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct WeatherClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;
        Ok(Self { http, endpoint: config.endpoint.clone(), api_key: config.api_key.clone() })
    }

    /// Current outdoor temperature in Celsius at `coords`.
    pub async fn current_celsius(&self, coords: Coordinates) -> Result<f64, WeatherError> {
        if self.api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let q = format!("{},{}", coords.latitude, coords.longitude);
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("key", self.api_key.as_str()), ("q", q.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status));
        }

        let body: CurrentWeather = response.json().await?;
        body.current
            .and_then(|c| c.temp_c)
            .ok_or(WeatherError::MissingTemperature)
    }
}

/// Resolve the location and look up the temperature, folding every failure
/// into `Unavailable`.
pub async fn fetch_temperature(locator: &dyn Locator, client: &WeatherClient) -> Temperature {
    let coords = match locator.locate().await {
        Ok(coords) => coords,
        Err(e) => {
            tracing::debug!("[WEATHER] location unavailable: {}", e);
            return Temperature::Unavailable;
        }
    };

    match client.current_celsius(coords).await {
        Ok(celsius) => Temperature::Celsius(celsius),
        Err(e) => {
            tracing::warn!("[WEATHER] could not fetch temperature: {}", e);
            Temperature::Unavailable
        }
    }
}
