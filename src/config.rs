//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `turbidity.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - SerialConfig: where the sensor is attached and how fast it talks.
//!     - ServerConfig: listening address, static assets, relay buffer.
//!     - ViewerConfig: push channel url and the tick cadence of a session.
//!     - WeatherConfig / LocationConfig: ambient temperature lookup.
//!     - LoggingConfig: log level and whether every line is echoed.
//!
//! every field has a default, so a partial file is enough.
//!
//! ==============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `weather.api_key`.
pub const WEATHER_API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub serial: SerialConfig,
    pub server: ServerConfig,
    pub viewer: ViewerConfig,
    pub weather: WeatherConfig,
    pub location: LocationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialConfig {
    pub path: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { path: "/dev/ttyACM0".to_string(), baud_rate: 115_200 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub static_dir: PathBuf,
    /// lines buffered per subscriber before a slow one starts skipping
    pub relay_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: PathBuf::from("public"),
            relay_capacity: 64,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewerConfig {
    pub server_url: String,
    pub tick_seconds: u64,
    pub chart_points: usize,
    pub reconnect_seconds: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            tick_seconds: 30,
            chart_points: 24,
            reconnect_seconds: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WeatherConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.weatherapi.com/v1/current.json".to_string(),
            api_key: String::new(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        Ok(config.with_env_overrides())
    }

    /// Load with default fallback
    ///
    /// an explicit path must load; the well-known locations are only tried.
    /// runs before the logger exists, so it reports on stdout.
    pub fn load_or_default(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            let config = Self::load(path)?;
            println!("[CONFIG] Loaded from {}", path.display());
            return Ok(config);
        }

        let paths = [
            PathBuf::from("config").join("turbidity.toml"),
            PathBuf::from("..").join("config").join("turbidity.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Ok(Self::default().with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(WEATHER_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.weather.api_key = key.trim().to_string();
            }
        }
        self
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            serial = %self.serial.path,
            baud = self.serial.baud_rate,
            listen = %self.server.listen_addr(),
            tick_seconds = self.viewer.tick_seconds,
            weather_key = !self.weather.api_key.is_empty(),
            log_level = %self.logging.level,
            "host configuration"
        );
    }
}
