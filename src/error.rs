use thiserror::Error;

/// Failures of the serial sensor connection.
///
/// Neither variant is fatal: the server keeps running and viewers fall back
/// to simulated readings.
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("serial read error: {0}")]
    Read(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("no weather api key configured")]
    MissingApiKey,

    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather api returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("weather response has no current temperature")]
    MissingTemperature,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("geolocation permission denied")]
    PermissionDenied,

    #[error("geolocation is not supported")]
    Unsupported,
}
