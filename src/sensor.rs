//! ==============================================================================
//! sensor.rs - serial line reader for the turbidity sensor
//! ==============================================================================
//!
//! purpose:
//!     owns the one serial connection to the sensor board and turns its byte
//!     stream into complete text lines.
//!
//! behaviour:
//!     - opens the configured port (8N1, no flow control) without blocking
//!     - splits on '\n', decodes lossily, strips surrounding whitespace
//!     - a read error or end-of-stream ends the sequence for good
//!
//! relationships:
//!     - used by: main.rs (opened once at startup)
//!     - feeds: relay.rs (every completed line is published unmodified)
//!
//! ==============================================================================

use crate::config::SerialConfig;
use crate::error::SensorError;

use futures::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

const LINE_DELIMITER: u8 = b'\n';

/// Reassembles bytes from the sensor into newline-delimited lines.
pub struct SensorLineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl SensorLineReader<SerialStream> {
    /// Open the configured serial endpoint.
    pub fn open(config: &SerialConfig) -> Result<Self, SensorError> {
        let port = tokio_serial::new(&config.path, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|source| SensorError::Open { path: config.path.clone(), source })?;

        tracing::info!(path = %config.path, baud = config.baud_rate, "serial port opened");
        Ok(Self::from_reader(port))
    }
}

impl<R: AsyncRead + Unpin> SensorLineReader<R> {
    pub fn from_reader(reader: R) -> Self {
        Self { reader: BufReader::new(reader), buf: Vec::with_capacity(64) }
    }

    /// Next completed line, trimmed. `None` once the device has gone away.
    ///
    /// A trailing fragment without a delimiter at end-of-stream is dropped:
    /// only delimiter-terminated lines count as complete.
    pub async fn next_line(&mut self) -> Option<Result<String, SensorError>> {
        self.buf.clear();
        match self.reader.read_until(LINE_DELIMITER, &mut self.buf).await {
            Ok(0) => None,
            Ok(_) if self.buf.last() != Some(&LINE_DELIMITER) => None,
            Ok(_) => Some(Ok(String::from_utf8_lossy(&self.buf).trim().to_string())),
            Err(e) => Some(Err(SensorError::Read(e))),
        }
    }

    /// Lazy, non-restartable sequence of lines. The first error is yielded
    /// and then the sequence ends.
    pub fn into_lines(self) -> impl Stream<Item = Result<String, SensorError>> {
        futures::stream::unfold(Some(self), |reader| async move {
            let mut reader = reader?;
            match reader.next_line().await? {
                Ok(line) => Some((Ok(line), Some(reader))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
