//! ==============================================================================
//! turbidity_host - live turbidity relay with simulated fallback
//! ==============================================================================
//!
//! pipeline:
//!
//! ```text
//!     serial port ─▶ sensor.rs ─▶ relay.rs ─▶ server.rs (/events)
//!                                                 │ network
//!                                                 ▼
//!            viewer.rs ─▶ session.rs ─▶ extract.rs / simulator.rs / quality.rs
//! ```
//!
//! the server side owns the single sensor connection and fans lines out;
//! every viewer session decides on its own whether it is showing live or
//! simulated data.
//!
//! ==============================================================================

pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod logging;
pub mod push;
pub mod quality;
pub mod relay;
pub mod sensor;
pub mod server;
pub mod session;
pub mod simulator;
pub mod viewer;
pub mod weather;

pub use domain::{Reading, SensorState, Source, StatusReport, SENSOR_DATA_EVENT};
pub use quality::Quality;
pub use relay::BroadcastRelay;
pub use session::{FeedState, ViewerSession};
