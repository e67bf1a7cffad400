//! Moving Average Sensor - time-weighted averaging of irregular numeric streams.
//!
//! A sensor follows one upstream entity. Every state change of that entity
//! and every poll tick re-evaluates the time-weighted mean of the entity's
//! value over a sliding window, so the output tracks how long each value
//! was in effect rather than how often it was reported.
//!
//! # Behavior
//!
//! - **Step function**: each value holds until the next one arrives
//! - **Sliding window**: values that left the window stop contributing
//! - **Timeout**: input that stays unknown/unavailable/non-numeric for the
//!   whole timeout resets the window and makes the sensor unavailable
//! - **Bounded memory**: only samples inside the window plus one carry-in
//!   sample are kept
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Moving Average Sensor                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Source    │──▶│   Runtime   │──▶│  Publisher  │        │
//! │  │ (JSON lines)│   │ (poll tick) │   │ (JSON lines)│        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                           │                                 │
//! │                           ▼                                 │
//! │              ┌───────────────────────┐                      │
//! │              │  MovingAverageFilter  │                      │
//! │              │  store · aggregator · │                      │
//! │              │  liveness             │                      │
//! │              └───────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use moving_average_sensor::{FilterConfig, MovingAverageFilter, Output, Reading};
//!
//! let mut filter = MovingAverageFilter::new(FilterConfig {
//!     window_size: std::time::Duration::from_secs(60),
//!     ..FilterConfig::default()
//! })
//! .expect("valid configuration");
//!
//! let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
//! filter.handle_input_event(Reading::Value(10.0), t0).unwrap();
//! filter.handle_input_event(Reading::Value(20.0), t0 + Duration::seconds(30)).unwrap();
//!
//! let output = filter.handle_poll_tick(t0 + Duration::seconds(60)).unwrap();
//! assert_eq!(output, Output::Value(15.0));
//! ```

pub mod config;
pub mod core;
pub mod publish;
pub mod runtime;
pub mod sensor;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, FilterConfig, SensorConfig};
pub use crate::core::{
    FilterError, LivenessState, MovingAverageFilter, Output, Reading, Sample, SampleStore,
    WindowAggregator,
};
pub use publish::{JsonLinesPublisher, MemoryPublisher, PublishError, Publisher};
pub use runtime::Runtime;
pub use sensor::{MovingAverageSensor, SensorState, StateValue};
pub use source::{JsonLinesSource, SourceAttributes, SourceState};
pub use stats::{create_shared_stats, FilterStats, SharedStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
