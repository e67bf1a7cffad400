//! Core functionality for the moving average sensor.
//!
//! This module contains:
//! - The sample store holding the current window
//! - Time-weighted window aggregation and rounding
//! - The liveness state machine for invalid input
//! - The filter coordinating both update triggers

pub mod aggregator;
pub mod coordinator;
pub mod liveness;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use aggregator::{round_to, WindowAggregator};
pub use coordinator::{MovingAverageFilter, Trigger};
pub use liveness::{LivenessMonitor, LivenessState};
pub use store::SampleStore;
pub use types::{FilterError, Output, Reading, Sample};
