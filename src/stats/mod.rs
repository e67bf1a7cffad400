//! Statistics about what the sensors processed.

pub mod counters;

// Re-export commonly used types
pub use counters::{create_shared_stats, FilterStats, SharedStats, StatsSnapshot};
