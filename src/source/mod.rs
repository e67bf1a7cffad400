//! Input sources for the moving average sensor.
//!
//! Sources deliver state reports of upstream entities over a channel. The
//! runtime consumes them together with poll ticks in a single loop.

pub mod jsonl;
pub mod types;

// Re-export commonly used types
pub use jsonl::{parse_line, JsonLinesSource, SourceError};
pub use types::{SourceAttributes, SourceState};
