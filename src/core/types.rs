//! Value types shared by the filter components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single numeric observation of the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the upstream value took effect
    pub timestamp: DateTime<Utc>,
    /// The observed value
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A reading reported by the upstream source.
///
/// `Invalid` covers unknown, unavailable, missing and non-numeric states.
/// It is normal signal, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Value(f64),
    Invalid,
}

impl Reading {
    /// Parse a raw upstream state string.
    pub fn parse(state: Option<&str>) -> Self {
        match state.map(str::trim) {
            None | Some("unknown") | Some("unavailable") | Some("") => Reading::Invalid,
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => Reading::Value(value),
                _ => Reading::Invalid,
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Reading::Value(_))
    }
}

/// Result of one evaluation of the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Output {
    /// Moving average rounded to the configured precision
    Value(f64),
    Unavailable,
}

impl Output {
    pub fn value(&self) -> Option<f64> {
        match self {
            Output::Value(v) => Some(*v),
            Output::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Output::Value(_))
    }
}

/// Errors raised by a filter instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A sample arrived with a timestamp before the last recorded sample
    OutOfOrder {
        last: DateTime<Utc>,
        received: DateTime<Utc>,
    },
    /// The instance hit a fatal error earlier and refuses further triggers
    Poisoned,
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::OutOfOrder { last, received } => write!(
                f,
                "Out of order sample: {received} is earlier than last recorded {last}"
            ),
            FilterError::Poisoned => write!(f, "Filter stopped after an earlier fatal error"),
        }
    }
}

impl std::error::Error for FilterError {}

/// Seconds between two instants with microsecond resolution.
pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}
