//! Upstream entity state types.
//!
//! A source state is what the upstream entity reports whenever its state or
//! attributes change. Only the state string and the change timestamps feed
//! the filter; the display attributes are adopted by the sensor.

use crate::core::types::Reading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display attributes reported by the source entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A state report from the source entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    /// Entity that reported the state
    pub entity_id: String,
    /// Raw state string; absent when the entity was removed
    #[serde(default)]
    pub state: Option<String>,
    /// When the state value last changed
    pub last_changed: DateTime<Utc>,
    /// When the state or its attributes were last written
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub attributes: SourceAttributes,
}

impl SourceState {
    /// Create a state whose value changed at `timestamp`.
    pub fn new(entity_id: &str, state: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            state: Some(state.to_string()),
            last_changed: timestamp,
            last_updated: timestamp,
            attributes: SourceAttributes::default(),
        }
    }

    /// The reading carried by this state.
    pub fn reading(&self) -> Reading {
        Reading::parse(self.state.as_deref())
    }

    /// Whether only attributes were refreshed, without a state change.
    pub fn is_attribute_only(&self) -> bool {
        self.last_changed != self.last_updated
    }

    /// Instant at which this report took effect.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.last_updated
    }
}
