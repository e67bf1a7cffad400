//! Moving average sensor entity.
//!
//! Wraps a [`MovingAverageFilter`] with the entity-facing concerns: which
//! source it follows, which display attributes it adopted from that source,
//! and the state it publishes after every update.

use crate::config::{ConfigError, SensorConfig};
use crate::core::{FilterError, LivenessState, MovingAverageFilter, Output, Reading};
use crate::source::{SourceAttributes, SourceState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Icon used when the source does not provide one.
pub const DEFAULT_ICON: &str = "mdi:chart-line-variant";

/// State string published while no average is available.
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Device classes a numeric sensor may carry.
pub const DEVICE_CLASSES: &[&str] = &[
    "apparent_power",
    "aqi",
    "atmospheric_pressure",
    "battery",
    "carbon_dioxide",
    "carbon_monoxide",
    "current",
    "data_rate",
    "data_size",
    "distance",
    "duration",
    "energy",
    "energy_storage",
    "frequency",
    "gas",
    "humidity",
    "illuminance",
    "irradiance",
    "moisture",
    "monetary",
    "nitrogen_dioxide",
    "nitrogen_monoxide",
    "nitrous_oxide",
    "ozone",
    "ph",
    "pm1",
    "pm10",
    "pm25",
    "power",
    "power_factor",
    "precipitation",
    "precipitation_intensity",
    "pressure",
    "reactive_power",
    "signal_strength",
    "sound_pressure",
    "speed",
    "sulphur_dioxide",
    "temperature",
    "volatile_organic_compounds",
    "volatile_organic_compounds_parts",
    "voltage",
    "volume",
    "volume_flow_rate",
    "volume_storage",
    "water",
    "weight",
    "wind_speed",
];

/// State classes a numeric sensor may carry.
pub const STATE_CLASSES: &[&str] = &["measurement", "total", "total_increasing"];

/// Published state value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// Average rounded to zero decimals
    Integer(i64),
    /// Average rounded to the configured decimals
    Float(f64),
    /// Non-numeric state such as `unavailable`
    Text(String),
}

impl StateValue {
    /// Convert a filter output for a sensor with the given precision.
    pub fn from_output(output: Output, precision: u32) -> Self {
        match output {
            Output::Value(v) if precision == 0 && v.abs() < i64::MAX as f64 => {
                StateValue::Integer(v as i64)
            }
            Output::Value(v) => StateValue::Float(v),
            Output::Unavailable => StateValue::Text(STATE_UNAVAILABLE.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StateValue::Integer(v) => Some(*v as f64),
            StateValue::Float(v) => Some(*v),
            StateValue::Text(_) => None,
        }
    }
}

/// Extra attributes published with the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAttributes {
    /// Source entity being averaged
    pub entity_id: String,
    /// Samples currently held in the window, carry-in included
    pub data_points: usize,
}

/// A published sensor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorState {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    /// Identifier of this sensor instance for the current process
    pub instance_id: Uuid,
    pub state: StateValue,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    pub icon: String,
    pub attributes: SensorAttributes,
    /// Evaluation instant of the published value
    pub computed_at: DateTime<Utc>,
}

/// A sensor publishing the moving average of one source entity.
pub struct MovingAverageSensor {
    name: String,
    unique_id: Option<String>,
    instance_id: Uuid,
    entity_id: String,
    filter: MovingAverageFilter,
    /// Display attributes adopted from the source
    adopted: SourceAttributes,
    output: Output,
    last_evaluated: Option<DateTime<Utc>>,
}

impl MovingAverageSensor {
    /// Create a sensor from its configuration.
    pub fn new(config: &SensorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let filter = MovingAverageFilter::new(config.filter_config())?;

        Ok(Self {
            name: config.name.clone(),
            unique_id: config.unique_id.clone(),
            instance_id: Uuid::new_v4(),
            entity_id: config.entity_id.clone(),
            filter,
            adopted: SourceAttributes::default(),
            output: Output::Unavailable,
            last_evaluated: None,
        })
    }

    /// Process a state report of the source entity.
    ///
    /// Returns `None` when the report does not trigger an update: it belongs
    /// to another entity, or only its attributes changed.
    pub fn handle_source_state(
        &mut self,
        state: &SourceState,
    ) -> Result<Option<SensorState>, FilterError> {
        if state.entity_id != self.entity_id {
            return Ok(None);
        }
        if state.is_attribute_only() {
            tracing::debug!(sensor = %self.name, "Not updating, only attributes changed");
            return Ok(None);
        }

        let reading = state.reading();
        match reading {
            Reading::Value(value) => {
                tracing::debug!(sensor = %self.name, value, "Updating with new reading");
                self.adopt_attributes(&state.attributes);
            }
            Reading::Invalid => {
                tracing::debug!(
                    sensor = %self.name,
                    state = ?state.state,
                    "Received invalid state, timeout running"
                );
            }
        }

        let now = state.timestamp();
        self.output = self.filter.handle_input_event(reading, now)?;
        self.last_evaluated = Some(now);
        Ok(Some(self.state()))
    }

    /// Re-evaluate on a poll tick.
    pub fn update(&mut self, now: DateTime<Utc>) -> Result<SensorState, FilterError> {
        self.output = self.filter.handle_poll_tick(now)?;
        self.last_evaluated = Some(now);
        tracing::debug!(sensor = %self.name, output = ?self.output, "Poll update");
        Ok(self.state())
    }

    /// The state as of the last evaluation.
    pub fn state(&self) -> SensorState {
        SensorState {
            name: self.name.clone(),
            unique_id: self.unique_id.clone(),
            instance_id: self.instance_id,
            state: StateValue::from_output(self.output, self.filter.precision()),
            available: self.available(),
            unit_of_measurement: self.adopted.unit_of_measurement.clone(),
            device_class: self.adopted.device_class.clone(),
            state_class: self.adopted.state_class.clone(),
            icon: self
                .adopted
                .icon
                .clone()
                .unwrap_or_else(|| DEFAULT_ICON.to_string()),
            attributes: SensorAttributes {
                entity_id: self.entity_id.clone(),
                data_points: self.filter.data_points(),
            },
            computed_at: self.last_evaluated.unwrap_or_else(Utc::now),
        }
    }

    /// Adopt each display attribute the first time the source provides it.
    fn adopt_attributes(&mut self, attributes: &SourceAttributes) {
        let adopted = &mut self.adopted;
        if adopted.unit_of_measurement.is_none() {
            adopted.unit_of_measurement = attributes.unit_of_measurement.clone();
        }
        if adopted.device_class.is_none() {
            adopted.device_class = known(&attributes.device_class, DEVICE_CLASSES);
        }
        if adopted.state_class.is_none() {
            adopted.state_class = known(&attributes.state_class, STATE_CLASSES);
        }
        if adopted.icon.is_none() {
            adopted.icon = Some(
                attributes
                    .icon
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ICON.to_string()),
            );
        }
    }

    pub fn available(&self) -> bool {
        self.output.is_available()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn output(&self) -> Output {
        self.output
    }

    pub fn liveness(&self) -> LivenessState {
        self.filter.liveness()
    }

    pub fn data_points(&self) -> usize {
        self.filter.data_points()
    }
}

/// The value if it is one of `allowed`.
fn known(value: &Option<String>, allowed: &[&str]) -> Option<String> {
    value
        .as_deref()
        .filter(|v| allowed.contains(v))
        .map(str::to_string)
}
