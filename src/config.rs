//! Configuration for the moving average sensor.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout before an invalid input resets the window.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of decimals in the output.
pub const DEFAULT_PRECISION: u32 = 2;

/// Default interval between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Entity domain the source must belong to.
pub const SOURCE_DOMAIN: &str = "sensor";

/// Parameters of a single filter instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    /// Length of the sliding window
    pub window_size: Duration,
    /// How long the input may stay invalid before the window is reset
    pub timeout: Duration,
    /// Number of decimals in the output
    pub precision: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::from_secs(300),
            timeout: DEFAULT_TIMEOUT,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl FilterConfig {
    /// Check the parameters before a filter is built from them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size.is_zero() {
            return Err(ConfigError::InvalidWindow(
                "window_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main configuration: the poll cadence and the configured sensors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interval between poll ticks
    #[serde(with = "duration_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Configured moving average sensors
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            sensors: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("moving-average-sensor")
            .join("config.json")
    }

    /// Validate the poll interval and every sensor entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidPollInterval);
        }

        let mut names = HashSet::new();
        for sensor in &self.sensors {
            sensor.validate()?;
            if !names.insert(sensor.name.as_str()) {
                return Err(ConfigError::DuplicateSensor(sensor.name.clone()));
            }
        }
        Ok(())
    }
}

/// Configuration of one moving average sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Display name of the sensor
    pub name: String,

    /// Stable identifier, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Source entity whose state is averaged
    pub entity_id: String,

    /// Length of the sliding window
    #[serde(with = "duration_serde")]
    pub window_size: Duration,

    /// Number of decimals in the output
    #[serde(default = "default_precision")]
    pub precision: u32,

    /// How long the source may stay invalid before the window is reset
    #[serde(with = "duration_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl SensorConfig {
    /// Create a sensor entry with default precision and timeout.
    pub fn new(name: &str, entity_id: &str, window_size: Duration) -> Self {
        Self {
            name: name.to_string(),
            unique_id: None,
            entity_id: entity_id.to_string(),
            window_size,
            precision: DEFAULT_PRECISION,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Check the entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidName);
        }
        if !is_source_entity(&self.entity_id) {
            return Err(ConfigError::InvalidEntityId(self.entity_id.clone()));
        }
        self.filter_config().validate()
    }

    /// Parameters for the filter backing this sensor.
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            window_size: self.window_size,
            timeout: self.timeout,
            precision: self.precision,
        }
    }
}

/// Check that an entity id has the form `sensor.<object_id>`.
fn is_source_entity(entity_id: &str) -> bool {
    match entity_id.split_once('.') {
        Some((domain, object_id)) => {
            domain == SOURCE_DOMAIN
                && !object_id.is_empty()
                && object_id
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    }
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidWindow(String),
    InvalidTimeout(String),
    InvalidPollInterval,
    InvalidName,
    InvalidEntityId(String),
    DuplicateSensor(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidWindow(e) => write!(f, "Invalid window size: {e}"),
            ConfigError::InvalidTimeout(e) => write!(f, "Invalid timeout: {e}"),
            ConfigError::InvalidPollInterval => write!(f, "poll_interval must be positive"),
            ConfigError::InvalidName => write!(f, "Sensor name must not be empty"),
            ConfigError::InvalidEntityId(id) => {
                write!(f, "Entity id {id:?} is not in the {SOURCE_DOMAIN} domain")
            }
            ConfigError::DuplicateSensor(name) => write!(f, "Duplicate sensor name: {name}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
