//! Publishing of sensor states to the host.

use crate::sensor::SensorState;
use std::io::Write;

/// Errors that can occur while publishing.
#[derive(Debug)]
pub enum PublishError {
    IoError(String),
    SerializeError(String),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::IoError(e) => write!(f, "IO error: {e}"),
            PublishError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for PublishError {}

/// Receives every state a sensor produces.
pub trait Publisher {
    fn publish(&mut self, state: &SensorState) -> Result<(), PublishError>;
}

/// Writes one JSON document per state, newline separated.
pub struct JsonLinesPublisher<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesPublisher<std::io::Stdout> {
    /// Publisher writing to standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish(&mut self, state: &SensorState) -> Result<(), PublishError> {
        serde_json::to_writer(&mut self.writer, state)
            .map_err(|e| PublishError::SerializeError(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(|e| PublishError::IoError(e.to_string()))
    }
}

/// Keeps published states in memory.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    states: Vec<SensorState>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> &[SensorState] {
        &self.states
    }

    /// States published by the named sensor, in order.
    pub fn states_for(&self, name: &str) -> Vec<&SensorState> {
        self.states.iter().filter(|s| s.name == name).collect()
    }

    pub fn take(&mut self) -> Vec<SensorState> {
        std::mem::take(&mut self.states)
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&mut self, state: &SensorState) -> Result<(), PublishError> {
        self.states.push(state.clone());
        Ok(())
    }
}
