//! Single entry point for both update triggers.
//!
//! Input events and poll ticks are funneled through one dispatch path that
//! updates liveness, records samples, evicts the window and evaluates the
//! average. Exactly one evaluation happens per trigger.

use crate::config::{ConfigError, FilterConfig};
use crate::core::aggregator::WindowAggregator;
use crate::core::liveness::{LivenessMonitor, LivenessState};
use crate::core::store::SampleStore;
use crate::core::types::{FilterError, Output, Reading};
use chrono::{DateTime, Utc};

/// What caused an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// A new upstream reading
    Input {
        reading: Reading,
        timestamp: DateTime<Utc>,
    },
    /// A periodic re-evaluation
    Tick { now: DateTime<Utc> },
}

impl Trigger {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Trigger::Input { timestamp, .. } => *timestamp,
            Trigger::Tick { now } => *now,
        }
    }
}

/// A time-weighted moving average filter over one input stream.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    store: SampleStore,
    aggregator: WindowAggregator,
    liveness: LivenessMonitor,
    /// Set once a fatal error has been surfaced
    poisoned: bool,
}

impl MovingAverageFilter {
    /// Create a filter with an empty window.
    pub fn new(config: FilterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let window = chrono::Duration::from_std(config.window_size)
            .map_err(|e| ConfigError::InvalidWindow(e.to_string()))?;
        let timeout = chrono::Duration::from_std(config.timeout)
            .map_err(|e| ConfigError::InvalidTimeout(e.to_string()))?;

        Ok(Self {
            store: SampleStore::new(),
            aggregator: WindowAggregator::new(window, config.precision),
            liveness: LivenessMonitor::new(timeout),
            poisoned: false,
        })
    }

    /// Handle an upstream reading and evaluate at its timestamp.
    pub fn handle_input_event(
        &mut self,
        reading: Reading,
        timestamp: DateTime<Utc>,
    ) -> Result<Output, FilterError> {
        self.dispatch(Trigger::Input { reading, timestamp })
    }

    /// Handle a poll tick and evaluate at `now`.
    pub fn handle_poll_tick(&mut self, now: DateTime<Utc>) -> Result<Output, FilterError> {
        self.dispatch(Trigger::Tick { now })
    }

    /// Apply one trigger and evaluate.
    pub fn dispatch(&mut self, trigger: Trigger) -> Result<Output, FilterError> {
        if self.poisoned {
            return Err(FilterError::Poisoned);
        }

        let before = self.liveness.state();
        let state = match trigger {
            Trigger::Input { reading, timestamp } => {
                let state = self.liveness.on_input(reading, timestamp);
                if let (LivenessState::Valid, Reading::Value(value)) = (state, reading) {
                    if before == LivenessState::Expired {
                        tracing::info!("Input recovered, starting a fresh window");
                    }
                    tracing::debug!(value, %timestamp, "Recording sample");
                    if let Err(e) = self.store.record(timestamp, value) {
                        self.poisoned = true;
                        return Err(e);
                    }
                } else if before == LivenessState::Valid {
                    tracing::debug!(%timestamp, "Input became invalid, starting timeout");
                }
                state
            }
            Trigger::Tick { now } => self.liveness.on_tick(now),
        };

        if state == LivenessState::Expired {
            if before != LivenessState::Expired {
                tracing::info!(
                    data_points = self.store.len(),
                    "Input invalid for the whole timeout, resetting moving average"
                );
            }
            self.store.clear();
        }

        Ok(self.evaluate_and_emit(trigger.now()))
    }

    /// Evaluate the output as of `now`.
    ///
    /// Evicting samples that left the window is the only mutation, and it
    /// never changes the result of a repeated evaluation.
    pub fn evaluate_and_emit(&mut self, now: DateTime<Utc>) -> Output {
        if self.liveness.state() == LivenessState::Expired {
            return Output::Unavailable;
        }

        let start = self.aggregator.window_start(now);
        let dropped = self.store.evict_before(start);
        if dropped > 0 {
            tracing::debug!(dropped, window_start = %start, "Evicted samples outside the window");
        }

        match self.aggregator.average(&self.store, now) {
            Some(value) => Output::Value(value),
            None => Output::Unavailable,
        }
    }

    /// Unrounded average as of `now`, without touching the store.
    pub fn mean(&self, now: DateTime<Utc>) -> Option<f64> {
        if self.liveness.state() == LivenessState::Expired {
            return None;
        }
        self.aggregator.mean(&self.store, now)
    }

    pub fn liveness(&self) -> LivenessState {
        self.liveness.state()
    }

    /// Number of data points currently held, carry-in anchor included.
    pub fn data_points(&self) -> usize {
        self.store.len()
    }

    pub fn precision(&self) -> u32 {
        self.aggregator.precision()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}
