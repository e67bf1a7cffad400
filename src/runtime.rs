//! Event loop driving the configured sensors.
//!
//! Source states and poll ticks are serialized into one loop: every trigger
//! is applied to the affected sensors one at a time, and each resulting state
//! goes to the publisher before the next trigger is accepted. All sensors
//! share the dispatcher clock, which never moves backwards.

use crate::config::{Config, ConfigError};
use crate::core::{FilterError, LivenessState, Reading};
use crate::publish::Publisher;
use crate::sensor::{MovingAverageSensor, SensorState};
use crate::source::SourceState;
use crate::stats::SharedStats;
use chrono::{DateTime, Utc};
use crossbeam_channel::{never, select, tick, Receiver};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long the live loop waits before re-checking the stop flag.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Drives a set of independent sensors from one source and one poll timer.
pub struct Runtime<P: Publisher> {
    sensors: Vec<MovingAverageSensor>,
    /// Sensor indices by source entity id
    routes: HashMap<String, Vec<usize>>,
    /// Sensors stopped after a fatal error
    failed: HashSet<usize>,
    publisher: P,
    stats: SharedStats,
    poll_interval: chrono::Duration,
    /// Latest instant dispatched to any sensor
    clock: Option<DateTime<Utc>>,
}

impl<P: Publisher> Runtime<P> {
    /// Build the sensors described by `config`.
    pub fn new(config: &Config, publisher: P, stats: SharedStats) -> Result<Self, ConfigError> {
        config.validate()?;
        let poll_interval = chrono::Duration::from_std(config.poll_interval)
            .map_err(|_| ConfigError::InvalidPollInterval)?;

        let mut sensors = Vec::with_capacity(config.sensors.len());
        let mut routes: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, sensor_config) in config.sensors.iter().enumerate() {
            sensors.push(MovingAverageSensor::new(sensor_config)?);
            routes
                .entry(sensor_config.entity_id.clone())
                .or_default()
                .push(index);
            tracing::info!(
                sensor = %sensor_config.name,
                entity_id = %sensor_config.entity_id,
                window_secs = sensor_config.window_size.as_secs(),
                "Configured moving average sensor"
            );
        }

        Ok(Self {
            sensors,
            routes,
            failed: HashSet::new(),
            publisher,
            stats,
            poll_interval,
            clock: None,
        })
    }

    /// Apply a source state to every sensor following its entity.
    pub fn handle_source_state(&mut self, state: &SourceState) {
        self.stats.record_state_received();

        let targets: Vec<usize> = self
            .routes
            .get(&state.entity_id)
            .map(|indices| {
                indices
                    .iter()
                    .copied()
                    .filter(|i| !self.failed.contains(i))
                    .collect()
            })
            .unwrap_or_default();
        if targets.is_empty() || state.is_attribute_only() {
            self.stats.record_state_ignored();
            return;
        }

        let mut state = state.clone();
        let now = self.advance(state.timestamp());
        if now != state.timestamp() {
            tracing::debug!(
                entity_id = %state.entity_id,
                reported = %state.timestamp(),
                now = %now,
                "Source state predates the dispatcher clock, using dispatch time"
            );
            state.last_changed = now;
            state.last_updated = now;
        }

        match state.reading() {
            Reading::Value(_) => {}
            Reading::Invalid => self.stats.record_invalid_reading(),
        }

        for index in targets {
            let before = self.sensors[index].liveness();
            let result = self.sensors[index].handle_source_state(&state);
            if let Ok(Some(_)) = result {
                if state.reading().is_valid() {
                    self.stats.record_sample();
                }
            }
            self.finish(index, before, result);
        }
    }

    /// Re-evaluate every sensor at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.stats.record_poll_tick();
        let now = self.advance(now);

        for index in 0..self.sensors.len() {
            if self.failed.contains(&index) {
                continue;
            }
            let before = self.sensors[index].liveness();
            let result = self.sensors[index].update(now).map(Some);
            self.finish(index, before, result);
        }
    }

    /// Run until `running` is cleared, polling on the wall clock.
    ///
    /// With `exit_on_eof` the loop also ends when the source disconnects;
    /// otherwise polling continues without input.
    pub fn run(
        &mut self,
        receiver: &Receiver<SourceState>,
        running: &AtomicBool,
        exit_on_eof: bool,
    ) {
        let ticker = tick(self.poll_interval.to_std().unwrap_or(STOP_CHECK_INTERVAL));
        let idle = never();
        let mut source_ended = false;

        while running.load(Ordering::SeqCst) && !(source_ended && exit_on_eof) {
            select! {
                recv(if source_ended { &idle } else { receiver }) -> message => match message {
                    Ok(state) => self.handle_source_state(&state),
                    Err(_) => {
                        tracing::info!(exit_on_eof, "Source ended");
                        source_ended = true;
                    }
                },
                recv(ticker) -> _ => self.tick(Utc::now()),
                default(STOP_CHECK_INTERVAL) => {}
            }
        }
    }

    /// Replay recorded states on their own clock.
    ///
    /// Poll ticks are synthesized every poll interval starting one interval
    /// after the first state, and continue up to `until` when given. Ticks
    /// stop once the next one would fall past the last representable instant.
    pub fn replay<I>(&mut self, states: I, until: Option<DateTime<Utc>>)
    where
        I: IntoIterator<Item = SourceState>,
    {
        let mut started = false;
        let mut next_tick: Option<DateTime<Utc>> = None;

        for state in states {
            let at = state.timestamp();
            if started {
                next_tick = next_tick.and_then(|tick_at| self.ticks_through(tick_at, at));
            } else {
                started = true;
                next_tick = at.checked_add_signed(self.poll_interval);
            }
            self.handle_source_state(&state);
        }

        if let (Some(tick_at), Some(end)) = (next_tick, until) {
            self.ticks_through(tick_at, end);
        }
    }

    /// Fire ticks from `from` while not after `end`; returns the next tick.
    fn ticks_through(
        &mut self,
        mut from: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        while from <= end {
            self.tick(from);
            from = from.checked_add_signed(self.poll_interval)?;
        }
        Some(from)
    }

    /// Move the dispatcher clock forward to at least `at`.
    fn advance(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        let now = match self.clock {
            Some(clock) if clock > at => clock,
            _ => at,
        };
        self.clock = Some(now);
        now
    }

    fn finish(
        &mut self,
        index: usize,
        before: LivenessState,
        result: Result<Option<SensorState>, FilterError>,
    ) {
        match result {
            Ok(Some(state)) => {
                let after = self.sensors[index].liveness();
                if before != LivenessState::Expired && after == LivenessState::Expired {
                    self.stats.record_timeout();
                }
                self.publish(&state);
            }
            Ok(None) => self.stats.record_state_ignored(),
            Err(e) => {
                tracing::error!(
                    sensor = %self.sensors[index].name(),
                    "Stopping sensor: {}",
                    e
                );
                self.failed.insert(index);
                self.stats.record_failed_sensor();
            }
        }
    }

    fn publish(&mut self, state: &SensorState) {
        match self.publisher.publish(state) {
            Ok(()) => self.stats.record_publication(),
            Err(e) => tracing::warn!(sensor = %state.name, "Failed to publish state: {}", e),
        }
    }

    pub fn sensors(&self) -> &[MovingAverageSensor] {
        &self.sensors
    }

    /// Names of sensors stopped after a fatal error.
    pub fn failed_sensors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .failed
            .iter()
            .map(|&i| self.sensors[i].name())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}
