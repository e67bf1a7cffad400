//! Runtime statistics for the moving average sensors.
//!
//! Counters are atomics so the Ctrl+C path and the main loop can share one
//! instance without locking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one runtime session.
#[derive(Debug)]
pub struct FilterStats {
    /// Source states received from the upstream
    states_received: AtomicU64,
    /// Attribute-only or unrouted states that triggered nothing
    states_ignored: AtomicU64,
    /// Readings that were unknown, unavailable or non-numeric
    invalid_readings: AtomicU64,
    /// Samples stored in a window
    samples_recorded: AtomicU64,
    /// Poll ticks dispatched
    poll_ticks: AtomicU64,
    /// Windows reset after a timeout
    timeouts: AtomicU64,
    /// Sensor states handed to the publisher
    publications: AtomicU64,
    /// Sensors stopped after a fatal error
    failed_sensors: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl FilterStats {
    /// Create a new set of counters.
    pub fn new() -> Self {
        Self {
            states_received: AtomicU64::new(0),
            states_ignored: AtomicU64::new(0),
            invalid_readings: AtomicU64::new(0),
            samples_recorded: AtomicU64::new(0),
            poll_ticks: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            publications: AtomicU64::new(0),
            failed_sensors: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_state_received(&self) {
        self.states_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_state_ignored(&self) {
        self.states_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_reading(&self) {
        self.invalid_readings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self) {
        self.samples_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_tick(&self) {
        self.poll_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publication(&self) {
        self.publications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_sensor(&self) {
        self.failed_sensors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            states_received: self.states_received.load(Ordering::Relaxed),
            states_ignored: self.states_ignored.load(Ordering::Relaxed),
            invalid_readings: self.invalid_readings.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            poll_ticks: self.poll_ticks.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            publications: self.publications.load(Ordering::Relaxed),
            failed_sensors: self.failed_sensors.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Source states received: {}\n\
             - Source states ignored: {}\n\
             - Invalid readings: {}\n\
             - Samples recorded: {}\n\
             - Poll ticks: {}\n\
             - Timeouts: {}\n\
             - States published: {}\n\
             - Failed sensors: {}\n\
             - Session duration: {} seconds",
            stats.states_received,
            stats.states_ignored,
            stats.invalid_readings,
            stats.samples_recorded,
            stats.poll_ticks,
            stats.timeouts,
            stats.publications,
            stats.failed_sensors,
            stats.session_duration_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.states_received,
            &self.states_ignored,
            &self.invalid_readings,
            &self.samples_recorded,
            &self.poll_ticks,
            &self.timeouts,
            &self.publications,
            &self.failed_sensors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for FilterStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of runtime statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub states_received: u64,
    pub states_ignored: u64,
    pub invalid_readings: u64,
    pub samples_recorded: u64,
    pub poll_ticks: u64,
    pub timeouts: u64,
    pub publications: u64,
    pub failed_sensors: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedStats = Arc<FilterStats>;

/// Create a new shared statistics instance.
pub fn create_shared_stats() -> SharedStats {
    Arc::new(FilterStats::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = FilterStats::new();

        stats.record_state_received();
        stats.record_state_received();
        stats.record_invalid_reading();
        stats.record_poll_tick();

        let snapshot = stats.stats();
        assert_eq!(snapshot.states_received, 2);
        assert_eq!(snapshot.invalid_readings, 1);
        assert_eq!(snapshot.poll_ticks, 1);
        assert_eq!(snapshot.timeouts, 0);
    }

    #[test]
    fn test_reset() {
        let stats = FilterStats::new();
        stats.record_sample();
        stats.record_timeout();
        stats.reset();

        let snapshot = stats.stats();
        assert_eq!(snapshot.samples_recorded, 0);
        assert_eq!(snapshot.timeouts, 0);
    }

    #[test]
    fn test_summary_format() {
        let stats = FilterStats::new();
        let summary = stats.summary();

        assert!(summary.contains("Source states received"));
        assert!(summary.contains("Timeouts"));
        assert!(summary.contains("States published"));
    }
}
