//! Input validity tracking.
//!
//! An invalid reading starts a timeout. If no valid reading arrives before
//! it elapses, the monitor moves to `Expired` and the filter discards its
//! window and reports unavailability until the input recovers.

use crate::core::types::Reading;
use chrono::{DateTime, Duration, Utc};

/// Validity state of the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// Input is trustworthy
    Valid,
    /// Input has been invalid since the given instant
    Invalid { since: DateTime<Utc> },
    /// Input stayed invalid for the whole timeout
    Expired,
}

/// Timeout state machine for one input stream.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    timeout: Duration,
    state: LivenessState,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: LivenessState::Valid,
        }
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    /// Apply an input reading observed at `now`.
    pub fn on_input(&mut self, reading: Reading, now: DateTime<Utc>) -> LivenessState {
        self.state = match (reading, self.state) {
            (Reading::Value(_), _) => LivenessState::Valid,
            // `since` stays pinned to the first invalid reading
            (Reading::Invalid, LivenessState::Invalid { since }) => LivenessState::Invalid { since },
            (Reading::Invalid, LivenessState::Expired) => LivenessState::Expired,
            (Reading::Invalid, LivenessState::Valid) => LivenessState::Invalid { since: now },
        };
        self.check_expiry(now)
    }

    /// Apply a poll tick at `now`.
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> LivenessState {
        self.check_expiry(now)
    }

    fn check_expiry(&mut self, now: DateTime<Utc>) -> LivenessState {
        if let LivenessState::Invalid { since } = self.state {
            if now - since >= self.timeout {
                self.state = LivenessState::Expired;
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_starts_valid() {
        let mut monitor = LivenessMonitor::new(Duration::seconds(60));
        assert_eq!(monitor.state(), LivenessState::Valid);
        assert_eq!(monitor.on_tick(at(1000)), LivenessState::Valid);
    }

    #[test]
    fn test_invalid_then_expired() {
        let mut monitor = LivenessMonitor::new(Duration::seconds(120));

        assert_eq!(
            monitor.on_input(Reading::Invalid, at(0)),
            LivenessState::Invalid { since: at(0) }
        );
        assert_eq!(
            monitor.on_tick(at(119)),
            LivenessState::Invalid { since: at(0) }
        );
        assert_eq!(monitor.on_tick(at(120)), LivenessState::Expired);
        assert_eq!(monitor.on_tick(at(500)), LivenessState::Expired);
    }

    #[test]
    fn test_since_is_pinned() {
        let mut monitor = LivenessMonitor::new(Duration::seconds(60));
        monitor.on_input(Reading::Invalid, at(0));
        monitor.on_input(Reading::Invalid, at(30));

        assert_eq!(
            monitor.on_input(Reading::Invalid, at(59)),
            LivenessState::Invalid { since: at(0) }
        );
        assert_eq!(
            monitor.on_input(Reading::Invalid, at(60)),
            LivenessState::Expired
        );
    }

    #[test]
    fn test_valid_reading_resets() {
        let mut monitor = LivenessMonitor::new(Duration::seconds(60));
        monitor.on_input(Reading::Invalid, at(0));
        assert_eq!(
            monitor.on_input(Reading::Value(1.0), at(30)),
            LivenessState::Valid
        );

        // A new invalid period starts its own timeout
        monitor.on_input(Reading::Invalid, at(40));
        assert_eq!(
            monitor.on_tick(at(90)),
            LivenessState::Invalid { since: at(40) }
        );
    }

    #[test]
    fn test_recovers_from_expired() {
        let mut monitor = LivenessMonitor::new(Duration::seconds(10));
        monitor.on_input(Reading::Invalid, at(0));
        monitor.on_tick(at(10));
        assert_eq!(monitor.state(), LivenessState::Expired);

        assert_eq!(
            monitor.on_input(Reading::Value(3.0), at(15)),
            LivenessState::Valid
        );
    }

    #[test]
    fn test_zero_timeout_expires_immediately() {
        let mut monitor = LivenessMonitor::new(Duration::zero());
        assert_eq!(
            monitor.on_input(Reading::Invalid, at(0)),
            LivenessState::Expired
        );
    }

    #[test]
    fn test_deterministic() {
        let run = || {
            let mut monitor = LivenessMonitor::new(Duration::seconds(5));
            vec![
                monitor.on_input(Reading::Value(1.0), at(0)),
                monitor.on_input(Reading::Invalid, at(1)),
                monitor.on_tick(at(4)),
                monitor.on_tick(at(6)),
                monitor.on_input(Reading::Value(2.0), at(7)),
            ]
        };
        assert_eq!(run(), run());
    }
}
