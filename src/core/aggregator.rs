//! Time-weighted averaging over a sliding window.
//!
//! The input is treated as a step function: each sample's value holds from
//! its timestamp until the next sample, and the newest value holds until the
//! evaluation instant. The average is the integral of that step function over
//! `[now - window, now]` divided by the covered duration. Before the first
//! ever sample the signal is undefined, so a window that reaches back past it
//! is shortened to start at that sample.

use crate::core::store::SampleStore;
use crate::core::types::seconds_between;
use chrono::{DateTime, Duration, Utc};

/// Computes the moving average over the contents of a [`SampleStore`].
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    /// Length of the sliding window
    window: Duration,
    /// Number of decimals in the output
    precision: u32,
}

impl WindowAggregator {
    pub fn new(window: Duration, precision: u32) -> Self {
        Self { window, precision }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Start of the window ending at `now`, clamped to the earliest instant.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Rounded time-weighted average as of `now`, or `None` without data.
    ///
    /// The store is expected to have been evicted up to [`Self::window_start`].
    pub fn average(&self, store: &SampleStore, now: DateTime<Utc>) -> Option<f64> {
        self.mean(store, now).map(|mean| round_to(mean, self.precision))
    }

    /// Unrounded time-weighted average as of `now`.
    pub fn mean(&self, store: &SampleStore, now: DateTime<Utc>) -> Option<f64> {
        let start = self.window_start(now);
        let samples = store.snapshot();

        // Value in effect at the leading edge of the window
        let (effective_start, mut current) = match (store.anchor(), samples.front()) {
            (Some(anchor), _) => (start, anchor.value),
            (None, Some(first)) => (first.timestamp.max(start), first.value),
            (None, None) => return None,
        };

        let mut accumulated = 0.0;
        let mut cursor = effective_start;
        for sample in samples.iter().filter(|s| s.timestamp <= now) {
            let from = sample.timestamp.max(effective_start);
            if from > cursor {
                accumulated += current * seconds_between(cursor, from);
                cursor = from;
            }
            current = sample.value;
        }

        // Held value up to the evaluation instant
        if now > cursor {
            accumulated += current * seconds_between(cursor, now);
        }

        let duration = seconds_between(effective_start, now);
        tracing::debug!(
            window_start = %start,
            effective_start = %effective_start,
            duration,
            data_points = store.len(),
            "Computed window integral"
        );

        if duration <= 0.0 {
            return Some(current);
        }
        Some(accumulated / duration)
    }
}

/// Round half away from zero to `precision` decimals.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(i32::MAX as u32) as i32);
    if !factor.is_finite() {
        return value;
    }
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Sample;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    fn store_with(samples: &[(i64, f64)]) -> SampleStore {
        let mut store = SampleStore::new();
        for &(t, v) in samples {
            store.record(at(t), v).unwrap();
        }
        store
    }

    #[test]
    fn test_empty_store_has_no_data() {
        let aggregator = WindowAggregator::new(Duration::seconds(60), 2);
        assert_eq!(aggregator.average(&SampleStore::new(), at(0)), None);
    }

    #[test]
    fn test_single_sample_at_its_own_instant() {
        let aggregator = WindowAggregator::new(Duration::seconds(60), 2);
        let store = store_with(&[(0, 10.0)]);
        assert_eq!(aggregator.average(&store, at(0)), Some(10.0));
    }

    #[test]
    fn test_step_function_integral() {
        // 2 for 10s, 8 for 20s, 5 for 30s over a 60s window
        let aggregator = WindowAggregator::new(Duration::seconds(60), 4);
        let mut store = store_with(&[(0, 2.0), (10, 8.0), (30, 5.0)]);
        store.evict_before(aggregator.window_start(at(60)));

        let expected = (2.0 * 10.0 + 8.0 * 20.0 + 5.0 * 30.0) / 60.0;
        let mean = aggregator.mean(&store, at(60)).unwrap();
        assert!((mean - expected).abs() < 1e-9);
    }

    #[test]
    fn test_independent_of_sample_count() {
        // Same step function expressed with redundant samples
        let aggregator = WindowAggregator::new(Duration::seconds(60), 6);
        let sparse = store_with(&[(0, 3.0), (30, 9.0)]);
        let dense = store_with(&[(0, 3.0), (10, 3.0), (20, 3.0), (30, 9.0), (45, 9.0)]);

        assert_eq!(
            aggregator.average(&sparse, at(60)),
            aggregator.average(&dense, at(60))
        );
        assert_eq!(aggregator.average(&sparse, at(60)), Some(6.0));
    }

    #[test]
    fn test_window_shorter_than_history_uses_first_sample() {
        // Only 20s of data in a 60s window: average covers 20s, not 60s
        let aggregator = WindowAggregator::new(Duration::seconds(60), 2);
        let store = store_with(&[(0, 4.0), (10, 8.0)]);
        assert_eq!(aggregator.average(&store, at(20)), Some(6.0));
    }

    #[test]
    fn test_anchor_weights_leading_edge() {
        let aggregator = WindowAggregator::new(Duration::seconds(60), 4);
        let mut store = store_with(&[(0, 10.0), (50, 0.0)]);

        // Window [40, 100]: 10 holds for 10s, then 0 for 50s
        store.evict_before(aggregator.window_start(at(100)));
        assert_eq!(store.anchor(), Some(Sample::new(at(0), 10.0)));
        let mean = aggregator.mean(&store, at(100)).unwrap();
        assert!((mean - 100.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_anchor_only_holds_whole_window() {
        let aggregator = WindowAggregator::new(Duration::seconds(60), 2);
        let mut store = store_with(&[(0, 7.5)]);
        store.evict_before(aggregator.window_start(at(500)));

        assert!(store.snapshot().is_empty());
        assert_eq!(aggregator.average(&store, at(500)), Some(7.5));
    }

    #[test]
    fn test_old_value_stops_influencing() {
        let aggregator = WindowAggregator::new(Duration::seconds(60), 2);
        let mut store = store_with(&[(0, 100.0), (10, 1.0)]);

        store.evict_before(aggregator.window_start(at(70)));
        assert_eq!(aggregator.average(&store, at(70)), Some(1.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(7.0, 3), 7.0);
    }

    #[test]
    fn test_precision_does_not_change_mean() {
        let store = store_with(&[(0, 1.0), (3, 2.0)]);
        let coarse = WindowAggregator::new(Duration::seconds(60), 0);
        let fine = WindowAggregator::new(Duration::seconds(60), 6);

        let mean = fine.mean(&store, at(7)).unwrap();
        assert_eq!(coarse.mean(&store, at(7)), Some(mean));
        assert_eq!(coarse.average(&store, at(7)), Some(round_to(mean, 0)));
        assert_eq!(fine.average(&store, at(7)), Some(round_to(mean, 6)));
    }

    #[test]
    fn test_window_start_clamps_to_earliest_instant() {
        let aggregator = WindowAggregator::new(Duration::seconds(10_000_000_000_000), 2);
        assert_eq!(aggregator.window_start(at(0)), DateTime::<Utc>::MIN_UTC);

        let store = store_with(&[(0, 4.0), (10, 8.0)]);
        assert_eq!(aggregator.average(&store, at(20)), Some(6.0));
    }
}
