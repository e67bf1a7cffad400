//! Time-bounded sample buffer.
//!
//! Samples are kept in ascending timestamp order. Eviction prunes everything
//! before a cutoff but remembers the latest pruned sample as the carry-in
//! anchor, which gives the value in effect at the window's leading edge.

use crate::core::types::{FilterError, Sample};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Ordered buffer of samples plus one carry-in anchor.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    /// Samples at or after the last eviction cutoff
    samples: VecDeque<Sample>,
    /// Latest sample strictly before the last eviction cutoff
    anchor: Option<Sample>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new sample.
    ///
    /// A sample at the same timestamp as the newest one replaces it.
    pub fn record(&mut self, timestamp: DateTime<Utc>, value: f64) -> Result<(), FilterError> {
        match self.latest() {
            Some(last) if timestamp < last.timestamp => Err(FilterError::OutOfOrder {
                last: last.timestamp,
                received: timestamp,
            }),
            Some(last) if timestamp == last.timestamp => {
                if let Some(newest) = self.samples.back_mut().or(self.anchor.as_mut()) {
                    newest.value = value;
                }
                Ok(())
            }
            _ => {
                self.samples.push_back(Sample::new(timestamp, value));
                Ok(())
            }
        }
    }

    /// Remove all samples before `cutoff`, keeping the newest of them as anchor.
    ///
    /// Returns the number of samples dropped from memory.
    pub fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut dropped = 0;
        while let Some(front) = self.samples.front() {
            if front.timestamp >= cutoff {
                break;
            }
            if let Some(sample) = self.samples.pop_front() {
                if self.anchor.replace(sample).is_some() {
                    dropped += 1;
                }
            }
        }
        dropped
    }

    /// Current in-window samples, oldest first.
    pub fn snapshot(&self) -> &VecDeque<Sample> {
        &self.samples
    }

    /// The carry-in anchor, if any.
    pub fn anchor(&self) -> Option<Sample> {
        self.anchor
    }

    /// Most recent sample known to the store.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied().or(self.anchor)
    }

    /// Drop everything, including the anchor.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.anchor = None;
    }

    /// Number of retained data points, anchor included.
    pub fn len(&self) -> usize {
        self.samples.len() + usize::from(self.anchor.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.anchor.is_none()
    }
}
