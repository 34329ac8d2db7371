//! Flush-and-recreate trigger for buffered sinks.
//!
//! The monitor keeps a running estimate of bytes a sink holds in memory. The
//! session asks it about every physical row before writing: if committing the
//! row would push the estimate past `ratio * budget`, the sink is flushed and
//! recreated first, at the same logical position. Decisions depend only on
//! the sequence of costs, so identical inputs recycle at identical rows.

use std::sync::Arc;

use gridstream_core::budget::{Admission, WriteBudget};

use crate::error::{Error, Result};
use crate::tracking::PeakTracker;

#[derive(Debug, Clone)]
pub struct MemoryMonitor {
    capacity: u64,
    threshold: u64,
    estimated: u64,
    tracker: Arc<PeakTracker>,
}

impl MemoryMonitor {
    /// `budget_bytes == 0` disables recycling. `ratio` must be in (0, 1].
    pub fn new(budget_bytes: u64, ratio: f64) -> Result<Self> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(Error::InvalidThreshold(ratio));
        }
        let threshold = (budget_bytes as f64 * ratio).floor() as u64;
        Ok(Self {
            capacity: budget_bytes,
            threshold,
            estimated: 0,
            tracker: Arc::new(PeakTracker::new()),
        })
    }

    pub fn unbounded() -> Self {
        Self {
            capacity: 0,
            threshold: 0,
            estimated: 0,
            tracker: Arc::new(PeakTracker::new()),
        }
    }

    /// Report into a shared tracker instead of a private one.
    pub fn with_tracker(mut self, tracker: Arc<PeakTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &Arc<PeakTracker> {
        &self.tracker
    }

    pub fn threshold_bytes(&self) -> u64 {
        self.threshold
    }
}

impl WriteBudget for MemoryMonitor {
    fn check(&self, bytes: u64) -> Admission {
        if self.capacity == 0 || self.estimated == 0 {
            // Nothing buffered yet: recycling could not free anything, so a
            // single oversized element is admitted as-is.
            return Admission::Proceed;
        }
        if self.estimated.saturating_add(bytes) > self.threshold {
            Admission::Recycle
        } else {
            Admission::Proceed
        }
    }

    fn record(&mut self, bytes: u64) {
        self.estimated = self.estimated.saturating_add(bytes);
        self.tracker.record_estimate(self.estimated);
    }

    fn reset(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            estimated_bytes = self.estimated,
            threshold = self.threshold,
            "writer recycled"
        );
        self.estimated = 0;
        self.tracker.record_recycle();
    }

    fn estimated_bytes(&self) -> u64 {
        self.estimated
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity
    }

    fn peak_bytes(&self) -> u64 {
        self.tracker.peak()
    }
}
