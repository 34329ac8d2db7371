//! Lightweight peak and recycle tracking.
//!
//! Shareable across sessions (`Arc<PeakTracker>`) so a caller running several
//! exports can read an aggregate high-water mark.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PeakTracker {
    peak_bytes: AtomicU64,
    recycles: AtomicU64,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new estimate; updates peak if higher.
    pub fn record_estimate(&self, bytes: u64) {
        let mut cur = self.peak_bytes.load(Ordering::Relaxed);
        while bytes > cur {
            match self.peak_bytes.compare_exchange(
                cur,
                bytes,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            estimated_bytes = bytes,
            peak = self.peak_bytes.load(Ordering::Relaxed),
            "writer estimate"
        );
    }

    pub fn record_recycle(&self) {
        self.recycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn peak(&self) -> u64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    pub fn recycles(&self) -> u64 {
        self.recycles.load(Ordering::Relaxed)
    }
}
