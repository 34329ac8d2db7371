//! Abstract writer-memory budget interface.
//!
//! The concrete monitor lives in `gridstream-mem`. Only the trait is kept here
//! so the session can be generic over it without pulling the cost model.

/// Decision returned before a write element is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Commit the element as-is.
    Proceed,
    /// Flush and recreate the sink first, then commit.
    Recycle,
}

/// Running estimate of bytes buffered inside a sink but not yet flushed.
///
/// Callers follow a strict protocol per element: `check`, then (on
/// `Recycle`) recycle the sink and call `reset`, then `record`.
pub trait WriteBudget {
    /// Decide whether `bytes` may be added without crossing the threshold.
    fn check(&self, bytes: u64) -> Admission;

    /// Account for a committed element.
    fn record(&mut self, bytes: u64);

    /// The sink was flushed and recreated; the estimate starts over.
    fn reset(&mut self);

    /// Current estimate (advisory).
    fn estimated_bytes(&self) -> u64;

    /// Configured budget; 0 means unbounded.
    fn capacity_bytes(&self) -> u64;

    /// Highest estimate observed since construction.
    fn peak_bytes(&self) -> u64 {
        self.estimated_bytes()
    }
}

// NOTE: no blanket "always proceed" impl; an unbounded budget is a monitor
// constructed with capacity 0.
