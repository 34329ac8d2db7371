#![forbid(unsafe_code)]
//! gridstream-mem: writer memory budgeting.
//!
//! Concrete implementation of `gridstream-core::budget::WriteBudget`. The
//! monitor never allocates or frees anything itself; it keeps a deterministic
//! estimate of what a sink has buffered and tells the session when to flush
//! and recreate the writer.

pub mod cost;
pub mod error;
pub mod monitor;
pub mod tracking;

pub use cost::CostModel;
pub use error::{Error, Result};
pub use monitor::MemoryMonitor;
pub use tracking::PeakTracker;
