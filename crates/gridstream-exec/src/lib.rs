#![forbid(unsafe_code)]
//! gridstream-exec: the export session.
//!
//! An [`ExportSession`] pulls rows one at a time from a source, formats and
//! chunks them, places them on sheets, asks the memory monitor before each
//! physical row, and hands the rows to a sink. Nothing beyond the current
//! logical row is held in memory by the session itself.

pub mod error;
pub mod metrics;
pub mod report;
pub mod session;

#[cfg(feature = "async")]
pub mod stream;

pub use error::ExecError;
pub use report::{ExportOutcome, ExportReport, Progress};
pub use session::ExportSession;
