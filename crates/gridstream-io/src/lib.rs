#![forbid(unsafe_code)]
//! gridstream-io: the edges of the pipeline.
//!
//! - `sink`: the [`CellSink`] capability trait and its backends (CSV, XLSX,
//!   SpreadsheetML 2003, in-memory recording, counting null sink).
//! - `source`: the [`RowSource`] trait and adapters (iterators, JSON lines,
//!   row limits, peeking).
//! - `counting`: a byte-counting writer wrapper.

pub mod counting;
pub mod error;
pub mod naming;
pub mod sink;
pub mod source;

pub use counting::CountingWriter;
pub use error::{Error, Result};
pub use sink::{CellSink, RowRole};
pub use source::RowSource;
