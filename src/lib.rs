//! gridstream: stream rows into CSV, XLSX or SpreadsheetML 2003 while
//! respecting per-cell text limits, per-sheet row limits and a writer
//! memory budget.
//!
//! This crate re-exports the workspace crates:
//! - [`gridstream_core`]: schema, values, configuration, format limits
//! - [`gridstream_mem`]: writer memory estimation and recycling thresholds
//! - [`gridstream_cells`]: accessors, formatting, chunking and sheet layout
//! - [`gridstream_io`]: row sources and the CSV / XLSX / XML sinks
//! - [`gridstream_exec`]: the export session that ties them together
//!
//! ```ignore
//! use gridstream::prelude::*;
//!
//! let schema = ColumnSchema::new(vec![Column::new("id", ColumnKind::Number)])?;
//! let sink = CsvSink::create("out.csv")?;
//! let outcome = ExportSession::new(ExportConfig::default(), schema, sink)?
//!     .run(IterSource::new(rows.into_iter()), &CancellationToken::new())?;
//! ```

#![forbid(unsafe_code)]

pub use gridstream_cells;
pub use gridstream_core;
pub use gridstream_exec;
pub use gridstream_io;
pub use gridstream_mem;

pub use gridstream_cells::row_shape;

pub mod prelude {
    pub use gridstream_cells::{AccessorRegistry, RowShape};
    pub use gridstream_core::prelude::*;
    pub use gridstream_exec::{ExecError, ExportOutcome, ExportReport, ExportSession, Progress};
    pub use gridstream_io::sink::{CellSink, CsvSink, XlsxSink, XmlSink};
    pub use gridstream_io::source::{IterSource, JsonlSource, RowSource, TryIterSource};
    pub use gridstream_mem::MemoryMonitor;
}
