//! Core types for gridstream: column schema, cell values, format limits,
//! export configuration, cancellation and the writer memory-budget interface.
//!
//! This crate performs no I/O and carries no formatting policy; downstream
//! crates (`gridstream-cells`, `gridstream-io`, `gridstream-exec`) build on it.

#![forbid(unsafe_code)]

pub mod budget;
pub mod cancel;
pub mod config;
pub mod error;
pub mod id;
pub mod limits;
pub mod prelude;
pub mod schema;
pub mod value;

pub use budget::{Admission, WriteBudget};
pub use cancel::CancellationToken;
pub use config::{BooleanStyle, ExportConfig, OverflowPolicy};
pub use error::{Error, Result};
pub use id::{RowIndex, SheetIndex};
pub use limits::{FormatLimits, OutputFormat};
pub use schema::{Column, ColumnKind, ColumnSchema};
pub use value::{ToValue, Value};
