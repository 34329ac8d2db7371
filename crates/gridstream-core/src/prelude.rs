//! Convenient re-exports for downstream crates.

pub use crate::budget::{Admission, WriteBudget};
pub use crate::cancel::CancellationToken;
pub use crate::config::{BooleanStyle, ExportConfig, OverflowPolicy};
pub use crate::error::{Error, Result};
pub use crate::id::{RowIndex, SheetIndex};
pub use crate::limits::{FormatLimits, OutputFormat};
pub use crate::schema::{Column, ColumnKind, ColumnSchema};
pub use crate::value::{ToValue, Value};
