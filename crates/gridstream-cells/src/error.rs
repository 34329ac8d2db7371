use gridstream_core::id::SheetIndex;
use thiserror::Error;

/// Result type local to gridstream-cells.
pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("row needs {row_span} physical rows but a sheet holds at most {capacity} data rows")]
    RowTooTall { row_span: u64, capacity: u64 },

    #[error("write after the session was closed (last sheet {last_sheet:?})")]
    SessionClosed { last_sheet: Option<SheetIndex> },

    #[error("no sheet is open")]
    NoSheet,

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}
