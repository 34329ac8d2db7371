//! Cell sinks.
//!
//! A sink receives fully laid-out physical rows in order: `begin` once, then
//! per sheet `start_sheet`, the header row, data rows, `close_sheet`, and
//! finally `finish`. `recycle` may be called between rows to release buffered
//! state; it must not change what the finished output looks like.

use gridstream_core::id::{RowIndex, SheetIndex};
use gridstream_core::limits::FormatLimits;
use gridstream_core::schema::ColumnSchema;

use crate::error::Result;

pub mod csv;
pub mod null;
pub mod recording;
pub mod xlsx;
pub mod xml;

pub use self::csv::{CsvOptions, CsvSink, LineEnding};
pub use self::null::NullSink;
pub use self::recording::{RecordedRow, RecordingSink, SinkEvent};
pub use self::xlsx::XlsxSink;
pub use self::xml::XmlSink;

/// What a physical row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    Header,
    /// A whole logical row on one physical row. Cells are complete values.
    Data,
    /// Part `offset` of a logical row spanning `span` physical rows. Cells
    /// may be partial text.
    Chunk { offset: u64, span: u64 },
}

impl RowRole {
    pub fn is_header(self) -> bool {
        matches!(self, RowRole::Header)
    }

    /// Cells hold complete values and may be written with native types.
    pub fn is_whole(self) -> bool {
        matches!(self, RowRole::Data)
    }
}

pub trait CellSink {
    /// Ceilings of the target format.
    fn limits(&self) -> FormatLimits;

    fn begin(&mut self, schema: &ColumnSchema) -> Result<()>;

    fn start_sheet(&mut self, sheet: SheetIndex) -> Result<()>;

    fn write_row(&mut self, row: RowIndex, role: RowRole, cells: &[&str]) -> Result<()>;

    fn close_sheet(&mut self) -> Result<()>;

    /// Flush and recreate the underlying writer at the same position.
    fn recycle(&mut self) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Finalize the document. Idempotent.
    fn finish(&mut self) -> Result<()>;

    /// Bytes emitted so far, when the sink can tell.
    fn bytes_written(&self) -> Option<u64> {
        None
    }
}

impl<S: CellSink + ?Sized> CellSink for &mut S {
    fn limits(&self) -> FormatLimits {
        (**self).limits()
    }
    fn begin(&mut self, schema: &ColumnSchema) -> Result<()> {
        (**self).begin(schema)
    }
    fn start_sheet(&mut self, sheet: SheetIndex) -> Result<()> {
        (**self).start_sheet(sheet)
    }
    fn write_row(&mut self, row: RowIndex, role: RowRole, cells: &[&str]) -> Result<()> {
        (**self).write_row(row, role, cells)
    }
    fn close_sheet(&mut self) -> Result<()> {
        (**self).close_sheet()
    }
    fn recycle(&mut self) -> Result<()> {
        (**self).recycle()
    }
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
    fn bytes_written(&self) -> Option<u64> {
        (**self).bytes_written()
    }
}

impl<S: CellSink + ?Sized> CellSink for Box<S> {
    fn limits(&self) -> FormatLimits {
        (**self).limits()
    }
    fn begin(&mut self, schema: &ColumnSchema) -> Result<()> {
        (**self).begin(schema)
    }
    fn start_sheet(&mut self, sheet: SheetIndex) -> Result<()> {
        (**self).start_sheet(sheet)
    }
    fn write_row(&mut self, row: RowIndex, role: RowRole, cells: &[&str]) -> Result<()> {
        (**self).write_row(row, role, cells)
    }
    fn close_sheet(&mut self) -> Result<()> {
        (**self).close_sheet()
    }
    fn recycle(&mut self) -> Result<()> {
        (**self).recycle()
    }
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
    fn bytes_written(&self) -> Option<u64> {
        (**self).bytes_written()
    }
}
