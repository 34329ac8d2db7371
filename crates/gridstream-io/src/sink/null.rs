//! Sink that discards rows and counts what it was given.
//!
//! Drives a full export pass (layout, rollover, budgeting) without producing
//! a file, e.g. to size an export or warm up before the real run. The byte
//! count is cell text only; format overhead is not modeled.

use gridstream_core::id::{RowIndex, SheetIndex};
use gridstream_core::limits::FormatLimits;
use gridstream_core::schema::ColumnSchema;

use crate::error::{Error, Result};
use crate::sink::{CellSink, RowRole};

#[derive(Debug, Clone)]
pub struct NullSink {
    limits: FormatLimits,
    sheets: u32,
    rows: u64,
    text_bytes: u64,
    finished: bool,
}

impl NullSink {
    /// Discards rows while reporting `limits`, so layout matches the format
    /// the dry run stands in for.
    pub fn new(limits: FormatLimits) -> Self {
        Self {
            limits,
            sheets: 0,
            rows: 0,
            text_bytes: 0,
            finished: false,
        }
    }

    pub fn sheets(&self) -> u32 {
        self.sheets
    }

    /// Physical rows seen, headers included.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }
}

impl CellSink for NullSink {
    fn limits(&self) -> FormatLimits {
        self.limits
    }

    fn begin(&mut self, _schema: &ColumnSchema) -> Result<()> {
        self.ensure_open()
    }

    fn start_sheet(&mut self, _sheet: SheetIndex) -> Result<()> {
        self.ensure_open()?;
        self.sheets += 1;
        Ok(())
    }

    fn write_row(&mut self, _row: RowIndex, _role: RowRole, cells: &[&str]) -> Result<()> {
        self.ensure_open()?;
        self.rows += 1;
        self.text_bytes += cells.iter().map(|c| c.len() as u64).sum::<u64>();
        Ok(())
    }

    fn close_sheet(&mut self) -> Result<()> {
        self.ensure_open()
    }

    fn recycle(&mut self) -> Result<()> {
        self.ensure_open()
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn bytes_written(&self) -> Option<u64> {
        Some(self.text_bytes)
    }
}
