//! In-memory sink that records every instruction.
//!
//! Used for tests and dry runs. It enforces the sink protocol strictly, and
//! can be told to fail after N rows to exercise error paths.

use std::io;

use gridstream_core::id::{RowIndex, SheetIndex};
use gridstream_core::limits::FormatLimits;
use gridstream_core::schema::ColumnSchema;

use crate::error::{Error, Result};
use crate::sink::{CellSink, RowRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRow {
    pub sheet: SheetIndex,
    pub row: RowIndex,
    pub role: RowRole,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Begin { columns: usize },
    StartSheet(SheetIndex),
    Row(RecordedRow),
    CloseSheet(SheetIndex),
    Recycle,
    Flush,
    Finish,
}

#[derive(Debug, Clone)]
pub struct RecordingSink {
    limits: FormatLimits,
    events: Vec<SinkEvent>,
    current: Option<SheetIndex>,
    finished: bool,
    rows: u64,
    fail_after_rows: Option<u64>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    /// Records with XLSX ceilings so configured limits take effect.
    pub fn new() -> Self {
        Self::with_limits(FormatLimits::xlsx())
    }

    pub fn with_limits(limits: FormatLimits) -> Self {
        Self {
            limits,
            events: Vec::new(),
            current: None,
            finished: false,
            rows: 0,
            fail_after_rows: None,
        }
    }

    /// Fail the write of row number `n + 1` (header rows included).
    pub fn fail_after_rows(mut self, n: u64) -> Self {
        self.fail_after_rows = Some(n);
        self
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    pub fn rows(&self) -> impl Iterator<Item = &RecordedRow> + '_ {
        self.events.iter().filter_map(|e| match e {
            SinkEvent::Row(r) => Some(r),
            _ => None,
        })
    }

    /// Rows of one sheet, header included.
    pub fn sheet_rows(&self, sheet: SheetIndex) -> Vec<&RecordedRow> {
        self.rows().filter(|r| r.sheet == sheet).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::StartSheet(_)))
            .count()
    }

    pub fn recycles(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Recycle))
            .count()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }
}

impl CellSink for RecordingSink {
    fn limits(&self) -> FormatLimits {
        self.limits
    }

    fn begin(&mut self, schema: &ColumnSchema) -> Result<()> {
        self.ensure_open()?;
        self.events.push(SinkEvent::Begin {
            columns: schema.len(),
        });
        Ok(())
    }

    fn start_sheet(&mut self, sheet: SheetIndex) -> Result<()> {
        self.ensure_open()?;
        if let Some(open) = self.current {
            return Err(Error::Contract(format!(
                "{sheet} started while {open} is open"
            )));
        }
        self.current = Some(sheet);
        self.events.push(SinkEvent::StartSheet(sheet));
        Ok(())
    }

    fn write_row(&mut self, row: RowIndex, role: RowRole, cells: &[&str]) -> Result<()> {
        self.ensure_open()?;
        let sheet = self
            .current
            .ok_or_else(|| Error::Contract("write_row without an open sheet".into()))?;
        if self.fail_after_rows.is_some_and(|n| self.rows >= n) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        self.rows += 1;
        self.events.push(SinkEvent::Row(RecordedRow {
            sheet,
            row,
            role,
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }));
        Ok(())
    }

    fn close_sheet(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Some(sheet) = self.current.take() {
            self.events.push(SinkEvent::CloseSheet(sheet));
        }
        Ok(())
    }

    fn recycle(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.events.push(SinkEvent::Recycle);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.events.push(SinkEvent::Flush);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if let Some(sheet) = self.current.take() {
            self.events.push(SinkEvent::CloseSheet(sheet));
        }
        self.events.push(SinkEvent::Finish);
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_is_enforced() {
        let mut sink = RecordingSink::new();
        assert!(matches!(
            sink.write_row(RowIndex::HEADER, RowRole::Header, &["a"]),
            Err(Error::Contract(_))
        ));
        sink.start_sheet(SheetIndex::FIRST).unwrap();
        assert!(sink.start_sheet(SheetIndex::new(2)).is_err());
        sink.finish().unwrap();
        assert!(matches!(sink.flush(), Err(Error::Closed)));
        assert_eq!(
            sink.events(),
            &[
                SinkEvent::StartSheet(SheetIndex::FIRST),
                SinkEvent::CloseSheet(SheetIndex::FIRST),
                SinkEvent::Finish
            ]
        );
    }

    #[test]
    fn injected_failure() {
        let mut sink = RecordingSink::new().fail_after_rows(1);
        sink.start_sheet(SheetIndex::FIRST).unwrap();
        sink.write_row(RowIndex::HEADER, RowRole::Header, &["a"])
            .unwrap();
        assert!(matches!(
            sink.write_row(RowIndex::FIRST_DATA, RowRole::Data, &["x"]),
            Err(Error::Io(_))
        ));
        assert_eq!(sink.rows().count(), 1);
    }
}
