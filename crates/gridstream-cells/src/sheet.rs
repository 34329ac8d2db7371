//! Sheet and row bookkeeping.
//!
//! States: `NoSheet -> Open -> (closing, transient) -> Open(next) | Closed`.
//! The manager only decides where rows go; the session performs the writes
//! in the order the returned segments describe. Row 1 of every sheet is the
//! header, data starts at row 2.

use gridstream_core::config::OverflowPolicy;
use gridstream_core::id::{RowIndex, SheetIndex};

use crate::error::{LayoutError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetPhase {
    NoSheet,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetState {
    pub sheet_index: SheetIndex,
    pub next_row_index: RowIndex,
    pub bytes_written: u64,
}

impl SheetState {
    fn fresh(sheet_index: SheetIndex) -> Self {
        Self {
            sheet_index,
            next_row_index: RowIndex::FIRST_DATA,
            bytes_written: 0,
        }
    }
}

/// A run of consecutive physical rows of one logical row on one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub sheet_index: SheetIndex,
    pub first_row: RowIndex,
    /// Index of the first chunk this segment carries.
    pub chunk_offset: u64,
    pub len: u64,
    /// The previous sheet must be closed and this one started (with its
    /// header) before the segment is written.
    pub opens_sheet: bool,
}

#[derive(Debug, Clone)]
pub struct SheetManager {
    max_rows: Option<u64>,
    span_sheets: bool,
    phase: SheetPhase,
    state: SheetState,
}

impl SheetManager {
    /// `max_rows` counts the header; `None` disables rollover.
    ///
    /// A sheet needs at least two rows (header plus one data row), so
    /// `Some(0)` and `Some(1)` also disable rollover. Sessions never pass
    /// those: `ExportConfig::validate` rejects 1 and maps 0 to `None`.
    pub fn new(max_rows: Option<u32>, policy: OverflowPolicy) -> Self {
        Self {
            max_rows: max_rows.filter(|&r| r >= 2).map(u64::from),
            span_sheets: policy == OverflowPolicy::ChunkAcrossSheets,
            phase: SheetPhase::NoSheet,
            state: SheetState::fresh(SheetIndex::FIRST),
        }
    }

    pub fn phase(&self) -> SheetPhase {
        self.phase
    }

    pub fn state(&self) -> &SheetState {
        &self.state
    }

    pub fn current_sheet(&self) -> Option<SheetIndex> {
        match self.phase {
            SheetPhase::NoSheet => None,
            _ => Some(self.state.sheet_index),
        }
    }

    /// Data rows a sheet can hold.
    pub fn capacity(&self) -> Option<u64> {
        self.max_rows.map(|m| m - 1)
    }

    /// Open sheet 1. The caller writes the header next.
    pub fn start(&mut self) -> Result<SheetIndex> {
        match self.phase {
            SheetPhase::NoSheet => {
                self.phase = SheetPhase::Open;
                self.state = SheetState::fresh(SheetIndex::FIRST);
                Ok(SheetIndex::FIRST)
            }
            SheetPhase::Open => Err(LayoutError::Invariant("sheet already started".into())),
            SheetPhase::Closed => Err(self.closed()),
        }
    }

    /// Reserve rows for a logical row spanning `row_span` physical rows.
    pub fn place(&mut self, row_span: u64) -> Result<Vec<Segment>> {
        match self.phase {
            SheetPhase::Open => {}
            SheetPhase::NoSheet => return Err(LayoutError::NoSheet),
            SheetPhase::Closed => return Err(self.closed()),
        }
        let row_span = row_span.max(1);

        let Some(max) = self.max_rows else {
            let seg = self.segment(0, row_span, false);
            self.advance(row_span);
            return Ok(vec![seg]);
        };

        if !self.span_sheets {
            let capacity = max - 1;
            if row_span > capacity {
                return Err(LayoutError::RowTooTall { row_span, capacity });
            }
            let mut opens = false;
            if self.last_row_for(row_span) > max {
                self.roll_over();
                opens = true;
            }
            let seg = self.segment(0, row_span, opens);
            self.advance(row_span);
            return Ok(vec![seg]);
        }

        let mut segments = Vec::new();
        let mut offset = 0;
        let mut remaining = row_span;
        while remaining > 0 {
            let mut opens = false;
            if self.state.next_row_index.get() > max {
                self.roll_over();
                opens = true;
            }
            let room = max - self.state.next_row_index.get() + 1;
            let len = room.min(remaining);
            segments.push(self.segment(offset, len, opens));
            self.advance(len);
            offset += len;
            remaining -= len;
        }
        Ok(segments)
    }

    /// Account for text written to the current sheet.
    pub fn add_bytes(&mut self, bytes: u64) {
        self.state.bytes_written = self.state.bytes_written.saturating_add(bytes);
    }

    /// Close the last sheet. Returns the sheet that was open, if any.
    pub fn finish(&mut self) -> Result<Option<SheetIndex>> {
        match self.phase {
            SheetPhase::Open => {
                self.phase = SheetPhase::Closed;
                Ok(Some(self.state.sheet_index))
            }
            SheetPhase::NoSheet => {
                self.phase = SheetPhase::Closed;
                Ok(None)
            }
            SheetPhase::Closed => Err(self.closed()),
        }
    }

    fn last_row_for(&self, row_span: u64) -> u64 {
        self.state.next_row_index.get() + row_span - 1
    }

    fn roll_over(&mut self) {
        self.state = SheetState::fresh(self.state.sheet_index.next());
    }

    fn segment(&self, chunk_offset: u64, len: u64, opens_sheet: bool) -> Segment {
        Segment {
            sheet_index: self.state.sheet_index,
            first_row: self.state.next_row_index,
            chunk_offset,
            len,
            opens_sheet,
        }
    }

    fn advance(&mut self, rows: u64) {
        self.state.next_row_index = self.state.next_row_index.offset(rows);
    }

    fn closed(&self) -> LayoutError {
        LayoutError::SessionClosed {
            last_sheet: Some(self.state.sheet_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(n: u32) -> SheetIndex {
        SheetIndex::new(n)
    }

    fn row(n: u64) -> RowIndex {
        RowIndex::new(n)
    }

    #[test]
    fn starts_at_first_data_row() {
        let mut m = SheetManager::new(Some(10), OverflowPolicy::Chunk);
        assert_eq!(m.phase(), SheetPhase::NoSheet);
        assert_eq!(m.start().unwrap(), sheet(1));
        let seg = m.place(1).unwrap();
        assert_eq!(seg[0].first_row, row(2));
        assert!(!seg[0].opens_sheet);
        assert_eq!(m.state().next_row_index, row(3));
    }

    #[test]
    fn fewer_than_two_rows_per_sheet_disables_rollover() {
        for max_rows in [Some(0), Some(1)] {
            let mut m = SheetManager::new(max_rows, OverflowPolicy::Chunk);
            assert_eq!(m.capacity(), None);
            m.start().unwrap();
            for _ in 0..5 {
                assert!(!m.place(3).unwrap()[0].opens_sheet);
            }
            assert_eq!(m.current_sheet(), Some(sheet(1)));
        }
    }

    #[test]
    fn rolls_over_before_a_row_that_does_not_fit() {
        // 4 rows per sheet: header + 3 data rows.
        let mut m = SheetManager::new(Some(4), OverflowPolicy::Chunk);
        m.start().unwrap();
        m.place(1).unwrap();
        m.place(1).unwrap();
        // rows 2,3 used; a 2-row span needs rows 4..5 > 4.
        let seg = m.place(2).unwrap();
        assert_eq!(seg.len(), 1);
        assert_eq!(seg[0].sheet_index, sheet(2));
        assert_eq!(seg[0].first_row, row(2));
        assert!(seg[0].opens_sheet);
    }

    #[test]
    fn exact_fill_then_roll() {
        let mut m = SheetManager::new(Some(3), OverflowPolicy::Chunk);
        m.start().unwrap();
        assert_eq!(m.place(2).unwrap()[0].first_row, row(2));
        let seg = m.place(1).unwrap();
        assert_eq!((seg[0].sheet_index, seg[0].first_row), (sheet(2), row(2)));
    }

    #[test]
    fn too_tall_row_is_rejected_under_chunk() {
        let mut m = SheetManager::new(Some(4), OverflowPolicy::Chunk);
        m.start().unwrap();
        assert_eq!(
            m.place(4),
            Err(LayoutError::RowTooTall {
                row_span: 4,
                capacity: 3
            })
        );
    }

    #[test]
    fn chunk_across_sheets_fills_then_continues() {
        let mut m = SheetManager::new(Some(4), OverflowPolicy::ChunkAcrossSheets);
        m.start().unwrap();
        m.place(1).unwrap(); // row 2
        let segs = m.place(5).unwrap();
        assert_eq!(
            segs,
            vec![
                Segment {
                    sheet_index: sheet(1),
                    first_row: row(3),
                    chunk_offset: 0,
                    len: 2,
                    opens_sheet: false
                },
                Segment {
                    sheet_index: sheet(2),
                    first_row: row(2),
                    chunk_offset: 2,
                    len: 3,
                    opens_sheet: true
                },
            ]
        );
        // Sheet 2 is now full; the next row opens sheet 3.
        let segs = m.place(1).unwrap();
        assert_eq!(segs[0].sheet_index, sheet(3));
        assert!(segs[0].opens_sheet);
    }

    #[test]
    fn unlimited_never_rolls() {
        let mut m = SheetManager::new(None, OverflowPolicy::Chunk);
        m.start().unwrap();
        for _ in 0..10_000 {
            let seg = m.place(3).unwrap();
            assert_eq!(seg[0].sheet_index, sheet(1));
        }
        assert_eq!(m.state().next_row_index, row(30_002));
    }

    #[test]
    fn writes_after_finish_fail_fast() {
        let mut m = SheetManager::new(Some(10), OverflowPolicy::Chunk);
        assert_eq!(m.place(1), Err(LayoutError::NoSheet));
        m.start().unwrap();
        assert_eq!(m.finish().unwrap(), Some(sheet(1)));
        assert!(matches!(
            m.place(1),
            Err(LayoutError::SessionClosed { .. })
        ));
        assert!(m.finish().is_err());
        assert!(m.start().is_err());
    }
}
