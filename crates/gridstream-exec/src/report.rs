//! Session outcome and counters.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use gridstream_core::id::SheetIndex;

/// Where a session was when it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub logical_rows: u64,
    pub physical_rows: u64,
    pub sheet: Option<SheetIndex>,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows ({} physical)",
            self.logical_rows, self.physical_rows
        )?;
        match self.sheet {
            Some(sheet) => write!(f, " on sheet {}", sheet.get()),
            None => f.write_str(" before the first sheet"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Rows pulled from the source and fully written.
    pub logical_rows: u64,
    /// Data rows written, continuation rows included; headers excluded.
    pub physical_rows: u64,
    pub header_rows: u64,
    pub sheets: u32,
    pub recycles: u64,
    pub periodic_flushes: u64,
    pub truncated_cells: u64,
    pub split_cells: u64,
    pub peak_estimated_bytes: u64,
    pub bytes_written: Option<u64>,
    /// Formatted text bytes over all logical rows, before chunking.
    pub total_payload_bytes: u64,
    pub max_row_payload_bytes: u64,
    pub mean_row_payload_bytes: u64,
    /// Wall time from the first sink call to finalization.
    pub elapsed: Duration,
}

impl ExportReport {
    /// Fold one logical row's formatted size into the payload statistics.
    pub(crate) fn record_row_payload(&mut self, bytes: u64) {
        self.total_payload_bytes += bytes;
        self.max_row_payload_bytes = self.max_row_payload_bytes.max(bytes);
        let rows = self.logical_rows + 1;
        self.mean_row_payload_bytes = self.total_payload_bytes / rows;
    }

    pub fn progress(&self) -> Progress {
        Progress {
            logical_rows: self.logical_rows,
            physical_rows: self.physical_rows,
            sheet: (self.sheets > 0).then(|| SheetIndex::new(self.sheets)),
        }
    }
}

/// How a session ended. Cancellation is an outcome, not an error: the
/// output is finalized and valid, just incomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed(ExportReport),
    Cancelled(ExportReport),
}

impl ExportOutcome {
    pub fn report(&self) -> &ExportReport {
        match self {
            ExportOutcome::Completed(r) | ExportOutcome::Cancelled(r) => r,
        }
    }

    pub fn into_report(self) -> ExportReport {
        match self {
            ExportOutcome::Completed(r) | ExportOutcome::Cancelled(r) => r,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportOutcome::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_statistics_track_max_mean_and_total() {
        let mut report = ExportReport::default();
        for bytes in [10, 40, 7] {
            report.record_row_payload(bytes);
            report.logical_rows += 1;
        }
        assert_eq!(report.total_payload_bytes, 57);
        assert_eq!(report.max_row_payload_bytes, 40);
        assert_eq!(report.mean_row_payload_bytes, 19);
    }

    #[test]
    fn progress_display() {
        let report = ExportReport {
            logical_rows: 5,
            physical_rows: 7,
            sheets: 3,
            ..Default::default()
        };
        assert_eq!(report.progress().to_string(), "5 rows (7 physical) on sheet 3");
        assert_eq!(
            Progress::default().to_string(),
            "0 rows (0 physical) before the first sheet"
        );
    }
}
