//! XLSX sink on `rust_xlsxwriter` constant-memory worksheets.
//!
//! Rows must arrive in ascending order per sheet; each completed row is
//! streamed to the worksheet's temporary file, so the in-process footprint
//! stays at roughly one row. The zip package is assembled on `finish`.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use gridstream_core::id::{RowIndex, SheetIndex};
use gridstream_core::limits::FormatLimits;
use gridstream_core::schema::{ColumnKind, ColumnSchema};

use crate::counting::CountingWriter;
use crate::error::{Error, Result};
use crate::naming::sheet_name_for;
use crate::sink::{CellSink, RowRole};

pub struct XlsxSink<W: Write + Seek + Send> {
    workbook: Workbook,
    output: Option<CountingWriter<W>>,
    base_name: String,
    kinds: Vec<ColumnKind>,
    header_format: Format,
    current: Option<usize>,
    sheets_added: usize,
    finished: bool,
}

impl XlsxSink<File> {
    pub fn create(path: impl AsRef<Path>, base_name: &str) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::new(f, base_name))
    }
}

impl<W: Write + Seek + Send> XlsxSink<W> {
    pub fn new(output: W, base_name: &str) -> Self {
        Self {
            workbook: Workbook::new(),
            output: Some(CountingWriter::new(output)),
            base_name: base_name.to_string(),
            kinds: Vec::new(),
            header_format: Format::new().set_bold(),
            current: None,
            sheets_added: 0,
            finished: false,
        }
    }

    /// Hand back the output once the workbook has been saved.
    pub fn into_inner(mut self) -> Result<W> {
        if !self.finished {
            return Err(Error::Contract("workbook not finished".into()));
        }
        self.output
            .take()
            .map(CountingWriter::into_inner)
            .ok_or(Error::Closed)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }
}

fn cast_row_num(row: RowIndex) -> Result<u32> {
    u32::try_from(row.zero_based())
        .map_err(|_| Error::Xlsx(format!("row index overflow: {}", row.get())))
}

fn cast_col_num(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| Error::Xlsx(format!("column index overflow: {col}")))
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl<W: Write + Seek + Send> CellSink for XlsxSink<W> {
    fn limits(&self) -> FormatLimits {
        FormatLimits::xlsx()
    }

    fn begin(&mut self, schema: &ColumnSchema) -> Result<()> {
        self.ensure_open()?;
        self.kinds = schema.kinds().collect();
        Ok(())
    }

    fn start_sheet(&mut self, sheet: SheetIndex) -> Result<()> {
        self.ensure_open()?;
        if self.current.is_some() {
            return Err(Error::Contract("previous sheet still open".into()));
        }
        let name = sheet_name_for(&self.base_name, sheet);
        let worksheet = self.workbook.add_worksheet_with_constant_memory();
        worksheet.set_name(&name)?;
        worksheet.set_freeze_panes(1, 0)?;
        self.current = Some(self.sheets_added);
        self.sheets_added += 1;
        Ok(())
    }

    fn write_row(&mut self, row: RowIndex, role: RowRole, cells: &[&str]) -> Result<()> {
        self.ensure_open()?;
        let idx = self
            .current
            .ok_or_else(|| Error::Contract("write_row without an open sheet".into()))?;
        let row_num = cast_row_num(row)?;
        let worksheet = self.workbook.worksheet_from_index(idx)?;

        for (i, text) in cells.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let col = cast_col_num(i)?;
            if role.is_header() {
                worksheet.write_string_with_format(row_num, col, *text, &self.header_format)?;
                continue;
            }
            if role.is_whole() {
                match self.kinds.get(i) {
                    Some(ColumnKind::Number) => {
                        if let Some(n) = parse_number(text) {
                            worksheet.write_number(row_num, col, n)?;
                            continue;
                        }
                    }
                    Some(ColumnKind::Boolean) => {
                        if let Some(b) = parse_bool(text) {
                            worksheet.write_boolean(row_num, col, b)?;
                            continue;
                        }
                    }
                    _ => {}
                }
            }
            worksheet.write_string(row_num, col, *text)?;
        }
        Ok(())
    }

    fn close_sheet(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }

    fn recycle(&mut self) -> Result<()> {
        // Completed rows already live in the worksheet temp files.
        self.ensure_open()
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.current = None;
        let output = self.output.as_mut().ok_or(Error::Closed)?;
        self.workbook.save_to_writer(&mut *output)?;
        output.flush()?;
        self.finished = true;
        Ok(())
    }

    fn bytes_written(&self) -> Option<u64> {
        self.output.as_ref().map(CountingWriter::bytes_written)
    }
}
