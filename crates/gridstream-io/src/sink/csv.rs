//! Delimited text sink.
//!
//! UTF-8 without BOM. Fields containing the delimiter, the quote character or
//! a line break are quoted with embedded quotes doubled; everything else is
//! written raw. No sheets and no cell limits: rollover and chunking never
//! reach this sink.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use gridstream_core::id::{RowIndex, SheetIndex};
use gridstream_core::limits::FormatLimits;
use gridstream_core::schema::ColumnSchema;

use crate::counting::CountingWriter;
use crate::error::{Error, Result};
use crate::sink::{CellSink, RowRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub line_ending: LineEnding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            line_ending: LineEnding::Lf,
        }
    }
}

pub struct CsvSink<W: Write> {
    writer: Option<csv::Writer<CountingWriter<W>>>,
    options: CsvOptions,
    finished: bool,
}

impl CsvSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::new(f))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, CsvOptions::default())
    }

    pub fn with_options(writer: W, options: CsvOptions) -> Self {
        Self {
            writer: Some(build(CountingWriter::new(writer), options)),
            options,
            finished: false,
        }
    }

    /// Flush and hand back the output.
    pub fn into_inner(mut self) -> Result<W> {
        let writer = self.writer.take().ok_or(Error::Closed)?;
        let inner = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        Ok(inner.into_inner())
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<CountingWriter<W>>> {
        if self.finished {
            return Err(Error::Closed);
        }
        self.writer.as_mut().ok_or(Error::Closed)
    }
}

fn build<W: Write>(inner: W, options: CsvOptions) -> csv::Writer<W> {
    let terminator = match options.line_ending {
        LineEnding::Lf => csv::Terminator::Any(b'\n'),
        LineEnding::CrLf => csv::Terminator::CRLF,
    };
    csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote(options.quote)
        .quote_style(csv::QuoteStyle::Necessary)
        .double_quote(true)
        .terminator(terminator)
        .has_headers(false)
        .from_writer(inner)
}

impl<W: Write> CellSink for CsvSink<W> {
    fn limits(&self) -> FormatLimits {
        FormatLimits::unbounded()
    }

    fn begin(&mut self, _schema: &ColumnSchema) -> Result<()> {
        self.writer().map(|_| ())
    }

    fn start_sheet(&mut self, _sheet: SheetIndex) -> Result<()> {
        self.writer().map(|_| ())
    }

    fn write_row(&mut self, _row: RowIndex, _role: RowRole, cells: &[&str]) -> Result<()> {
        self.writer()?.write_record(cells)?;
        Ok(())
    }

    fn close_sheet(&mut self) -> Result<()> {
        Ok(())
    }

    fn recycle(&mut self) -> Result<()> {
        let writer = self.writer.take().ok_or(Error::Closed)?;
        let inner = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        self.writer = Some(build(inner, self.options));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer()?.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if let Some(w) = self.writer.as_mut() {
            w.flush()?;
        }
        self.finished = true;
        Ok(())
    }

    fn bytes_written(&self) -> Option<u64> {
        self.writer.as_ref().map(|w| w.get_ref().bytes_written())
    }
}
