//! SpreadsheetML 2003 sink.
//!
//! Streams a single XML document (`<Workbook>` with one `<Worksheet>` per
//! sheet) through a buffered writer. Nothing is zipped, so the output may be
//! any sequential stream. On recycle the buffer is flushed and a fresh buffer
//! is built over the same stream.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use gridstream_core::id::{RowIndex, SheetIndex};
use gridstream_core::limits::FormatLimits;
use gridstream_core::schema::{ColumnKind, ColumnSchema};

use crate::counting::CountingWriter;
use crate::error::{Error, Result};
use crate::naming::sheet_name_for;
use crate::sink::{CellSink, RowRole};

const SS_NAMESPACE: &str = "urn:schemas-microsoft-com:office:spreadsheet";
const PROLOGUE: &[u8] =
    b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<?mso-application progid=\"Excel.Sheet\"?>\n";
const HEADER_STYLE: &str = "header";
const DEFAULT_BUFFER: usize = 64 * 1024;

type Inner<W> = Writer<BufWriter<CountingWriter<W>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Workbook,
    Sheet,
    Finished,
}

pub struct XmlSink<W: Write> {
    writer: Option<Inner<W>>,
    buffer_capacity: usize,
    base_name: String,
    kinds: Vec<ColumnKind>,
    phase: Phase,
}

impl XmlSink<File> {
    pub fn create(path: impl AsRef<Path>, base_name: &str) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::new(f, base_name))
    }
}

impl<W: Write> XmlSink<W> {
    pub fn new(output: W, base_name: &str) -> Self {
        Self::with_buffer_capacity(output, base_name, DEFAULT_BUFFER)
    }

    pub fn with_buffer_capacity(output: W, base_name: &str, capacity: usize) -> Self {
        Self {
            writer: Some(Writer::new(BufWriter::with_capacity(
                capacity,
                CountingWriter::new(output),
            ))),
            buffer_capacity: capacity,
            base_name: base_name.to_string(),
            kinds: Vec::new(),
            phase: Phase::Fresh,
        }
    }

    /// Hand back the output once the document is finished.
    pub fn into_inner(mut self) -> Result<W> {
        if self.phase != Phase::Finished {
            return Err(Error::Contract("document not finished".into()));
        }
        let writer = self.writer.take().ok_or(Error::Closed)?;
        let counting = writer
            .into_inner()
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        Ok(counting.into_inner())
    }

    fn writer(&mut self) -> Result<&mut Inner<W>> {
        if self.phase == Phase::Finished {
            return Err(Error::Closed);
        }
        self.writer.as_mut().ok_or(Error::Closed)
    }

    fn open_workbook(&mut self) -> Result<()> {
        let w = self.writer()?;
        w.get_mut().write_all(PROLOGUE)?;
        write_workbook_start(w)?;
        self.phase = Phase::Workbook;
        Ok(())
    }

    fn end_sheet(&mut self) -> Result<()> {
        let w = self.writer()?;
        w.write_event(Event::End(BytesEnd::new("Table")))?;
        w.write_event(Event::End(BytesEnd::new("Worksheet")))?;
        self.phase = Phase::Workbook;
        Ok(())
    }
}

fn write_workbook_start<W: Write>(w: &mut Writer<W>) -> std::result::Result<(), quick_xml::Error> {
    let mut workbook = BytesStart::new("Workbook");
    workbook.push_attribute(("xmlns", SS_NAMESPACE));
    workbook.push_attribute(("xmlns:ss", SS_NAMESPACE));
    w.write_event(Event::Start(workbook))?;

    w.write_event(Event::Start(BytesStart::new("Styles")))?;
    let mut style = BytesStart::new("Style");
    style.push_attribute(("ss:ID", HEADER_STYLE));
    w.write_event(Event::Start(style))?;
    let mut font = BytesStart::new("Font");
    font.push_attribute(("ss:Bold", "1"));
    w.write_event(Event::Empty(font))?;
    w.write_event(Event::End(BytesEnd::new("Style")))?;
    w.write_event(Event::End(BytesEnd::new("Styles")))?;
    Ok(())
}

fn write_sheet_start<W: Write>(
    w: &mut Writer<W>,
    name: &str,
) -> std::result::Result<(), quick_xml::Error> {
    let mut sheet = BytesStart::new("Worksheet");
    sheet.push_attribute(("ss:Name", name));
    w.write_event(Event::Start(sheet))?;
    w.write_event(Event::Start(BytesStart::new("Table")))?;
    Ok(())
}

fn write_cell<W: Write>(
    w: &mut Writer<W>,
    data_type: &str,
    text: &str,
    style: Option<&str>,
) -> std::result::Result<(), quick_xml::Error> {
    let mut cell = BytesStart::new("Cell");
    if let Some(style) = style {
        cell.push_attribute(("ss:StyleID", style));
    }
    if text.is_empty() {
        w.write_event(Event::Empty(cell))?;
        return Ok(());
    }
    w.write_event(Event::Start(cell))?;
    let mut data = BytesStart::new("Data");
    data.push_attribute(("ss:Type", data_type));
    w.write_event(Event::Start(data))?;
    w.write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?;
    w.write_event(Event::End(BytesEnd::new("Data")))?;
    w.write_event(Event::End(BytesEnd::new("Cell")))?;
    Ok(())
}

/// Escape markup and carriage returns, and replace characters XML 1.0 cannot
/// carry with U+FFFD.
pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
    let needs_work = text.chars().any(|c| {
        matches!(c, '&' | '<' | '>' | '\r') || !is_xml_char(c)
    });
    if !needs_work {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c if is_xml_char(c) => out.push(c),
            _ => out.push('\u{FFFD}'),
        }
    }
    Cow::Owned(out)
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}

fn cell_type(kind: Option<&ColumnKind>, role: RowRole, text: &str) -> &'static str {
    if !role.is_whole() {
        return "String";
    }
    match kind {
        Some(ColumnKind::Number) if text.parse::<f64>().is_ok_and(f64::is_finite) => "Number",
        Some(ColumnKind::Boolean) if matches!(text, "1" | "0" | "true" | "false") => "Boolean",
        _ => "String",
    }
}

impl<W: Write> CellSink for XmlSink<W> {
    fn limits(&self) -> FormatLimits {
        FormatLimits::xml2003()
    }

    fn begin(&mut self, schema: &ColumnSchema) -> Result<()> {
        if self.phase != Phase::Fresh {
            return Err(Error::Contract("begin called twice".into()));
        }
        self.kinds = schema.kinds().collect();
        self.open_workbook()
    }

    fn start_sheet(&mut self, sheet: SheetIndex) -> Result<()> {
        match self.phase {
            Phase::Fresh => self.open_workbook()?,
            Phase::Workbook => {}
            Phase::Sheet => return Err(Error::Contract("previous sheet still open".into())),
            Phase::Finished => return Err(Error::Closed),
        }
        let name = sheet_name_for(&self.base_name, sheet);
        write_sheet_start(self.writer()?, &name)?;
        self.phase = Phase::Sheet;
        Ok(())
    }

    fn write_row(&mut self, _row: RowIndex, role: RowRole, cells: &[&str]) -> Result<()> {
        if self.phase != Phase::Sheet {
            return Err(match self.phase {
                Phase::Finished => Error::Closed,
                _ => Error::Contract("write_row without an open sheet".into()),
            });
        }
        let style = role.is_header().then_some(HEADER_STYLE);
        let Self { writer, kinds, .. } = self;
        let w = writer.as_mut().ok_or(Error::Closed)?;
        w.write_event(Event::Start(BytesStart::new("Row")))?;
        for (i, text) in cells.iter().enumerate() {
            let data_type = if role.is_header() {
                "String"
            } else {
                cell_type(kinds.get(i), role, text)
            };
            let text: Cow<'_, str> = if data_type == "Boolean" {
                Cow::Borrowed(if matches!(*text, "1" | "true") { "1" } else { "0" })
            } else {
                Cow::Borrowed(text)
            };
            write_cell(w, data_type, &text, style)?;
        }
        w.write_event(Event::End(BytesEnd::new("Row")))?;
        Ok(())
    }

    fn close_sheet(&mut self) -> Result<()> {
        match self.phase {
            Phase::Sheet => self.end_sheet(),
            Phase::Finished => Err(Error::Closed),
            _ => Ok(()),
        }
    }

    fn recycle(&mut self) -> Result<()> {
        if self.phase == Phase::Finished {
            return Err(Error::Closed);
        }
        let writer = self.writer.take().ok_or(Error::Closed)?;
        let counting = writer
            .into_inner()
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        self.writer = Some(Writer::new(BufWriter::with_capacity(
            self.buffer_capacity,
            counting,
        )));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer()?.get_mut().flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self.phase {
            Phase::Finished => return Ok(()),
            Phase::Fresh => self.open_workbook()?,
            Phase::Sheet => self.end_sheet()?,
            Phase::Workbook => {}
        }
        let w = self.writer()?;
        w.write_event(Event::End(BytesEnd::new("Workbook")))?;
        w.get_mut().write_all(b"\n")?;
        w.get_mut().flush()?;
        self.phase = Phase::Finished;
        Ok(())
    }

    fn bytes_written(&self) -> Option<u64> {
        self.writer
            .as_ref()
            .map(|w| w.get_ref().get_ref().bytes_written())
    }
}
