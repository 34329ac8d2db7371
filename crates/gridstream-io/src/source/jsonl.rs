//! JSON-lines row source: one JSON object per line, blank lines skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::source::RowSource;

pub type JsonRow = Map<String, Value>;

pub struct JsonlSource<R: BufRead> {
    reader: R,
    line: String,
    line_no: u64,
}

impl JsonlSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::open(path)?;
        Ok(Self::new(BufReader::new(f)))
    }
}

impl<R: BufRead> JsonlSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }

    /// Lines consumed so far, blank lines included.
    pub fn line_no(&self) -> u64 {
        self.line_no
    }
}

impl<R: BufRead> RowSource<JsonRow> for JsonlSource<R> {
    fn next_row(&mut self) -> Result<Option<JsonRow>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(_) => Err(Error::Source(format!(
                    "line {}: expected a JSON object",
                    self.line_no
                ))),
                Err(e) => Err(Error::Source(format!("line {}: {e}", self.line_no))),
            };
        }
    }
}
