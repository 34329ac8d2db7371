//! Hard ceilings imposed by the supported output formats.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// #region Excel (OOXML) ceilings
pub const XLSX_MAX_ROWS: u32 = 1_048_576;
pub const XLSX_MAX_COLUMNS: usize = 16_384;
pub const XLSX_MAX_CELL_TEXT_LENGTH: usize = 32_767;
// #endregion

// #region SpreadsheetML 2003 ceilings
pub const XML2003_MAX_ROWS: u32 = 65_536;
pub const XML2003_MAX_COLUMNS: usize = 256;
pub const XML2003_MAX_CELL_TEXT_LENGTH: usize = 32_767;
// #endregion

// #region Sheet naming
pub const SHEET_NAME_MAX_LEN: usize = 31;
pub const SHEET_NAME_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];
// #endregion

/// Limits a sink imposes. `None` means the format has no such ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatLimits {
    pub max_cell_text_length: Option<usize>,
    pub max_rows_per_sheet: Option<u32>,
    pub max_columns: Option<usize>,
}

impl FormatLimits {
    /// Flat formats: no cell, row or column ceilings.
    pub const fn unbounded() -> Self {
        Self {
            max_cell_text_length: None,
            max_rows_per_sheet: None,
            max_columns: None,
        }
    }

    pub const fn xlsx() -> Self {
        Self {
            max_cell_text_length: Some(XLSX_MAX_CELL_TEXT_LENGTH),
            max_rows_per_sheet: Some(XLSX_MAX_ROWS),
            max_columns: Some(XLSX_MAX_COLUMNS),
        }
    }

    pub const fn xml2003() -> Self {
        Self {
            max_cell_text_length: Some(XML2003_MAX_CELL_TEXT_LENGTH),
            max_rows_per_sheet: Some(XML2003_MAX_ROWS),
            max_columns: Some(XML2003_MAX_COLUMNS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Csv,
    Xlsx,
    Xml,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Csv, OutputFormat::Xlsx, OutputFormat::Xml];

    pub const fn limits(self) -> FormatLimits {
        match self {
            OutputFormat::Csv => FormatLimits::unbounded(),
            OutputFormat::Xlsx => FormatLimits::xlsx(),
            OutputFormat::Xml => FormatLimits::xml2003(),
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Xml => "xml",
        }
    }

    /// Infer the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s.trim())
            .ok_or_else(|| Error::Config(format!("unknown output format `{s}`")))
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
