//! Export configuration that callers can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::limits::{FormatLimits, OutputFormat};

/// What happens to a cell whose text exceeds the effective cell limit.
/// One policy per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Spread the text over consecutive physical rows; a logical row never
    /// spans sheets.
    #[default]
    Chunk,
    /// Keep a single physical row and cut the text, ending with the marker.
    Truncate,
    /// Like `Chunk`, but a tall row may continue on the next sheet.
    ChunkAcrossSheets,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "chunk" => Ok(OverflowPolicy::Chunk),
            "truncate" => Ok(OverflowPolicy::Truncate),
            "chunk-across-sheets" => Ok(OverflowPolicy::ChunkAcrossSheets),
            other => Err(Error::Config(format!("unknown overflow policy `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BooleanStyle {
    /// `true` / `false`
    #[default]
    Words,
    /// `1` / `0`
    Digits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Longest text a single cell may hold, in UTF-16 code units. `None` disables
    /// chunking; the sink's own ceiling still applies.
    pub max_cell_text_length: Option<usize>,

    /// Rows per sheet including the header. `None` or `Some(0)` disables
    /// rollover; the sink's own ceiling still applies.
    pub max_rows_per_sheet: Option<u32>,

    /// Soft budget for bytes buffered in the writer. 0 = unbounded.
    pub memory_budget_bytes: u64,

    /// Fraction of the budget at which the writer is flushed and recreated.
    pub flush_threshold_ratio: f64,

    pub overflow_policy: OverflowPolicy,

    /// Appended to truncated text under `OverflowPolicy::Truncate`.
    pub overflow_marker: String,

    /// Flush the sink every N logical rows. 0 disables periodic flushes.
    pub flush_interval_rows: u64,

    pub boolean_style: BooleanStyle,

    /// Async driver yields to the runtime every N rows. 0 disables.
    pub yield_interval_rows: u64,

    /// Base sheet name; later sheets get a numeric suffix.
    pub sheet_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_cell_text_length: None,
            max_rows_per_sheet: None,
            memory_budget_bytes: 64 * 1024 * 1024, // 64 MiB
            flush_threshold_ratio: 0.8,
            overflow_policy: OverflowPolicy::Chunk,
            overflow_marker: "...".to_string(),
            flush_interval_rows: 10_000,
            boolean_style: BooleanStyle::Words,
            yield_interval_rows: 10_000,
            sheet_name: "Data".to_string(),
        }
    }
}

impl ExportConfig {
    /// Defaults with the ceilings of `format` filled in.
    pub fn for_format(format: OutputFormat) -> Self {
        let limits = format.limits();
        Self {
            max_cell_text_length: limits.max_cell_text_length,
            max_rows_per_sheet: limits.max_rows_per_sheet,
            ..Self::default()
        }
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `GRIDSTREAM_MAX_CELL_TEXT_LENGTH`: UTF-16 code units per cell
    /// - `GRIDSTREAM_MAX_ROWS_PER_SHEET`: rows per sheet including the header
    /// - `GRIDSTREAM_MEMORY_BUDGET_BYTES`: writer memory budget (0 = unbounded)
    /// - `GRIDSTREAM_FLUSH_THRESHOLD_RATIO`: fraction of the budget, in (0, 1]
    /// - `GRIDSTREAM_OVERFLOW_POLICY`: `chunk`, `truncate`, `chunk-across-sheets`
    /// - `GRIDSTREAM_OVERFLOW_MARKER`: truncation marker
    /// - `GRIDSTREAM_FLUSH_INTERVAL_ROWS`: periodic flush interval
    /// - `GRIDSTREAM_YIELD_INTERVAL_ROWS`: async yield interval
    /// - `GRIDSTREAM_SHEET_NAME`: base sheet name
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("GRIDSTREAM_MAX_CELL_TEXT_LENGTH") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_cell_text_length = Some(v);
            }
        }

        if let Ok(s) = std::env::var("GRIDSTREAM_MAX_ROWS_PER_SHEET") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.max_rows_per_sheet = Some(v);
            }
        }

        if let Ok(s) = std::env::var("GRIDSTREAM_MEMORY_BUDGET_BYTES") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.memory_budget_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("GRIDSTREAM_FLUSH_THRESHOLD_RATIO") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.flush_threshold_ratio = v;
            }
        }

        if let Ok(s) = std::env::var("GRIDSTREAM_OVERFLOW_POLICY") {
            if let Ok(v) = s.parse::<OverflowPolicy>() {
                cfg.overflow_policy = v;
            }
        }

        if let Ok(s) = std::env::var("GRIDSTREAM_OVERFLOW_MARKER") {
            cfg.overflow_marker = s;
        }

        if let Ok(s) = std::env::var("GRIDSTREAM_FLUSH_INTERVAL_ROWS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.flush_interval_rows = v;
            }
        }

        if let Ok(s) = std::env::var("GRIDSTREAM_YIELD_INTERVAL_ROWS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.yield_interval_rows = v;
            }
        }

        if let Ok(s) = std::env::var("GRIDSTREAM_SHEET_NAME") {
            cfg.sheet_name = s;
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_cell_text_length == Some(0) {
            return Err(Error::Config("max_cell_text_length must be at least 1".into()));
        }
        if let Some(rows) = self.max_rows_per_sheet {
            // A header plus at least one data row.
            if rows == 1 {
                return Err(Error::Config(
                    "max_rows_per_sheet must be 0 (disabled) or at least 2".into(),
                ));
            }
        }
        if !(self.flush_threshold_ratio > 0.0 && self.flush_threshold_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "flush_threshold_ratio must be in (0, 1], got {}",
                self.flush_threshold_ratio
            )));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(Error::Config("sheet_name must not be blank".into()));
        }
        Ok(())
    }

    /// Rollover threshold with 0 normalized to "disabled".
    pub fn rows_per_sheet(&self) -> Option<u32> {
        self.max_rows_per_sheet.filter(|&r| r > 0)
    }

    /// Combine with what a sink supports. A dimension the sink does not limit
    /// stays unlimited; otherwise the tighter of the two wins.
    pub fn effective_limits(&self, sink: FormatLimits) -> FormatLimits {
        FormatLimits {
            max_cell_text_length: sink
                .max_cell_text_length
                .map(|s| self.max_cell_text_length.map_or(s, |c| c.min(s))),
            max_rows_per_sheet: sink
                .max_rows_per_sheet
                .map(|s| self.rows_per_sheet().map_or(s, |c| c.min(s))),
            max_columns: sink.max_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ExportConfig::default().validate().unwrap();
        ExportConfig::for_format(OutputFormat::Xlsx).validate().unwrap();
    }

    #[test]
    fn rejects_degenerate_values() {
        let cfg = ExportConfig {
            max_rows_per_sheet: Some(1),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ExportConfig {
            max_cell_text_length: Some(0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ExportConfig {
            flush_threshold_ratio: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_rows_disables_rollover() {
        let cfg = ExportConfig {
            max_rows_per_sheet: Some(0),
            ..Default::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.rows_per_sheet(), None);
    }

    #[test]
    fn effective_limits_take_the_tighter_bound() {
        let cfg = ExportConfig {
            max_cell_text_length: Some(10),
            max_rows_per_sheet: Some(4),
            ..Default::default()
        };
        let eff = cfg.effective_limits(FormatLimits::xlsx());
        assert_eq!(eff.max_cell_text_length, Some(10));
        assert_eq!(eff.max_rows_per_sheet, Some(4));

        // Flat formats ignore sheet and cell limits entirely.
        let eff = cfg.effective_limits(FormatLimits::unbounded());
        assert_eq!(eff, FormatLimits::unbounded());

        // Config looser than the format: the format wins.
        let cfg = ExportConfig {
            max_cell_text_length: Some(100_000),
            ..Default::default()
        };
        let eff = cfg.effective_limits(FormatLimits::xml2003());
        assert_eq!(eff.max_cell_text_length, Some(32_767));
        assert_eq!(eff.max_rows_per_sheet, Some(65_536));
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(
            "chunk_across_sheets".parse::<OverflowPolicy>().unwrap(),
            OverflowPolicy::ChunkAcrossSheets
        );
        assert!("spill".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn serde_fills_missing_fields_with_defaults() {
        let cfg: ExportConfig = serde_json::from_str(r#"{"max_rows_per_sheet": 10}"#).unwrap();
        assert_eq!(cfg.max_rows_per_sheet, Some(10));
        assert_eq!(cfg.overflow_marker, "...");
    }
}
