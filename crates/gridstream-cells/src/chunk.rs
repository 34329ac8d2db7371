//! Cell chunking.
//!
//! Limits are counted in UTF-16 code units, the unit spreadsheet cell limits
//! are defined in, and chunks always end on character boundaries. A character
//! outside the Basic Multilingual Plane counts as two units and is never
//! split. With limit `M`, column `c` of length `len` occupies
//! `max(1, ceil(len / M))` physical rows when no such character straddles a
//! boundary; the logical row spans the maximum of that over all columns.
//! Physical row `o` carries chunk `o` of every column that has one and an
//! empty cell for every column that does not.

use std::borrow::Cow;

use gridstream_core::config::OverflowPolicy;

use crate::format::FormattedCell;

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Split `text` into pieces of at most `max` UTF-16 units. Always returns at
/// least one piece (the empty string for empty input). A piece holds at
/// least one character, so a limit of 1 still makes progress on a
/// two-unit character.
pub fn split_units(text: &str, max: usize) -> Vec<&str> {
    let max = max.max(1);
    // Byte length bounds the unit count.
    if text.len() <= max {
        return vec![text];
    }
    let mut out = Vec::with_capacity(text.len() / max + 1);
    let mut start = 0;
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        let width = ch.len_utf16();
        if units > 0 && units + width > max {
            out.push(&text[start..idx]);
            start = idx;
            units = 0;
        }
        units += width;
    }
    out.push(&text[start..]);
    out
}

/// Keep at most `max` UTF-16 units, ending with `marker` when text is cut.
/// A marker that does not leave room for any text is dropped.
pub fn truncate_units<'a>(text: &'a str, max: usize, marker: &str) -> Cow<'a, str> {
    let max = max.max(1);
    if text.len() <= max || utf16_len(text) <= max {
        return Cow::Borrowed(text);
    }
    let marker_len = utf16_len(marker);
    let (keep, marker) = if marker_len < max {
        (max - marker_len, marker)
    } else {
        (max, "")
    };
    let mut end = 0;
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        let width = ch.len_utf16();
        if units + width > keep {
            break;
        }
        units += width;
        end = idx + ch.len_utf8();
    }
    let mut out = String::with_capacity(end + marker.len());
    out.push_str(&text[..end]);
    out.push_str(marker);
    Cow::Owned(out)
}

/// Physical layout of one logical row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan<'a> {
    row_span: u64,
    columns: Vec<Vec<Cow<'a, str>>>,
    truncated_cells: u64,
    split_cells: u64,
}

impl<'a> ChunkPlan<'a> {
    /// Number of physical rows the logical row occupies. At least 1.
    pub fn row_span(&self) -> u64 {
        self.row_span
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Chunks of column `col`, in order.
    pub fn chunks(&self, col: usize) -> &[Cow<'a, str>] {
        self.columns.get(col).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cells of physical row `offset` (0-based within the logical row).
    pub fn physical_row(&self, offset: u64) -> Vec<&str> {
        self.columns
            .iter()
            .map(|chunks| {
                usize::try_from(offset)
                    .ok()
                    .and_then(|o| chunks.get(o))
                    .map(|c| c.as_ref())
                    .unwrap_or("")
            })
            .collect()
    }

    /// Cells that were cut under the truncate policy.
    pub fn truncated_cells(&self) -> u64 {
        self.truncated_cells
    }

    /// Cells that needed more than one chunk.
    pub fn split_cells(&self) -> u64 {
        self.split_cells
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    max_len: Option<usize>,
    policy: OverflowPolicy,
    marker: String,
}

impl Chunker {
    pub fn new(max_len: Option<usize>, policy: OverflowPolicy, marker: impl Into<String>) -> Self {
        Self {
            max_len: max_len.filter(|&m| m > 0),
            policy,
            marker: marker.into(),
        }
    }

    /// No cell limit: every row is a single physical row, text untouched.
    pub fn passthrough() -> Self {
        Self::new(None, OverflowPolicy::Chunk, "")
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn plan<'a>(&self, row: &'a [FormattedCell]) -> ChunkPlan<'a> {
        let Some(max) = self.max_len else {
            return ChunkPlan {
                row_span: 1,
                columns: row
                    .iter()
                    .map(|c| vec![Cow::Borrowed(c.text())])
                    .collect(),
                truncated_cells: 0,
                split_cells: 0,
            };
        };

        let mut truncated_cells = 0;
        let mut split_cells = 0;
        let columns: Vec<Vec<Cow<'a, str>>> = match self.policy {
            OverflowPolicy::Truncate => row
                .iter()
                .map(|c| {
                    let cut = truncate_units(c.text(), max, &self.marker);
                    if matches!(cut, Cow::Owned(_)) {
                        truncated_cells += 1;
                    }
                    vec![cut]
                })
                .collect(),
            OverflowPolicy::Chunk | OverflowPolicy::ChunkAcrossSheets => row
                .iter()
                .map(|c| {
                    let pieces = split_units(c.text(), max);
                    if pieces.len() > 1 {
                        split_cells += 1;
                    }
                    pieces.into_iter().map(Cow::Borrowed).collect()
                })
                .collect(),
        };

        let row_span = columns.iter().map(Vec::len).max().unwrap_or(1).max(1) as u64;
        ChunkPlan {
            row_span,
            columns,
            truncated_cells,
            split_cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridstream_core::schema::ColumnKind;

    fn cells(texts: &[&str]) -> Vec<FormattedCell> {
        texts
            .iter()
            .map(|t| FormattedCell::new(*t, ColumnKind::Text))
            .collect()
    }

    #[test]
    fn split_exact_multiple() {
        assert_eq!(split_units("abcdef", 3), vec!["abc", "def"]);
        assert_eq!(split_units("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(split_units("", 3), vec![""]);
    }

    #[test]
    fn split_respects_char_boundaries() {
        let s = "ääääé";
        assert_eq!(split_units(s, 2), vec!["ää", "ää", "é"]);
    }

    #[test]
    fn astral_characters_count_two_units() {
        assert_eq!(utf16_len("a😀b"), 4);
        assert_eq!(split_units("😀😀😀", 4), vec!["😀😀", "😀"]);
        // Never splits a surrogate pair.
        assert_eq!(split_units("a😀b", 2), vec!["a", "😀", "b"]);
        assert_eq!(split_units("😀😀", 1), vec!["😀", "😀"]);
    }

    #[test]
    fn truncate_counts_utf16_units() {
        assert_eq!(truncate_units("😀😀😀", 5, "…"), "😀😀…");
        assert_eq!(truncate_units("a😀", 2, "[more]"), "a");
        assert_eq!(truncate_units("😀😀", 4, "…"), "😀😀");
    }

    #[test]
    fn emoji_cells_stay_within_the_cell_limit() {
        let long = "😀".repeat(10);
        let row = cells(&[long.as_str()]);
        let plan = Chunker::new(Some(6), OverflowPolicy::Chunk, "").plan(&row);
        assert_eq!(plan.row_span(), 4);
        for chunk in plan.chunks(0) {
            assert!(utf16_len(chunk) <= 6);
        }
    }

    #[test]
    fn plan_spans_tallest_column() {
        let row = cells(&["x".repeat(25).as_str(), "short", ""]);
        let plan = Chunker::new(Some(10), OverflowPolicy::Chunk, "").plan(&row);
        assert_eq!(plan.row_span(), 3);
        assert_eq!(plan.physical_row(0), vec!["xxxxxxxxxx", "short", ""]);
        assert_eq!(plan.physical_row(2), vec!["xxxxx", "", ""]);
        assert_eq!(plan.split_cells(), 1);
    }

    #[test]
    fn passthrough_keeps_one_row() {
        let long = "y".repeat(100_000);
        let row = cells(&[long.as_str()]);
        let plan = Chunker::passthrough().plan(&row);
        assert_eq!(plan.row_span(), 1);
        assert_eq!(plan.physical_row(0)[0].len(), 100_000);
    }

    #[test]
    fn truncate_appends_marker_within_limit() {
        let row = cells(&["abcdefghijkl", "ok"]);
        let plan = Chunker::new(Some(8), OverflowPolicy::Truncate, "...").plan(&row);
        assert_eq!(plan.row_span(), 1);
        assert_eq!(plan.physical_row(0), vec!["abcde...", "ok"]);
        assert_eq!(plan.truncated_cells(), 1);
    }

    #[test]
    fn truncate_with_oversized_marker_cuts_plainly() {
        assert_eq!(truncate_units("abcdef", 2, "[more]"), "ab");
        assert_eq!(truncate_units("abc", 3, "..."), "abc");
        assert_eq!(truncate_units("ääää", 3, "…"), "ää…");
    }
}
