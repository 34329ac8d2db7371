//! Byte estimates for buffered writer elements.
//!
//! The numbers are deliberately pessimistic: a cell costs a fixed overhead
//! for its XML/record framing plus two bytes per character of text, a row a
//! fixed overhead of its own.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    pub cell_overhead: u64,
    pub bytes_per_char: u64,
    pub row_overhead: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cell_overhead: 200,
            bytes_per_char: 2,
            row_overhead: 100,
        }
    }
}

impl CostModel {
    pub fn cell_cost(&self, text: &str) -> u64 {
        let chars = text.chars().count() as u64;
        self.cell_overhead
            .saturating_add(chars.saturating_mul(self.bytes_per_char))
    }

    /// One physical row: its own overhead plus every cell.
    pub fn row_cost<S: AsRef<str>>(&self, cells: &[S]) -> u64 {
        cells
            .iter()
            .fold(self.row_overhead, |acc, c| acc.saturating_add(self.cell_cost(c.as_ref())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_counts_characters_not_bytes() {
        let model = CostModel::default();
        assert_eq!(model.cell_cost(""), 200);
        assert_eq!(model.cell_cost("abc"), 206);
        // Three 2-byte characters still cost three characters.
        assert_eq!(model.cell_cost("äöü"), 206);
    }

    #[test]
    fn row_cost_adds_row_overhead() {
        let model = CostModel::default();
        assert_eq!(model.row_cost(&["a", "bb"]), 100 + 202 + 204);
        assert_eq!(model.row_cost::<&str>(&[]), 100);
    }
}
