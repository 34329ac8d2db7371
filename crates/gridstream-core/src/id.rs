//! Strongly-typed positions used across the engine.
//!
//! Sheets and rows are 1-based, matching what a spreadsheet user sees. Sinks
//! convert to their own zero-based coordinates at the edge.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            pub const fn new(v: $inner) -> Self {
                Self(v)
            }
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(SheetIndex, u32);
new_id!(RowIndex, u64);

impl SheetIndex {
    pub const FIRST: SheetIndex = SheetIndex(1);

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl RowIndex {
    /// Row 1 always holds the header.
    pub const HEADER: RowIndex = RowIndex(1);
    /// First data row on every sheet.
    pub const FIRST_DATA: RowIndex = RowIndex(2);

    pub const fn offset(self, by: u64) -> Self {
        Self(self.0 + by)
    }

    /// Zero-based position as used by most writer libraries.
    pub const fn zero_based(self) -> u64 {
        self.0 - 1
    }
}
