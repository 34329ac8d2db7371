#![forbid(unsafe_code)]
//! gridstream-cells: everything between a typed row and a physical grid row.
//!
//! - `accessor`: column-name -> field-extraction binding, memoized per
//!   (row shape, column list) in an explicit registry.
//! - `format`: value -> canonical cell text.
//! - `chunk`: oversized text -> per-physical-row chunks under an overflow policy.
//! - `sheet`: sheet/row bookkeeping with rollover and header placement.

pub mod accessor;
pub mod error;
pub mod format;
pub mod chunk;
pub mod sheet;

pub use accessor::{Accessor, AccessorRegistry, RowShape, ShapeKey};
pub use chunk::{ChunkPlan, Chunker};
pub use error::{LayoutError, Result};
pub use format::{FormattedCell, ValueFormatter};
pub use sheet::{Segment, SheetManager, SheetPhase, SheetState};
