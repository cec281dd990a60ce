//! Prelude module - common imports for excel-link users
//!
//! ```rust
//! use excel_link_core::prelude::*;
//! ```

pub use crate::{
    Anchor, Array, CellAddress, CellRange, CellValue, Change, ChangeLog, Error, Matrix, Offset,
    RangeAccessExt, RangeValue, Result, ShapeError, ShapeErrorKind, SheetAccess, Table,
    WorkbookAccess,
};
