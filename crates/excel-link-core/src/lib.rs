//! # excel-link-core
//!
//! Range access over a spreadsheet automation host.
//!
//! The host itself (a live Excel instance, or the in-memory stand-in in
//! [`memory`]) is reached through two small capability traits,
//! [`SheetAccess`] and [`WorkbookAccess`]. On top of them this crate provides:
//! - A1 address conversion ([`address`])
//! - shape-checked range, block, row and column writes ([`RangeAccessExt`])
//! - extent discovery by scanning for the first empty cell ([`scan`])
//! - the hidden-sheet change log ([`changelog`])
//! - a header-labelled table view ([`Table`])
//!
//! ## Example
//!
//! ```rust
//! use excel_link_core::memory::MemoryWorkbook;
//! use excel_link_core::{Offset, RangeAccessExt, WorkbookAccess};
//!
//! let book = MemoryWorkbook::new();
//! let sheet = book.sheet("Sheet1").unwrap();
//!
//! sheet
//!     .write_block("B2", vec![vec![1.0, 2.0], vec![3.0, 4.0]], Offset::NONE)
//!     .unwrap();
//!
//! let block = sheet.read_block("B2", Offset::NONE, 0).unwrap();
//! assert_eq!(block.len(), 2);
//! assert_eq!(block[1][1].as_f64(), Some(4.0));
//! ```

pub mod access;
pub mod address;
pub mod changelog;
pub mod error;
pub mod host;
pub mod memory;
pub mod prelude;
pub mod scan;
pub mod shape;
pub mod table;
pub mod value;

pub use access::{RangeAccessExt, RangeValue};
pub use address::{
    column_letters_to_number, column_number_to_letters, string_address_to_row_col, Anchor,
    CellAddress, CellRange, Offset,
};
pub use changelog::{Change, ChangeLog};
pub use error::{Error, Result, ShapeError, ShapeErrorKind};
pub use host::{SheetAccess, WorkbookAccess};
pub use shape::Array;
pub use table::Table;
pub use value::{CellError, CellValue, Matrix};
