//! Capabilities an automation host has to provide.
//!
//! Handles behave like references into a live application: methods take
//! `&self` even when they modify the document, and cloning a sheet handle
//! does not copy the sheet.

use crate::address::{CellAddress, CellRange};
use crate::error::Result;
use crate::value::{CellValue, Matrix};

/// A worksheet inside a workbook owned by the host.
pub trait SheetAccess {
    /// The sheet's name as shown on its tab.
    fn name(&self) -> &str;

    /// Value of a single cell.
    fn cell_value(&self, address: CellAddress) -> Result<CellValue>;

    /// Values of a rectangle given by its corners, rows outer.
    fn range_values(&self, range: CellRange) -> Result<Matrix>;

    /// Values of whatever the host resolves `address` to (`"B2"`,
    /// `"A1:C4"`, ...), rows outer.
    fn address_values(&self, address: &str) -> Result<Matrix>;

    /// Overwrite a rectangle. `rows` has exactly the range's extent.
    fn set_range_values(&self, range: CellRange, rows: Matrix) -> Result<()>;
}

/// An open workbook.
pub trait WorkbookAccess {
    type Sheet: SheetAccess;

    /// Names of all worksheets, in tab order.
    fn sheet_names(&self) -> Result<Vec<String>>;

    /// Look up a worksheet by name.
    fn sheet(&self, name: &str) -> Result<Self::Sheet>;

    /// Append a new worksheet called `name`.
    fn add_sheet(&self, name: &str) -> Result<Self::Sheet>;

    /// Show or hide a worksheet's tab.
    fn set_sheet_visible(&self, name: &str, visible: bool) -> Result<()>;

    /// Add VBA source to the code module behind a worksheet.
    fn add_sheet_macro(&self, sheet: &str, code: &str) -> Result<()>;

    /// Save in place.
    fn save(&self) -> Result<()>;

    /// Save under a new path.
    fn save_as(&self, path: &str) -> Result<()>;

    /// Show or hide the application window.
    fn set_visible(&self, visible: bool) -> Result<()>;

    fn has_sheet(&self, name: &str) -> Result<bool> {
        Ok(self.sheet_names()?.iter().any(|n| n == name))
    }
}
