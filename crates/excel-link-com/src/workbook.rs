//! Workbook handle: an open workbook inside the bridge's Excel instance.

use std::path::{Path, PathBuf};

use excel_link_core::WorkbookAccess;
use excel_link_protocol::SheetRef;

use crate::bridge::{linux_to_wine_path, BridgeError, ExcelBridge};
use crate::worksheet::Worksheet;

/// How [`ExcelBridge::open`] should obtain a workbook.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Linux path of the file.
    pub path: PathBuf,
    /// Password protecting the file, if any.
    pub password: Option<String>,
    /// Create and save a new workbook at `path` when it cannot be opened.
    pub create: bool,
    /// Show the application window once the workbook is ready.
    pub visible: bool,
}

impl OpenOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// A handle to an open workbook in the Excel COM bridge.
///
/// Operations on this workbook are forwarded to the bridge process.
pub struct Workbook<'a> {
    bridge: &'a ExcelBridge,
    handle: u64,
}

impl<'a> Workbook<'a> {
    pub(crate) fn new(bridge: &'a ExcelBridge, handle: u64) -> Self {
        Self { bridge, handle }
    }

    /// Get the internal handle ID.
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// Worksheet names in tab order.
    pub fn sheet_names(&self) -> Result<Vec<String>, BridgeError> {
        self.bridge.list_sheets(self.handle)
    }

    /// Handle to the worksheet called `name`.
    pub fn worksheet(&self, name: &str) -> Result<Worksheet<'a>, BridgeError> {
        if !self.sheet_names()?.iter().any(|n| n == name) {
            return Err(BridgeError::SheetNotFound(name.to_string()));
        }
        Ok(Worksheet::new(self.bridge, self.handle, name))
    }

    /// Append a worksheet and return a handle to it.
    pub fn add_worksheet(&self, name: &str) -> Result<Worksheet<'a>, BridgeError> {
        self.bridge.add_sheet(self.handle, name)?;
        Ok(Worksheet::new(self.bridge, self.handle, name))
    }

    pub fn set_worksheet_visible(&self, name: &str, visible: bool) -> Result<(), BridgeError> {
        self.bridge
            .set_sheet_visible(self.handle, SheetRef::from(name), visible)
    }

    /// Append VBA source to a worksheet's code module. Needs "Trust access
    /// to the VBA project object model" enabled in Excel.
    pub fn add_worksheet_macro(&self, sheet: &str, code: &str) -> Result<(), BridgeError> {
        self.bridge
            .add_sheet_macro(self.handle, SheetRef::from(sheet), code)
    }

    /// Show the Excel window.
    pub fn show(&self) -> Result<(), BridgeError> {
        self.bridge.set_visible(true)
    }

    /// Hide the Excel window.
    pub fn hide(&self) -> Result<(), BridgeError> {
        self.bridge.set_visible(false)
    }

    // -- File operations --

    /// Save the workbook to the file it was opened from.
    pub fn save_in_place(&self) -> Result<(), BridgeError> {
        self.bridge.save_workbook(self.handle)
    }

    /// Save the workbook to a file path.
    ///
    /// Accepts a Linux path, which is converted to a WINE path.
    /// Format is inferred from the extension (.xlsx, .xlsm, .xls, .csv).
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), BridgeError> {
        let wine_path = linux_to_wine_path(path.as_ref());
        self.bridge.save_workbook_as(self.handle, &wine_path)
    }

    /// Save the workbook using a raw Windows/WINE path (no conversion).
    pub fn save_as_raw_path(&self, wine_path: &str) -> Result<(), BridgeError> {
        self.bridge.save_workbook_as(self.handle, wine_path)
    }

    /// Close the workbook without saving.
    pub fn close(self) -> Result<(), BridgeError> {
        self.bridge.close_workbook(self.handle)
    }
}

impl<'a> WorkbookAccess for Workbook<'a> {
    type Sheet = Worksheet<'a>;

    fn sheet_names(&self) -> excel_link_core::Result<Vec<String>> {
        Ok(Workbook::sheet_names(self)?)
    }

    fn sheet(&self, name: &str) -> excel_link_core::Result<Worksheet<'a>> {
        Ok(self.worksheet(name)?)
    }

    fn add_sheet(&self, name: &str) -> excel_link_core::Result<Worksheet<'a>> {
        Ok(self.add_worksheet(name)?)
    }

    fn set_sheet_visible(&self, name: &str, visible: bool) -> excel_link_core::Result<()> {
        Ok(self.set_worksheet_visible(name, visible)?)
    }

    fn add_sheet_macro(&self, sheet: &str, code: &str) -> excel_link_core::Result<()> {
        Ok(self.add_worksheet_macro(sheet, code)?)
    }

    fn save(&self) -> excel_link_core::Result<()> {
        Ok(self.save_in_place()?)
    }

    fn save_as(&self, path: &str) -> excel_link_core::Result<()> {
        Ok(self.save_to(path)?)
    }

    fn set_visible(&self, visible: bool) -> excel_link_core::Result<()> {
        Ok(self.bridge.set_visible(visible)?)
    }
}
