//! Excel-specific COM automation layer built on top of the generic IDispatch wrapper.

#![cfg(windows)]

use std::collections::HashMap;

use windows::Win32::System::Variant::VARIANT;

use excel_link_protocol::{CellError, CellValue, Matrix, SheetRef};

use crate::dispatch::{
    variant_bool, variant_empty, variant_f64, variant_get_bool, variant_get_error,
    variant_get_f64, variant_get_grid, variant_get_string, variant_grid, variant_i32,
    variant_is_empty, variant_missing, variant_str, DispatchObject,
};

// XlSheetVisibility
const XL_SHEET_VISIBLE: i32 = -1;
const XL_SHEET_HIDDEN: i32 = 0;

/// Manages an Excel.Application COM instance and its open workbooks.
pub struct ExcelApp {
    app: DispatchObject,
    workbooks_collection: DispatchObject,
    /// Map from our handle IDs to workbook dispatch objects.
    workbooks: HashMap<u64, DispatchObject>,
    next_handle: u64,
}

impl ExcelApp {
    /// Create a new Excel.Application instance via COM.
    pub fn new() -> Result<Self, String> {
        let app = DispatchObject::create_from_progid("Excel.Application")?;

        // Disable UI elements for automation
        app.set_property("Visible", variant_bool(false))?;
        app.set_property("DisplayAlerts", variant_bool(false))?;

        let workbooks_collection = app.get_child("Workbooks")?;

        Ok(Self {
            app,
            workbooks_collection,
            workbooks: HashMap::new(),
            next_handle: 1,
        })
    }

    fn register(&mut self, wb: DispatchObject) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.workbooks.insert(handle, wb);
        handle
    }

    fn workbook(&self, wb_handle: u64) -> Result<&DispatchObject, String> {
        self.workbooks
            .get(&wb_handle)
            .ok_or_else(|| format!("Invalid workbook handle: {wb_handle}"))
    }

    /// Create a new empty workbook. Returns the handle ID.
    pub fn create_workbook(&mut self) -> Result<u64, String> {
        let wb = self.workbooks_collection.invoke_child("Add", &[])?;
        Ok(self.register(wb))
    }

    /// Open a workbook from a file path. Returns the handle ID.
    ///
    /// `Workbooks.Open(FileName, UpdateLinks, ReadOnly, Format, Password)`:
    /// the password is the fifth positional argument.
    pub fn open_workbook(&mut self, path: &str, password: Option<&str>) -> Result<u64, String> {
        let args = match password {
            Some(password) => vec![
                variant_str(path),
                variant_missing(),
                variant_missing(),
                variant_missing(),
                variant_str(password),
            ],
            None => vec![variant_str(path)],
        };
        let wb = self.workbooks_collection.invoke_child("Open", &args)?;
        Ok(self.register(wb))
    }

    /// Get a worksheet from a workbook.
    fn get_sheet(&self, wb_handle: u64, sheet: &SheetRef) -> Result<DispatchObject, String> {
        let sheets = self.workbook(wb_handle)?.get_child("Worksheets")?;
        match sheet {
            SheetRef::Index(idx) => {
                // Excel worksheets are 1-based, our protocol uses 0-based
                let excel_index = (*idx as i32) + 1;
                sheets.get_indexed("Item", &variant_i32(excel_index))
            }
            SheetRef::Name(name) => sheets.get_indexed("Item", &variant_str(name)),
        }
    }

    /// Get a Range object for an A1 reference.
    fn get_range(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        address: &str,
    ) -> Result<DispatchObject, String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        ws.get_indexed("Range", &variant_str(address))
    }

    /// Worksheet names in tab order.
    pub fn list_sheets(&self, wb_handle: u64) -> Result<Vec<String>, String> {
        let sheets = self.workbook(wb_handle)?.get_child("Worksheets")?;
        let count = variant_get_f64(&sheets.get_property("Count")?)
            .ok_or("Worksheets.Count is not a number")? as i32;
        (1..=count)
            .map(|i| {
                let ws = sheets.get_indexed("Item", &variant_i32(i))?;
                variant_get_string(&ws.get_property("Name")?)
                    .ok_or_else(|| format!("Worksheet {i} has no name"))
            })
            .collect()
    }

    /// Add a worksheet and name it.
    pub fn add_sheet(&self, wb_handle: u64, name: &str) -> Result<(), String> {
        let sheets = self.workbook(wb_handle)?.get_child("Worksheets")?;
        let ws = sheets.invoke_child("Add", &[])?;
        ws.set_property("Name", variant_str(name))
    }

    /// Show or hide a worksheet tab.
    pub fn set_sheet_visible(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        visible: bool,
    ) -> Result<(), String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        let state = if visible {
            XL_SHEET_VISIBLE
        } else {
            XL_SHEET_HIDDEN
        };
        ws.set_property("Visible", variant_i32(state))
    }

    /// Append VBA source to the code module behind a worksheet.
    ///
    /// Fails unless "Trust access to the VBA project object model" is enabled.
    pub fn add_sheet_macro(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        code: &str,
    ) -> Result<(), String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        let code_name = variant_get_string(&ws.get_property("CodeName")?)
            .ok_or("Worksheet has no CodeName")?;
        let module = self
            .workbook(wb_handle)?
            .get_child("VBProject")?
            .get_child("VBComponents")?
            .get_indexed("Item", &variant_str(&code_name))?
            .get_child("CodeModule")?;
        module.invoke_method("AddFromString", &[variant_str(code)])?;
        Ok(())
    }

    /// Read every value of a range, rows outer.
    pub fn get_range_values(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        address: &str,
    ) -> Result<Matrix, String> {
        let range = self.get_range(wb_handle, sheet, address)?;
        let value = range.get_property("Value")?;
        match variant_get_grid(&value)? {
            Some(rows) => Ok(rows
                .iter()
                .map(|row| row.iter().map(variant_to_cell_value).collect())
                .collect()),
            None => Ok(vec![vec![variant_to_cell_value(&value)]]),
        }
    }

    /// Overwrite a range in one assignment, so a sheet's change handler
    /// fires once for the whole range.
    pub fn set_range_values(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        address: &str,
        values: &Matrix,
    ) -> Result<(), String> {
        let width = values.first().map_or(0, Vec::len);
        if values.iter().any(|row| row.len() != width) {
            return Err(format!("Ragged values for range {address}"));
        }
        let range = self.get_range(wb_handle, sheet, address)?;
        let variant = match values.as_slice() {
            [row] if row.len() == 1 => cell_value_to_variant(&row[0]),
            _ => {
                let rows: Vec<Vec<VARIANT>> = values
                    .iter()
                    .map(|row| row.iter().map(cell_value_to_variant).collect())
                    .collect();
                variant_grid(&rows)?
            }
        };
        range.set_property("Value", variant)
    }

    /// Show or hide the application window.
    pub fn set_visible(&self, visible: bool) -> Result<(), String> {
        self.app.set_property("Visible", variant_bool(visible))
    }

    /// Save a workbook to the file it came from.
    pub fn save_workbook(&self, wb_handle: u64) -> Result<(), String> {
        self.workbook(wb_handle)?.invoke_method("Save", &[])?;
        Ok(())
    }

    /// Save a workbook to a file path.
    pub fn save_workbook_as(&self, wb_handle: u64, path: &str) -> Result<(), String> {
        let wb = self.workbook(wb_handle)?;

        // Determine file format from extension
        // xlOpenXMLWorkbook = 51, xlOpenXMLWorkbookMacroEnabled = 52,
        // xlWorkbookNormal (xls) = -4143, xlCSV = 6
        let lower = path.to_ascii_lowercase();
        let format: i32 = if lower.ends_with(".xlsm") {
            52
        } else if lower.ends_with(".xls") {
            -4143
        } else if lower.ends_with(".csv") {
            6
        } else {
            51
        };

        wb.invoke_method("SaveAs", &[variant_str(path), variant_i32(format)])?;
        Ok(())
    }

    /// Close a workbook without saving.
    pub fn close_workbook(&mut self, wb_handle: u64) -> Result<(), String> {
        let wb = self
            .workbooks
            .remove(&wb_handle)
            .ok_or_else(|| format!("Invalid workbook handle: {wb_handle}"))?;
        wb.invoke_method("Close", &[variant_bool(false)])?;
        Ok(())
    }

    /// Shut down: close all workbooks and quit Excel.
    pub fn shutdown(mut self) -> Result<(), String> {
        let handles: Vec<u64> = self.workbooks.keys().copied().collect();
        for h in handles {
            let _ = self.close_workbook(h);
        }
        self.app.invoke_method("Quit", &[])?;
        Ok(())
    }
}

/// Convert our protocol CellValue to a COM VARIANT.
fn cell_value_to_variant(value: &CellValue) -> VARIANT {
    match value {
        CellValue::Null => variant_empty(),
        CellValue::Bool(b) => variant_bool(*b),
        CellValue::Number(n) => variant_f64(*n),
        CellValue::String(s) => variant_str(s),
        CellValue::Error(_) => variant_empty(), // Can't set error values
    }
}

/// Convert a COM VARIANT to our protocol CellValue.
fn variant_to_cell_value(variant: &VARIANT) -> CellValue {
    if variant_is_empty(variant) {
        CellValue::Null
    } else if let Some(b) = variant_get_bool(variant) {
        CellValue::Bool(b)
    } else if let Some(n) = variant_get_f64(variant) {
        CellValue::Number(n)
    } else if let Some(s) = variant_get_string(variant) {
        CellValue::String(s)
    } else if let Some(scode) = variant_get_error(variant) {
        CellValue::Error(CellError {
            code: error_code_text(scode),
        })
    } else {
        CellValue::Null
    }
}

/// Excel reports cell errors as `0x800A0000 | xlErr*`.
fn error_code_text(scode: i32) -> String {
    match (scode as u32) & 0xFFFF {
        2000 => "#NULL!".to_string(),
        2007 => "#DIV/0!".to_string(),
        2015 => "#VALUE!".to_string(),
        2023 => "#REF!".to_string(),
        2029 => "#NAME?".to_string(),
        2036 => "#NUM!".to_string(),
        2042 => "#N/A".to_string(),
        other => format!("#ERR({other})"),
    }
}
