//! An in-process host backed by sparse grids.
//!
//! Used wherever a live spreadsheet application is unavailable, most of all in
//! tests. It follows the application's observable behaviour closely enough for
//! range access and the change log: sheet handles share state with their
//! workbook, empty cells read as `Null`, and a sheet carrying the change
//! tracker macro appends to `logs!A1` on every write.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::address::{CellAddress, CellRange};
use crate::changelog::{append_entry, LOG_SHEET};
use crate::error::{Error, Result};
use crate::host::{SheetAccess, WorkbookAccess};
use crate::value::{CellValue, Matrix};

const LOG_CELL: CellAddress = CellAddress { row: 1, col: 1 };

#[derive(Debug)]
struct SheetState {
    name: String,
    cells: BTreeMap<CellAddress, CellValue>,
    visible: bool,
    code: String,
}

impl SheetState {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
            visible: true,
            code: String::new(),
        }
    }

    fn get(&self, addr: CellAddress) -> CellValue {
        self.cells.get(&addr).cloned().unwrap_or_default()
    }

    fn set(&mut self, addr: CellAddress, value: CellValue) {
        if value.is_null() {
            self.cells.remove(&addr);
        } else {
            self.cells.insert(addr, value);
        }
    }

    fn tracks_changes(&self) -> bool {
        self.code.contains("Worksheet_Change")
    }
}

#[derive(Debug)]
struct BookState {
    sheets: Vec<SheetState>,
    visible: bool,
    path: Option<String>,
    saves: usize,
    probes: usize,
}

impl BookState {
    fn sheet(&self, name: &str) -> Result<&SheetState> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut SheetState> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// What the tracker macro does after a change lands on `sheet`.
    fn record_change(&mut self, sheet: &str, range: CellRange) {
        if let Ok(logs) = self.sheet_mut(LOG_SHEET) {
            let current = logs.get(LOG_CELL);
            let entry = append_entry(&current, sheet, range);
            logs.set(LOG_CELL, CellValue::String(entry));
        }
    }
}

/// An in-memory workbook. Clones share the same document.
#[derive(Debug, Clone)]
pub struct MemoryWorkbook {
    state: Rc<RefCell<BookState>>,
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorkbook {
    /// A workbook with a single empty `Sheet1`, like a fresh application
    /// workbook.
    pub fn new() -> Self {
        Self::with_sheets(&["Sheet1"])
    }

    pub fn with_sheets(names: &[&str]) -> Self {
        Self {
            state: Rc::new(RefCell::new(BookState {
                sheets: names.iter().map(|n| SheetState::new(n)).collect(),
                visible: false,
                path: None,
                saves: 0,
                probes: 0,
            })),
        }
    }

    /// Whether the application window would be shown.
    pub fn is_visible(&self) -> bool {
        self.state.borrow().visible
    }

    /// `Some(visible)` for an existing sheet.
    pub fn is_sheet_visible(&self, name: &str) -> Option<bool> {
        self.state.borrow().sheet(name).ok().map(|s| s.visible)
    }

    /// Path given to the last `save_as`.
    pub fn path(&self) -> Option<String> {
        self.state.borrow().path.clone()
    }

    /// How many times `save` was called.
    pub fn save_count(&self) -> usize {
        self.state.borrow().saves
    }

    /// Macro source attached to a sheet.
    pub fn sheet_code(&self, name: &str) -> Option<String> {
        self.state.borrow().sheet(name).ok().map(|s| s.code.clone())
    }

    /// Number of single-cell reads served so far.
    pub fn cell_reads(&self) -> usize {
        self.state.borrow().probes
    }
}

impl WorkbookAccess for MemoryWorkbook {
    type Sheet = MemorySheet;

    fn sheet_names(&self) -> Result<Vec<String>> {
        Ok(self
            .state
            .borrow()
            .sheets
            .iter()
            .map(|s| s.name.clone())
            .collect())
    }

    fn sheet(&self, name: &str) -> Result<MemorySheet> {
        self.state.borrow().sheet(name)?;
        Ok(MemorySheet {
            state: Rc::clone(&self.state),
            name: name.to_string(),
        })
    }

    fn add_sheet(&self, name: &str) -> Result<MemorySheet> {
        {
            let mut state = self.state.borrow_mut();
            if state.sheet(name).is_ok() {
                return Err(Error::DuplicateSheetName(name.to_string()));
            }
            state.sheets.push(SheetState::new(name));
        }
        self.sheet(name)
    }

    fn set_sheet_visible(&self, name: &str, visible: bool) -> Result<()> {
        self.state.borrow_mut().sheet_mut(name)?.visible = visible;
        Ok(())
    }

    fn add_sheet_macro(&self, sheet: &str, code: &str) -> Result<()> {
        self.state.borrow_mut().sheet_mut(sheet)?.code.push_str(code);
        Ok(())
    }

    fn save(&self) -> Result<()> {
        self.state.borrow_mut().saves += 1;
        Ok(())
    }

    fn save_as(&self, path: &str) -> Result<()> {
        self.state.borrow_mut().path = Some(path.to_string());
        Ok(())
    }

    fn set_visible(&self, visible: bool) -> Result<()> {
        self.state.borrow_mut().visible = visible;
        Ok(())
    }
}

/// Handle to one sheet of a [`MemoryWorkbook`].
#[derive(Debug, Clone)]
pub struct MemorySheet {
    state: Rc<RefCell<BookState>>,
    name: String,
}

impl SheetAccess for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell_value(&self, address: CellAddress) -> Result<CellValue> {
        let mut state = self.state.borrow_mut();
        state.probes += 1;
        Ok(state.sheet(&self.name)?.get(address))
    }

    fn range_values(&self, range: CellRange) -> Result<Matrix> {
        let state = self.state.borrow();
        let sheet = state.sheet(&self.name)?;
        Ok((range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| sheet.get(CellAddress::new(row, col)))
                    .collect()
            })
            .collect())
    }

    fn address_values(&self, address: &str) -> Result<Matrix> {
        self.range_values(CellRange::parse(address)?)
    }

    fn set_range_values(&self, range: CellRange, rows: Matrix) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let sheet = state.sheet_mut(&self.name)?;
        for (addr, value) in range.cells().zip(rows.into_iter().flatten()) {
            sheet.set(addr, value);
        }
        if sheet.tracks_changes() {
            state.record_change(&self.name, range);
        }
        Ok(())
    }
}
