//! Shared protocol types for communication between the native Linux client
//! and the Windows COM bridge process running under WINE.
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each direction.
//! Ranges travel as A1-style strings and their values as rows of
//! [`CellValue`]s.

use serde::{Deserialize, Serialize};

pub use excel_link_core::{CellError, CellValue, Matrix};

/// A command sent from the Linux client to the WINE bridge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Initialize COM and create the Excel.Application instance.
    Init,

    /// Create a new empty workbook. Returns a workbook handle.
    CreateWorkbook,

    /// Open an existing workbook from a file path (Windows path).
    OpenWorkbook {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },

    /// Save the workbook to the path it was opened from.
    SaveWorkbook { workbook: u64 },

    /// Save the workbook to a new file path (Windows path).
    /// Format is inferred from extension (.xlsx, .xlsm, .xls, .csv).
    SaveWorkbookAs { workbook: u64, path: String },

    /// Close a workbook without saving.
    CloseWorkbook { workbook: u64 },

    /// Show or hide the application window.
    SetVisible { visible: bool },

    /// Names of every worksheet in tab order.
    ListSheets { workbook: u64 },

    /// Append a worksheet with the given name.
    AddSheet { workbook: u64, name: String },

    /// Show or hide a worksheet tab.
    SetSheetVisible {
        workbook: u64,
        sheet: SheetRef,
        visible: bool,
    },

    /// Read every value in a range (e.g. "B2:D10", or a single cell).
    GetRangeValues {
        workbook: u64,
        sheet: SheetRef,
        range: String,
    },

    /// Overwrite a range. `values` must match the range's extent.
    SetRangeValues {
        workbook: u64,
        sheet: SheetRef,
        range: String,
        values: Matrix,
    },

    /// Append VBA source to a worksheet's code module.
    AddSheetMacro {
        workbook: u64,
        sheet: SheetRef,
        code: String,
    },

    /// Shut down the bridge: close all workbooks, quit Excel, uninitialize COM.
    Shutdown,
}

/// Reference to a worksheet — by 0-based index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(u32),
    Name(String),
}

impl From<&str> for SheetRef {
    fn from(name: &str) -> Self {
        SheetRef::Name(name.to_string())
    }
}

/// A response sent from the WINE bridge back to the Linux client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

impl Response {
    pub fn ok(id: u64, data: Option<ResponseData>) -> Self {
        Self {
            id,
            result: ResponseResult::Ok { data },
        }
    }

    pub fn error(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: ResponseResult::Error {
                message: message.into(),
            },
        }
    }

    /// Reply to request `id` with the outcome of running it.
    pub fn from_result(id: u64, result: Result<Option<ResponseData>, String>) -> Self {
        match result {
            Ok(data) => Self::ok(id, data),
            Err(message) => Self::error(id, message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Data returned in successful responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Handle to a newly created/opened workbook.
    WorkbookHandle { workbook: u64 },
    /// Values of a range, rows outer.
    Values { values: Matrix },
    /// Worksheet names in tab order.
    SheetNames { sheets: Vec<String> },
}
