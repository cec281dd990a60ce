//! Session management and JSON IPC with the WINE bridge process.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use excel_link_protocol::{
    Command as BridgeCommand, Matrix, Request, Response, ResponseData, ResponseResult, SheetRef,
};
use tracing::{debug, info, warn};

use crate::transport::{ProcessTransport, Transport};
use crate::workbook::{OpenOptions, Workbook};

/// Errors from the Excel COM bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to spawn WINE bridge process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Bridge process I/O error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Bridge process not running")]
    NotRunning,

    #[error("Failed to send command to bridge: {0}")]
    SendFailed(String),

    #[error("Failed to read response from bridge: {0}")]
    ReadFailed(String),

    #[error("No response from bridge within {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Bridge returned error: {0}")]
    BridgeError(String),

    #[error("Unexpected response data")]
    UnexpectedResponse,

    #[error("Response id {got} does not match request id {expected}")]
    IdMismatch { expected: u64, got: u64 },

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("WINE not found. Install WINE and ensure 'wine' is in PATH.")]
    WineNotFound,

    #[error("Bridge executable not found at: {0}")]
    BridgeExeNotFound(String),
}

impl From<BridgeError> for excel_link_core::Error {
    fn from(err: BridgeError) -> Self {
        excel_link_core::Error::host(err)
    }
}

/// Environment variable naming the bridge executable.
pub const ENV_BRIDGE_EXE: &str = "EXCEL_LINK_BRIDGE";
/// Environment variable naming the WINE executable.
pub const ENV_WINE: &str = "EXCEL_LINK_WINE";
/// Environment variable selecting the WINE prefix.
pub const ENV_WINE_PREFIX: &str = "WINEPREFIX";
/// Environment variable overriding the response timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "EXCEL_LINK_TIMEOUT_SECS";

/// Configuration for the Excel COM bridge.
#[derive(Debug, Clone)]
pub struct ExcelBridgeConfig {
    /// Path to the `excel-link-bridge.exe` Windows executable.
    /// If None, will search in common locations relative to the current binary.
    pub bridge_exe_path: Option<PathBuf>,

    /// Path to the WINE executable. Defaults to "wine".
    pub wine_path: PathBuf,

    /// Optional WINEPREFIX to use (for isolating the WINE environment).
    pub wine_prefix: Option<PathBuf>,

    /// Timeout for waiting for bridge responses.
    pub timeout: Duration,
}

impl Default for ExcelBridgeConfig {
    fn default() -> Self {
        Self {
            bridge_exe_path: None,
            wine_path: PathBuf::from("wine"),
            wine_prefix: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ExcelBridgeConfig {
    /// Defaults overlaid with `EXCEL_LINK_BRIDGE`, `EXCEL_LINK_WINE`,
    /// `WINEPREFIX` and `EXCEL_LINK_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    /// Empty values and unparsable timeouts are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(exe) = get(ENV_BRIDGE_EXE) {
            config.bridge_exe_path = Some(PathBuf::from(exe));
        }
        if let Some(wine) = get(ENV_WINE) {
            config.wine_path = PathBuf::from(wine);
        }
        if let Some(prefix) = get(ENV_WINE_PREFIX) {
            config.wine_prefix = Some(PathBuf::from(prefix));
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            match secs.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %secs, "ignoring invalid {ENV_TIMEOUT_SECS}"),
            }
        }
        config
    }
}

/// The main handle for communicating with the Excel COM bridge.
///
/// One value is one automation session: it owns the transport to a single
/// `Excel.Application` and every [`Workbook`] borrows from it. Requests are
/// strictly one at a time.
pub struct ExcelBridge {
    transport: Mutex<Box<dyn Transport>>,
    next_id: AtomicU64,
}

impl ExcelBridge {
    /// Start the bridge process and initialize Excel.
    pub fn start(config: ExcelBridgeConfig) -> Result<Self, BridgeError> {
        let transport = ProcessTransport::spawn(&config)?;
        let bridge = Self::with_transport(transport)?;
        info!("Excel session started");
        Ok(bridge)
    }

    /// Run a session over an already connected transport. Sends `Init`.
    pub fn with_transport(transport: impl Transport + 'static) -> Result<Self, BridgeError> {
        let bridge = Self {
            transport: Mutex::new(Box::new(transport)),
            next_id: AtomicU64::new(1),
        };
        bridge.send_command(BridgeCommand::Init)?;
        Ok(bridge)
    }

    /// Send a command to the bridge and wait for the response.
    fn send_command(&self, command: BridgeCommand) -> Result<Option<ResponseData>, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request { id, command };
        let json = serde_json::to_string(&request)?;
        debug!(id, request = %json, "bridge request");

        let line = {
            let mut transport = self.transport.lock().unwrap_or_else(PoisonError::into_inner);
            transport.send_line(&json)?;
            transport.recv_line()?
        };

        let response: Response = serde_json::from_str(&line)?;
        match response.result {
            // Errors for unparsable requests come back with id 0
            ResponseResult::Error { message } => Err(BridgeError::BridgeError(message)),
            ResponseResult::Ok { .. } if response.id != id => Err(BridgeError::IdMismatch {
                expected: id,
                got: response.id,
            }),
            ResponseResult::Ok { data } => Ok(data),
        }
    }

    fn expect_workbook(&self, data: Option<ResponseData>) -> Result<Workbook<'_>, BridgeError> {
        match data {
            Some(ResponseData::WorkbookHandle { workbook }) => Ok(Workbook::new(self, workbook)),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    /// Create a new empty workbook.
    pub fn create_workbook(&self) -> Result<Workbook<'_>, BridgeError> {
        let data = self.send_command(BridgeCommand::CreateWorkbook)?;
        self.expect_workbook(data)
    }

    /// Open an existing workbook from a file path.
    ///
    /// The path should be a Windows-style path as seen by WINE.
    /// Use [`linux_to_wine_path`] to convert if needed.
    pub fn open_workbook(
        &self,
        path: &str,
        password: Option<&str>,
    ) -> Result<Workbook<'_>, BridgeError> {
        let data = self.send_command(BridgeCommand::OpenWorkbook {
            path: path.to_string(),
            password: password.map(str::to_string),
        })?;
        self.expect_workbook(data)
    }

    /// Open the workbook at `options.path` (a Linux path).
    ///
    /// If opening fails for any reason and `options.create` is set, a new
    /// workbook is created and saved to that path instead.
    pub fn open(&self, options: &OpenOptions) -> Result<Workbook<'_>, BridgeError> {
        let wine_path = linux_to_wine_path(&options.path);
        let workbook = match self.open_workbook(&wine_path, options.password.as_deref()) {
            Ok(workbook) => workbook,
            Err(err) if options.create => {
                warn!(path = %wine_path, error = %err, "could not open workbook, creating a new one");
                let workbook = self.create_workbook()?;
                workbook.save_as_raw_path(&wine_path)?;
                workbook
            }
            Err(err) => return Err(err),
        };
        if options.visible {
            self.set_visible(true)?;
        }
        Ok(workbook)
    }

    /// Show or hide the Excel application window.
    pub fn set_visible(&self, visible: bool) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::SetVisible { visible })?;
        Ok(())
    }

    /// Shut down the bridge: close all workbooks, quit Excel, and terminate the process.
    pub fn shutdown(self) -> Result<(), BridgeError> {
        if let Err(err) = self.send_command(BridgeCommand::Shutdown) {
            debug!(error = %err, "shutdown command failed");
        }
        let mut transport = self
            .transport
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        transport.close()?;
        info!("Excel session closed");
        Ok(())
    }

    // -- Internal methods used by Workbook and Worksheet --

    pub(crate) fn save_workbook(&self, workbook: u64) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::SaveWorkbook { workbook })?;
        Ok(())
    }

    pub(crate) fn save_workbook_as(&self, workbook: u64, path: &str) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::SaveWorkbookAs {
            workbook,
            path: path.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn close_workbook(&self, workbook: u64) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::CloseWorkbook { workbook })?;
        Ok(())
    }

    pub(crate) fn list_sheets(&self, workbook: u64) -> Result<Vec<String>, BridgeError> {
        match self.send_command(BridgeCommand::ListSheets { workbook })? {
            Some(ResponseData::SheetNames { sheets }) => Ok(sheets),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn add_sheet(&self, workbook: u64, name: &str) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::AddSheet {
            workbook,
            name: name.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn set_sheet_visible(
        &self,
        workbook: u64,
        sheet: SheetRef,
        visible: bool,
    ) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::SetSheetVisible {
            workbook,
            sheet,
            visible,
        })?;
        Ok(())
    }

    pub(crate) fn add_sheet_macro(
        &self,
        workbook: u64,
        sheet: SheetRef,
        code: &str,
    ) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::AddSheetMacro {
            workbook,
            sheet,
            code: code.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn get_range_values(
        &self,
        workbook: u64,
        sheet: SheetRef,
        range: &str,
    ) -> Result<Matrix, BridgeError> {
        let data = self.send_command(BridgeCommand::GetRangeValues {
            workbook,
            sheet,
            range: range.to_string(),
        })?;
        match data {
            Some(ResponseData::Values { values }) => Ok(values),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn set_range_values(
        &self,
        workbook: u64,
        sheet: SheetRef,
        range: &str,
        values: Matrix,
    ) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::SetRangeValues {
            workbook,
            sheet,
            range: range.to_string(),
            values,
        })?;
        Ok(())
    }
}

/// Convert a Linux filesystem path to a WINE (Windows) path.
///
/// WINE maps `/` to `Z:\`, so `/home/user/file.xlsx` becomes `Z:\home\user\file.xlsx`.
/// Relative paths are resolved against the current directory first.
pub fn linux_to_wine_path(linux_path: &Path) -> String {
    let abs = if linux_path.is_absolute() {
        linux_path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(linux_path)
    };

    format!("Z:{}", abs.display()).replace('/', "\\")
}

/// Attempt to locate the bridge exe relative to the current executable or in common paths.
pub(crate) fn find_bridge_exe() -> PathBuf {
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        let candidate = exe.join("excel-link-bridge.exe");
        if candidate.exists() {
            return candidate;
        }
    }

    for profile in ["release", "debug"] {
        let target_path = PathBuf::from(format!(
            "target/x86_64-pc-windows-gnu/{profile}/excel-link-bridge.exe"
        ));
        if target_path.exists() {
            return target_path;
        }
    }

    PathBuf::from("excel-link-bridge.exe")
}
