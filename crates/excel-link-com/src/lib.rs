//! Native Linux client library for Excel COM automation via a WINE bridge process.
//!
//! This crate spawns a Windows `.exe` under WINE that automates Excel through COM,
//! communicating over JSON-over-stdio. Its [`Workbook`] and [`Worksheet`]
//! handles implement the capability traits of `excel-link-core`, so the range
//! helpers and the change log work against a live Excel exactly as they do
//! against the in-memory host.
//!
//! # Architecture
//!
//! ```text
//! Your Rust code (native Linux)
//!     └── ExcelBridge (this crate)
//!           └── spawns: wine excel-link-bridge.exe
//!                 └── COM: Excel.Application
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use excel_link_com::{ExcelBridge, ExcelBridgeConfig, OpenOptions};
//! use excel_link_core::{Offset, RangeAccessExt, WorkbookAccess};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = ExcelBridge::start(ExcelBridgeConfig::from_env())?;
//!     let wb = bridge.open(&OpenOptions::new("report.xlsx").create(true))?;
//!     let sheet = wb.sheet("Sheet1")?;
//!     sheet.write_column("A1", vec!["north", "south"], Offset::NONE)?;
//!     let block = sheet.read_block("A1", Offset::NONE, 0)?;
//!     println!("{block:?}");
//!     wb.save()?;
//!     bridge.shutdown()?;
//!     Ok(())
//! }
//! ```

mod bridge;
mod transport;
mod workbook;
mod worksheet;

pub use bridge::{
    linux_to_wine_path, BridgeError, ExcelBridge, ExcelBridgeConfig, ENV_BRIDGE_EXE,
    ENV_TIMEOUT_SECS, ENV_WINE, ENV_WINE_PREFIX,
};
pub use excel_link_protocol::{CellValue, SheetRef};
pub use transport::{ProcessTransport, Transport};
pub use workbook::{OpenOptions, Workbook};
pub use worksheet::Worksheet;
