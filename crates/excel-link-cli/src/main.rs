//! Excel Link CLI - read, write and watch live Excel workbooks

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use excel_link_com::{ExcelBridge, ExcelBridgeConfig, OpenOptions, Workbook};
use excel_link_core::changelog::install_tracker;
use excel_link_core::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "xlink")]
#[command(author, version, about = "Read, write and watch Excel workbooks over a WINE bridge")]
struct Cli {
    #[command(flatten)]
    bridge: BridgeArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where the bridge lives and how long to wait for it.
///
/// Unset flags fall back to `EXCEL_LINK_BRIDGE`, `EXCEL_LINK_WINE`,
/// `WINEPREFIX` and `EXCEL_LINK_TIMEOUT_SECS`; blank variables are ignored.
#[derive(Args, Default)]
struct BridgeArgs {
    /// Path to excel-link-bridge.exe [env: EXCEL_LINK_BRIDGE]
    #[arg(long, global = true)]
    bridge: Option<PathBuf>,

    /// WINE executable [env: EXCEL_LINK_WINE]
    #[arg(long, global = true)]
    wine: Option<PathBuf>,

    /// WINE prefix with Excel installed [env: WINEPREFIX]
    #[arg(long, global = true)]
    wine_prefix: Option<PathBuf>,

    /// Seconds to wait for each bridge response [env: EXCEL_LINK_TIMEOUT_SECS]
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

impl BridgeArgs {
    fn config(&self) -> ExcelBridgeConfig {
        self.apply(ExcelBridgeConfig::from_env())
    }

    /// Flags given on the command line win over `base`.
    fn apply(&self, mut config: ExcelBridgeConfig) -> ExcelBridgeConfig {
        if let Some(bridge) = &self.bridge {
            config.bridge_exe_path = Some(bridge.clone());
        }
        if let Some(wine) = &self.wine {
            config.wine_path = wine.clone();
        }
        if let Some(prefix) = &self.wine_prefix {
            config.wine_prefix = Some(prefix.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// The workbook to operate on.
#[derive(Args)]
struct BookArgs {
    /// Workbook file (xlsx, xlsm, xls)
    book: PathBuf,

    /// Password protecting the workbook
    #[arg(long, env = "EXCEL_LINK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Create the workbook if it cannot be opened
    #[arg(long)]
    create: bool,

    /// Show the Excel window
    #[arg(long)]
    visible: bool,
}

impl BookArgs {
    fn options(&self) -> OpenOptions {
        OpenOptions {
            path: self.book.clone(),
            password: self.password.clone(),
            create: self.create,
            visible: self.visible,
        }
    }
}

/// A starting cell plus an offset from it.
#[derive(Args)]
struct Origin {
    /// Worksheet name
    sheet: String,

    /// Anchor cell, as A1 ("B2") or row,col ("2,2")
    #[arg(value_parser = parse_anchor)]
    anchor: CellAddress,

    /// Rows,cols to move from the anchor
    #[arg(long, default_value = "0,0", value_parser = parse_offset)]
    offset: Offset,
}

#[derive(Clone, Copy, ValueEnum)]
enum WriteShape {
    /// 2-D values at the anchor
    Block,
    /// 1-D values, or a single column, downwards
    Column,
    /// 1-D values, or a single row, rightwards
    Row,
}

#[derive(Subcommand)]
enum Commands {
    /// List worksheet names
    Sheets {
        #[command(flatten)]
        book: BookArgs,
    },

    /// Read a range given as an address ("B2", "A1:C4", "D:D")
    Read {
        #[command(flatten)]
        book: BookArgs,

        /// Worksheet name
        sheet: String,

        /// Range address
        address: String,
    },

    /// Read the block that starts at the anchor, up to the first blank row and column
    ReadBlock {
        #[command(flatten)]
        book: BookArgs,

        #[command(flatten)]
        origin: Origin,

        /// Rows known to be filled below the anchor
        #[arg(long, default_value = "0")]
        height_hint: u32,

        /// Print as a table keyed by the first row
        #[arg(long)]
        table: bool,
    },

    /// Read downwards from the anchor until the first empty cell
    ReadColumn {
        #[command(flatten)]
        book: BookArgs,

        #[command(flatten)]
        origin: Origin,
    },

    /// Read rightwards from the anchor until the first empty cell
    ReadRow {
        #[command(flatten)]
        book: BookArgs,

        #[command(flatten)]
        origin: Origin,
    },

    /// Write JSON values at the anchor
    Write {
        #[command(flatten)]
        book: BookArgs,

        #[command(flatten)]
        origin: Origin,

        /// JSON array, e.g. '[[1,2],[3,4]]' or '["a","b"]'
        values: String,

        /// How to lay the values out
        #[arg(long = "as", value_enum, default_value = "block")]
        shape: WriteShape,

        /// Save the workbook afterwards
        #[arg(long)]
        save: bool,
    },

    /// Install the change tracker on a worksheet and save the workbook
    Track {
        #[command(flatten)]
        book: BookArgs,

        /// Worksheet to track
        sheet: String,
    },

    /// Print the changes recorded since the last poll
    Poll {
        #[command(flatten)]
        book: BookArgs,

        /// Keep polling every N seconds
        #[arg(long)]
        watch: Option<u64>,

        /// Save the workbook after polling so the cleared log persists
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let bridge = &cli.bridge;

    match cli.command {
        Commands::Sheets { book } => with_workbook(bridge, &book, |wb| {
            print_json(&WorkbookAccess::sheet_names(wb)?)
        }),
        Commands::Read {
            book,
            sheet,
            address,
        } => with_workbook(bridge, &book, |wb| {
            let values = wb.sheet(&sheet)?.read_range(&address)?;
            print_json(&values)
        }),
        Commands::ReadBlock {
            book,
            origin,
            height_hint,
            table,
        } => with_workbook(bridge, &book, |wb| {
            let block = wb
                .sheet(&origin.sheet)?
                .read_block(origin.anchor, origin.offset, height_hint)?;
            if table {
                print_json(&Table::from_rows(block)?)
            } else {
                print_json(&block)
            }
        }),
        Commands::ReadColumn { book, origin } => with_workbook(bridge, &book, |wb| {
            print_json(&wb.sheet(&origin.sheet)?.read_column(origin.anchor, origin.offset)?)
        }),
        Commands::ReadRow { book, origin } => with_workbook(bridge, &book, |wb| {
            print_json(&wb.sheet(&origin.sheet)?.read_row(origin.anchor, origin.offset)?)
        }),
        Commands::Write {
            book,
            origin,
            values,
            shape,
            save,
        } => {
            let values = parse_values(&values)?;
            with_workbook(bridge, &book, |wb| {
                let sheet = wb.sheet(&origin.sheet)?;
                match shape {
                    WriteShape::Block => sheet.write_block(origin.anchor, values, origin.offset)?,
                    WriteShape::Column => {
                        sheet.write_column(origin.anchor, values, origin.offset)?
                    }
                    WriteShape::Row => sheet.write_row(origin.anchor, values, origin.offset)?,
                }
                if save {
                    wb.save().context("Failed to save workbook")?;
                }
                Ok(())
            })
        }
        Commands::Track { book, sheet } => {
            if !is_macro_enabled(&book.book) {
                warn!(
                    "{} is not an .xlsm file; Excel will drop the tracker when saving",
                    book.book.display()
                );
            }
            with_workbook(bridge, &book, |wb| {
                ChangeLog::establish(wb)?;
                install_tracker(wb, &sheet).context(
                    "Failed to install the tracker (is VBA project access trusted?)",
                )?;
                wb.save().context("Failed to save workbook")?;
                info!(sheet = %sheet, "tracker installed");
                Ok(())
            })
        }
        Commands::Poll { book, watch, save } => with_workbook(bridge, &book, |wb| {
            let log = ChangeLog::establish(wb)?;
            loop {
                let changes = log.poll()?;
                if save && !changes.is_empty() {
                    wb.save().context("Failed to save workbook")?;
                }
                match watch {
                    None => return print_json(&changes),
                    Some(secs) => {
                        if !changes.is_empty() {
                            println!("{}", serde_json::to_string(&changes)?);
                        }
                        thread::sleep(Duration::from_secs(secs));
                    }
                }
            }
        }),
    }
}

/// Start a session, open the workbook, run `f`, and always shut Excel down.
fn with_workbook<T>(
    bridge: &BridgeArgs,
    book: &BookArgs,
    f: impl FnOnce(&Workbook<'_>) -> Result<T>,
) -> Result<T> {
    let session = ExcelBridge::start(bridge.config()).context("Failed to start the Excel bridge")?;
    let result = session
        .open(&book.options())
        .with_context(|| format!("Failed to open '{}'", book.book.display()))
        .and_then(|wb| f(&wb));
    if let Err(e) = session.shutdown() {
        warn!(error = %e, "Excel did not shut down cleanly");
    }
    result
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn is_macro_enabled(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsm"))
}

fn parse_anchor(s: &str) -> Result<CellAddress, String> {
    match s.split_once(',') {
        Some((row, col)) => {
            let row: u32 = row.trim().parse().map_err(|_| format!("bad row in '{s}'"))?;
            let col: u32 = col.trim().parse().map_err(|_| format!("bad column in '{s}'"))?;
            CellAddress::checked(row, col).map_err(|e| e.to_string())
        }
        None => CellAddress::parse(s).map_err(|e| e.to_string()),
    }
}

fn parse_offset(s: &str) -> Result<Offset, String> {
    let (rows, cols) = s
        .split_once(',')
        .ok_or_else(|| format!("expected rows,cols, got '{s}'"))?;
    let rows = rows.trim().parse().map_err(|_| format!("bad rows in '{s}'"))?;
    let cols = cols.trim().parse().map_err(|_| format!("bad cols in '{s}'"))?;
    Ok(Offset::new(rows, cols))
}

/// A JSON array of rows, or a flat JSON array.
fn parse_values(json: &str) -> Result<Array> {
    if let Ok(rows) = serde_json::from_str::<Matrix>(json) {
        return Ok(Array::Grid(rows));
    }
    match serde_json::from_str::<Vec<CellValue>>(json) {
        Ok(flat) => Ok(Array::Flat(flat)),
        Err(e) => bail!("values must be a JSON array of scalars or of rows: {e}"),
    }
}
