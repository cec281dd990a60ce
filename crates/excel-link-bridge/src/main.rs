//! Excel Link Bridge: drives a live Excel through COM on behalf of the Linux
//! client, which talks to it over stdio.
//!
//! Built for `x86_64-pc-windows-gnu` and launched under WINE. Each stdin
//! line is one JSON `Request`; each stdout line is the matching `Response`.
//! stdout carries nothing else, so diagnostics go to stderr.

#[cfg(windows)]
mod dispatch;
#[cfg(windows)]
mod excel;

#[cfg(not(windows))]
fn main() {
    eprintln!("excel-link-bridge must be compiled for Windows (--target x86_64-pc-windows-gnu)");
    eprintln!("and run under WINE on Linux.");
    std::process::exit(1);
}

#[cfg(windows)]
macro_rules! note {
    ($($arg:tt)*) => {
        eprintln!("[excel-link-bridge] {}", format_args!($($arg)*))
    };
}

#[cfg(windows)]
fn main() {
    use std::io::{self, BufRead, Write};

    use excel_link_protocol::{Command, Request, Response};

    note!("starting");
    let mut session = Session::default();
    let mut out = io::stdout().lock();

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                note!("stdin read error: {e}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // An unparseable request has no id to echo, so the reply uses 0
        let (response, quit) = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                let result = session.handle(&request.command);
                let quit = matches!(request.command, Command::Shutdown) && result.is_ok();
                (Response::from_result(request.id, result), quit)
            }
            Err(e) => {
                note!("bad request {line:?}: {e}");
                (Response::error(0, format!("JSON parse error: {e}")), false)
            }
        };

        match serde_json::to_string(&response) {
            Ok(json) => {
                let _ = writeln!(out, "{json}").and_then(|()| out.flush());
            }
            Err(e) => note!("could not encode response: {e}"),
        }
        if quit {
            break;
        }
    }

    session.close();
    note!("exiting");
}

/// The Excel instance, created by `Init` and released by `Shutdown` or when
/// stdin closes.
#[cfg(windows)]
#[derive(Default)]
struct Session {
    excel: Option<excel::ExcelApp>,
}

#[cfg(windows)]
type Outcome = Result<Option<excel_link_protocol::ResponseData>, String>;

#[cfg(windows)]
impl Session {
    fn handle(&mut self, command: &excel_link_protocol::Command) -> Outcome {
        use excel_link_protocol::{Command, ResponseData};

        let done = |()| None;
        let opened = |workbook| Some(ResponseData::WorkbookHandle { workbook });

        match command {
            Command::Init => self.init().map(done),
            Command::Shutdown => self.shutdown().map(done),
            Command::CreateWorkbook => self.app()?.create_workbook().map(opened),
            Command::OpenWorkbook { path, password } => self
                .app()?
                .open_workbook(path, password.as_deref())
                .map(opened),
            Command::SaveWorkbook { workbook } => self.app()?.save_workbook(*workbook).map(done),
            Command::SaveWorkbookAs { workbook, path } => {
                self.app()?.save_workbook_as(*workbook, path).map(done)
            }
            Command::CloseWorkbook { workbook } => self.app()?.close_workbook(*workbook).map(done),
            Command::SetVisible { visible } => self.app()?.set_visible(*visible).map(done),
            Command::ListSheets { workbook } => {
                let sheets = self.app()?.list_sheets(*workbook)?;
                Ok(Some(ResponseData::SheetNames { sheets }))
            }
            Command::AddSheet { workbook, name } => {
                self.app()?.add_sheet(*workbook, name).map(done)
            }
            Command::SetSheetVisible {
                workbook,
                sheet,
                visible,
            } => self
                .app()?
                .set_sheet_visible(*workbook, sheet, *visible)
                .map(done),
            Command::GetRangeValues {
                workbook,
                sheet,
                range,
            } => {
                let values = self.app()?.get_range_values(*workbook, sheet, range)?;
                Ok(Some(ResponseData::Values { values }))
            }
            Command::SetRangeValues {
                workbook,
                sheet,
                range,
                values,
            } => self
                .app()?
                .set_range_values(*workbook, sheet, range, values)
                .map(done),
            Command::AddSheetMacro {
                workbook,
                sheet,
                code,
            } => self.app()?.add_sheet_macro(*workbook, sheet, code).map(done),
        }
    }

    fn app(&mut self) -> Result<&mut excel::ExcelApp, String> {
        self.excel
            .as_mut()
            .ok_or_else(|| "Excel not initialized. Send 'Init' command first.".to_string())
    }

    /// COM in a single-threaded apartment, then `Excel.Application`.
    /// Repeated `Init`s are no-ops.
    fn init(&mut self) -> Result<(), String> {
        use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

        if self.excel.is_some() {
            return Ok(());
        }
        unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }
            .ok()
            .map_err(|e| format!("CoInitializeEx failed: {e}"))?;
        note!("COM initialized (STA)");

        let app = excel::ExcelApp::new()
            .map_err(|e| format!("Failed to create Excel.Application: {e}"))?;
        note!("Excel.Application created");
        self.excel = Some(app);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), String> {
        let Some(app) = self.excel.take() else {
            return Ok(());
        };
        app.shutdown().map_err(|e| format!("Shutdown failed: {e}"))?;
        uninit_com();
        Ok(())
    }

    /// Quit Excel if the client went away without `Shutdown`.
    fn close(mut self) {
        if self.excel.is_some() {
            note!("stdin closed, shutting down Excel");
            if let Err(e) = self.shutdown() {
                note!("{e}");
            }
        }
    }
}

#[cfg(windows)]
fn uninit_com() {
    unsafe {
        windows::Win32::System::Com::CoUninitialize();
    }
    note!("COM uninitialized");
}
