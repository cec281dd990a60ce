//! A bridge stand-in that answers protocol requests from a thread owning
//! in-memory workbooks.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use excel_link_com::{BridgeError, SheetRef, Transport};
use excel_link_core::memory::{MemorySheet, MemoryWorkbook};
use excel_link_core::{CellRange, SheetAccess, WorkbookAccess};
use excel_link_protocol::{Command, Request, Response, ResponseData};

/// A file the fake Excel can open.
pub struct StoredFile {
    pub sheets: Vec<&'static str>,
    pub password: Option<&'static str>,
}

struct FakeExcel {
    files: HashMap<String, (MemoryWorkbook, Option<String>)>,
    books: HashMap<u64, MemoryWorkbook>,
    next_handle: u64,
    visible: bool,
}

impl FakeExcel {
    fn book(&self, handle: u64) -> Result<&MemoryWorkbook, String> {
        self.books
            .get(&handle)
            .ok_or_else(|| format!("Invalid workbook handle: {handle}"))
    }

    fn sheet(&self, handle: u64, sheet: &SheetRef) -> Result<MemorySheet, String> {
        let book = self.book(handle)?;
        let name = match sheet {
            SheetRef::Name(name) => name.clone(),
            SheetRef::Index(i) => book
                .sheet_names()
                .map_err(|e| e.to_string())?
                .get(*i as usize)
                .cloned()
                .ok_or_else(|| format!("No sheet at index {i}"))?,
        };
        book.sheet(&name).map_err(|e| e.to_string())
    }

    fn register(&mut self, book: MemoryWorkbook) -> Option<ResponseData> {
        self.next_handle += 1;
        self.books.insert(self.next_handle, book);
        Some(ResponseData::WorkbookHandle {
            workbook: self.next_handle,
        })
    }

    fn handle(&mut self, command: Command) -> Result<Option<ResponseData>, String> {
        match command {
            Command::Init | Command::Shutdown => Ok(None),
            Command::CreateWorkbook => Ok(self.register(MemoryWorkbook::new())),
            Command::OpenWorkbook { path, password } => {
                let (book, expected) = self
                    .files
                    .get(&path)
                    .ok_or_else(|| format!("Sorry, we couldn't find {path}"))?;
                if expected.is_some() && *expected != password {
                    return Err("The password you supplied is not correct".into());
                }
                let book = book.clone();
                Ok(self.register(book))
            }
            Command::SaveWorkbook { workbook } => {
                self.book(workbook)?.save().map_err(|e| e.to_string())?;
                Ok(None)
            }
            Command::SaveWorkbookAs { workbook, path } => {
                let book = self.book(workbook)?.clone();
                book.save_as(&path).map_err(|e| e.to_string())?;
                self.files.insert(path, (book, None));
                Ok(None)
            }
            Command::CloseWorkbook { workbook } => {
                self.books.remove(&workbook);
                Ok(None)
            }
            Command::SetVisible { visible } => {
                self.visible = visible;
                Ok(None)
            }
            Command::ListSheets { workbook } => Ok(Some(ResponseData::SheetNames {
                sheets: self.book(workbook)?.sheet_names().map_err(|e| e.to_string())?,
            })),
            Command::AddSheet { workbook, name } => {
                self.book(workbook)?
                    .add_sheet(&name)
                    .map_err(|e| e.to_string())?;
                Ok(None)
            }
            Command::SetSheetVisible {
                workbook,
                sheet,
                visible,
            } => {
                let name = self.sheet(workbook, &sheet)?.name().to_string();
                self.book(workbook)?
                    .set_sheet_visible(&name, visible)
                    .map_err(|e| e.to_string())?;
                Ok(None)
            }
            Command::GetRangeValues {
                workbook,
                sheet,
                range,
            } => Ok(Some(ResponseData::Values {
                values: self
                    .sheet(workbook, &sheet)?
                    .address_values(&range)
                    .map_err(|e| e.to_string())?,
            })),
            Command::SetRangeValues {
                workbook,
                sheet,
                range,
                values,
            } => {
                let range = CellRange::parse(&range).map_err(|e| e.to_string())?;
                self.sheet(workbook, &sheet)?
                    .set_range_values(range, values)
                    .map_err(|e| e.to_string())?;
                Ok(None)
            }
            Command::AddSheetMacro {
                workbook,
                sheet,
                code,
            } => {
                let name = self.sheet(workbook, &sheet)?.name().to_string();
                self.book(workbook)?
                    .add_sheet_macro(&name, &code)
                    .map_err(|e| e.to_string())?;
                Ok(None)
            }
        }
    }
}

/// Client half of the loopback.
pub struct Loopback {
    requests: Sender<String>,
    responses: Receiver<String>,
    commands: Arc<Mutex<Vec<String>>>,
    visible: Arc<Mutex<bool>>,
}

impl Loopback {
    pub fn spawn(files: Vec<(&'static str, StoredFile)>) -> Self {
        let (requests, server_rx) = mpsc::channel::<String>();
        let (server_tx, responses) = mpsc::channel::<String>();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let visible = Arc::new(Mutex::new(false));
        let (log, shown) = (Arc::clone(&commands), Arc::clone(&visible));

        thread::spawn(move || {
            let mut excel = FakeExcel {
                files: files
                    .into_iter()
                    .map(|(path, file)| {
                        let book = MemoryWorkbook::with_sheets(&file.sheets);
                        (path.to_string(), (book, file.password.map(str::to_string)))
                    })
                    .collect(),
                books: HashMap::new(),
                next_handle: 0,
                visible: false,
            };

            for line in server_rx {
                let request: Request = match serde_json::from_str(&line) {
                    Ok(request) => request,
                    Err(e) => {
                        let response = Response::error(0, format!("Invalid request: {e}"));
                        let _ = server_tx.send(serde_json::to_string(&response).unwrap());
                        continue;
                    }
                };
                let name = serde_json::to_value(&request.command).unwrap()["cmd"]
                    .as_str()
                    .unwrap()
                    .to_string();
                let shutdown = name == "Shutdown";
                log.lock().unwrap().push(name);

                let response = match excel.handle(request.command) {
                    Ok(data) => Response::ok(request.id, data),
                    Err(message) => Response::error(request.id, message),
                };
                *shown.lock().unwrap() = excel.visible;
                if server_tx
                    .send(serde_json::to_string(&response).unwrap())
                    .is_err()
                    || shutdown
                {
                    break;
                }
            }
        });

        Self {
            requests,
            responses,
            commands,
            visible,
        }
    }

    /// A view of what the server has seen, usable after the loopback was
    /// moved into a bridge.
    pub fn records(&self) -> Records {
        Records {
            commands: Arc::clone(&self.commands),
            visible: Arc::clone(&self.visible),
        }
    }
}

pub struct Records {
    commands: Arc<Mutex<Vec<String>>>,
    visible: Arc<Mutex<bool>>,
}

impl Records {
    /// Names of the handled commands, oldest first.
    pub fn recorded(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Whether the application window is currently shown.
    pub fn is_visible(&self) -> bool {
        *self.visible.lock().unwrap()
    }
}

impl Transport for Loopback {
    fn send_line(&mut self, line: &str) -> Result<(), BridgeError> {
        self.requests
            .send(line.to_string())
            .map_err(|_| BridgeError::NotRunning)
    }

    fn recv_line(&mut self) -> Result<String, BridgeError> {
        self.responses.recv().map_err(|_| BridgeError::NotRunning)
    }
}
