//! Change tracking through a hidden `logs` sheet.
//!
//! A VBA `Worksheet_Change` handler, installed per sheet, appends
//! `<sheetName>-<address>` to `logs!A1` whenever a user edits that sheet,
//! separating entries with commas. [`ChangeLog::poll`] reads the list and
//! clears the cell, so there must only ever be one reader.

use serde::{Deserialize, Serialize};

use crate::access::RangeAccessExt;
use crate::address::{CellAddress, CellRange, Offset};
use crate::error::{Error, Result};
use crate::host::{SheetAccess, WorkbookAccess};
use crate::value::CellValue;

/// Name of the hidden sheet that carries the log.
pub const LOG_SHEET: &str = "logs";

/// Handler injected into a sheet's code module.
pub const TRACKER_MACRO: &str = r#"
Public Sub Worksheet_Change(ByVal target As Range)
    If Worksheets("logs").Range("A1").Value <> "" Then
        Worksheets("logs").Range("A1").Value = Worksheets("logs").Range("A1").Value & ","
    End If
    Worksheets("logs").Range("A1").Value = Worksheets("logs").Range("A1").Value & target.Parent.Name & "-" & target.Address(0, 0)
End Sub
"#;

/// One edit reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub sheet: String,
    /// Address as the application printed it (`"B2"`, `"A1:C3"`, `"D:D"`)
    pub range: String,
}

impl Change {
    pub fn new(sheet: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            range: range.into(),
        }
    }
}

/// Split the log text into changes, oldest first.
///
/// Each entry is split at its last `-`, since addresses never contain one
/// but sheet names may. Blank text yields no changes.
pub fn parse_entries(text: &str) -> Result<Vec<Change>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(',')
        .map(|entry| match entry.rsplit_once('-') {
            Some((sheet, range)) if !sheet.is_empty() && !range.is_empty() => {
                Ok(Change::new(sheet, range))
            }
            _ => Err(Error::MalformedChange(entry.to_string())),
        })
        .collect()
}

/// The log text after the tracker records `range` on `sheet`, given the
/// current contents of `logs!A1`. Hosts that emulate the macro use this.
pub fn append_entry(current: &CellValue, sheet: &str, range: CellRange) -> String {
    let mut text = if current.is_blank() {
        String::new()
    } else {
        format!("{current},")
    };
    text.push_str(sheet);
    text.push('-');
    text.push_str(&range.to_a1_string());
    text
}

/// Reader for the `logs` sheet.
pub struct ChangeLog<S: SheetAccess> {
    sheet: S,
}

impl<S: SheetAccess> ChangeLog<S> {
    /// Find the `logs` sheet, or add it and hide it.
    pub fn establish<B>(book: &B) -> Result<Self>
    where
        B: WorkbookAccess<Sheet = S>,
    {
        let sheet = if book.has_sheet(LOG_SHEET)? {
            book.sheet(LOG_SHEET)?
        } else {
            tracing::info!("creating hidden '{LOG_SHEET}' sheet for change tracking");
            let sheet = book.add_sheet(LOG_SHEET)?;
            book.set_sheet_visible(LOG_SHEET, false)?;
            sheet
        };
        Ok(Self { sheet })
    }

    /// Use an already opened log sheet.
    pub fn attach(sheet: S) -> Self {
        Self { sheet }
    }

    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    /// Take every change recorded since the last poll.
    pub fn poll(&self) -> Result<Vec<Change>> {
        let text = match self.sheet.cell_value(CellAddress::new(1, 1))? {
            CellValue::Null => return Ok(Vec::new()),
            CellValue::String(s) if s.is_empty() => return Ok(Vec::new()),
            other => other.to_string(),
        };

        let changes = parse_entries(&text)?;
        self.clear()?;
        tracing::debug!(count = changes.len(), "polled change log");
        Ok(changes)
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) -> Result<()> {
        self.sheet.write_row("A1", vec![""], Offset::NONE)
    }
}

/// Attach the change tracker to `sheet` so its edits show up in the log.
///
/// Adding the handler twice to the same module is rejected by the
/// application, so call this once per sheet.
pub fn install_tracker<B: WorkbookAccess>(book: &B, sheet: &str) -> Result<()> {
    tracing::info!(sheet, "installing change tracker");
    book.add_sheet_macro(sheet, TRACKER_MACRO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_entries() {
        assert_eq!(
            parse_entries("Sheet1-A1,Data-B2:C3").unwrap(),
            vec![Change::new("Sheet1", "A1"), Change::new("Data", "B2:C3")]
        );
        assert!(parse_entries("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sheet_name_with_dash() {
        assert_eq!(
            parse_entries("Q1-2024-D4").unwrap(),
            vec![Change::new("Q1-2024", "D4")]
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_entries("Sheet1A1"),
            Err(Error::MalformedChange(e)) if e == "Sheet1A1"
        ));
        assert!(parse_entries("Sheet1-A1,").is_err());
        assert!(parse_entries("-A1").is_err());
    }

    #[test]
    fn test_append_entry() {
        let b2 = CellRange::parse("B2").unwrap();
        assert_eq!(append_entry(&CellValue::Null, "S", b2), "S-B2");
        assert_eq!(append_entry(&CellValue::from(""), "S", b2), "S-B2");
        assert_eq!(append_entry(&CellValue::from("S-A1"), "S", b2), "S-A1,S-B2");
    }
}
