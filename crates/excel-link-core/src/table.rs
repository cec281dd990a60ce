//! Header-labelled view over a block of rows.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::value::{CellValue, Matrix};

/// Rows of data under a header row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Matrix,
}

impl Table {
    /// Use row 0 as column labels and the remaining rows as data.
    pub fn from_rows(mut rows: Matrix) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyTable);
        }
        let headers = rows.remove(0).iter().map(CellValue::to_string).collect();
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values under the first header equal to `label`. Short rows yield
    /// `Null`.
    pub fn column(&self, label: &str) -> Option<Vec<CellValue>> {
        let idx = self.headers.iter().position(|h| h == label)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or_default())
                .collect(),
        )
    }

    /// Each data row as `(label, value)` pairs.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &CellValue)>> + '_ {
        self.rows.iter().map(move |row| {
            self.headers
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }
}
