//! Range reads and writes on top of a [`SheetAccess`] handle.
//!
//! All positions are 1-indexed. Where an operation takes an offset, it is
//! added to the resolved anchor before anything is touched.

use serde::Serialize;

use crate::address::{Anchor, CellAddress, CellRange, Offset};
use crate::error::Result;
use crate::host::SheetAccess;
use crate::scan::{scan_extent, Axis, Stop};
use crate::shape::Array;
use crate::value::{CellValue, Matrix};

/// What a literal-address read produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RangeValue {
    /// The address named one cell
    Single(CellValue),
    /// Anything larger, rows outer
    Rows(Matrix),
}

impl RangeValue {
    fn from_rows(mut rows: Matrix) -> Self {
        if rows.len() == 1 && rows[0].len() == 1 {
            let mut row = rows.remove(0);
            RangeValue::Single(row.remove(0))
        } else {
            RangeValue::Rows(rows)
        }
    }

    /// Always rows, wrapping a single value as `1 x 1`.
    pub fn into_matrix(self) -> Matrix {
        match self {
            RangeValue::Single(v) => vec![vec![v]],
            RangeValue::Rows(rows) => rows,
        }
    }
}

/// Range-level operations available on every sheet handle.
pub trait RangeAccessExt: SheetAccess {
    /// Write a 2-D array starting at the top-left cell of `address`.
    fn write_range(&self, address: &str, values: impl Into<Array>) -> Result<()> {
        let rows = values.into().into_grid()?;
        let top_left = CellRange::parse(address)?.start;
        write_matrix(self, top_left, rows)
    }

    /// Write a 2-D array whose top-left lands on `top_left + offset`.
    fn write_block(
        &self,
        top_left: impl Into<Anchor>,
        block: impl Into<Array>,
        offset: impl Into<Offset>,
    ) -> Result<()> {
        let start = top_left.into().resolve()?.offset_by(offset.into())?;
        let rows = block.into().into_grid()?;
        write_matrix(self, start, rows)
    }

    /// Write a column. A 1-D input of N values is written as N x 1.
    fn write_column(
        &self,
        top_left: impl Into<Anchor>,
        column: impl Into<Array>,
        offset: impl Into<Offset>,
    ) -> Result<()> {
        let start = top_left.into().resolve()?.offset_by(offset.into())?;
        let rows = column.into().into_column()?;
        write_matrix(self, start, rows)
    }

    /// Write a row. A 1-D input of N values is written as 1 x N.
    fn write_row(
        &self,
        top_left: impl Into<Anchor>,
        row: impl Into<Array>,
        offset: impl Into<Offset>,
    ) -> Result<()> {
        let start = top_left.into().resolve()?.offset_by(offset.into())?;
        let rows = row.into().into_row()?;
        write_matrix(self, start, rows)
    }

    /// Read exactly what the host returns for `address`.
    fn read_range(&self, address: &str) -> Result<RangeValue> {
        Ok(RangeValue::from_rows(self.address_values(address)?))
    }

    /// The run of non-empty cells going down from `top + offset`.
    ///
    /// Only a truly empty cell ends the run; an empty string does not.
    /// At least one cell is always included.
    fn column_range(&self, top: impl Into<Anchor>, offset: impl Into<Offset>) -> Result<CellRange> {
        let start = top.into().resolve()?.offset_by(offset.into())?;
        let height = scan_extent(self, start, Axis::Down, Stop::Null, 0)?.max(1);
        CellRange::from_extent(start, height, 1)
    }

    /// Values of [`column_range`](Self::column_range), read in one request.
    fn read_column(&self, top: impl Into<Anchor>, offset: impl Into<Offset>) -> Result<Matrix> {
        let range = self.column_range(top, offset)?;
        self.range_values(range)
    }

    /// The run of non-empty cells going right from `left + offset`.
    fn row_range(&self, left: impl Into<Anchor>, offset: impl Into<Offset>) -> Result<CellRange> {
        let start = left.into().resolve()?.offset_by(offset.into())?;
        let width = scan_extent(self, start, Axis::Right, Stop::Null, 0)?.max(1);
        CellRange::from_extent(start, 1, width)
    }

    /// Values of [`row_range`](Self::row_range), read in one request.
    fn read_row(&self, left: impl Into<Anchor>, offset: impl Into<Offset>) -> Result<Matrix> {
        let range = self.row_range(left, offset)?;
        self.range_values(range)
    }

    /// The block whose top-left is `top + offset`.
    ///
    /// Height is found by walking down the first column, width by walking
    /// along the first row; either walk stops at an empty cell or an empty
    /// string. `height_hint` is where the height count starts. It saves host
    /// calls when the block is at least that tall, and yields a block that is
    /// too tall when it is not: the hint is trusted, never checked.
    fn block_range(
        &self,
        top: impl Into<Anchor>,
        offset: impl Into<Offset>,
        height_hint: u32,
    ) -> Result<CellRange> {
        let start = top.into().resolve()?.offset_by(offset.into())?;
        let height = scan_extent(self, start, Axis::Down, Stop::Blank, height_hint)?.max(1);
        let width = scan_extent(self, start, Axis::Right, Stop::Blank, 0)?.max(1);
        tracing::debug!(sheet = self.name(), %start, width, height, "block extent");
        CellRange::from_extent(start, height, width)
    }

    /// Values of [`block_range`](Self::block_range), read in one request.
    fn read_block(
        &self,
        top: impl Into<Anchor>,
        offset: impl Into<Offset>,
        height_hint: u32,
    ) -> Result<Matrix> {
        let range = self.block_range(top, offset, height_hint)?;
        self.range_values(range)
    }
}

impl<S: SheetAccess + ?Sized> RangeAccessExt for S {}

fn write_matrix<S>(sheet: &S, top_left: CellAddress, rows: Matrix) -> Result<()>
where
    S: SheetAccess + ?Sized,
{
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, Vec::len) as u32;
    if height == 0 || width == 0 {
        tracing::debug!(sheet = sheet.name(), %top_left, "nothing to write");
        return Ok(());
    }

    let range = CellRange::from_extent(top_left, height, width)?;
    tracing::trace!(sheet = sheet.name(), %range, "writing range");
    sheet.set_range_values(range, rows)
}
