//! Boundary scanning: walk cells one at a time until a terminating value.
//!
//! Each step is a separate host call, so cost grows linearly with the extent
//! being discovered.

use crate::address::CellAddress;
use crate::error::Result;
use crate::host::SheetAccess;
use crate::value::CellValue;

/// Direction of travel from the start cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Increasing row
    Down,
    /// Increasing column
    Right,
}

impl Axis {
    fn step(self, start: CellAddress, n: u32) -> Result<CellAddress> {
        match self {
            Axis::Down => start.shifted(n, 0),
            Axis::Right => start.shifted(0, n),
        }
    }
}

/// Which values end a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Only an empty cell
    Null,
    /// An empty cell or an empty string
    Blank,
}

impl Stop {
    fn matches(self, value: &CellValue) -> bool {
        match self {
            Stop::Null => value.is_null(),
            Stop::Blank => value.is_blank(),
        }
    }
}

/// Count cells along `axis` from `start` until one matches `stop`.
///
/// The count starts at `initial`. The first probe is always `start` itself;
/// after each hit the next probe is `start + count`, so a non-zero `initial`
/// skips ahead instead of re-reading cells the caller claims are filled.
/// The result is not floored: an immediate stop returns `initial`. The walk
/// also ends at the edge of the sheet.
pub fn scan_extent<S>(
    sheet: &S,
    start: CellAddress,
    axis: Axis,
    stop: Stop,
    initial: u32,
) -> Result<u32>
where
    S: SheetAccess + ?Sized,
{
    let mut length = initial;
    let mut cell = start;
    while !stop.matches(&sheet.cell_value(cell)?) {
        length += 1;
        match axis.step(start, length) {
            Ok(next) => cell = next,
            Err(_) => break,
        }
    }

    tracing::debug!(
        sheet = sheet.name(),
        start = %start,
        ?axis,
        length,
        "boundary scan finished"
    );
    Ok(length)
}
