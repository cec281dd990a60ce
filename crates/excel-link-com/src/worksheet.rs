//! Worksheet handle backed by range commands.

use excel_link_core::{CellAddress, CellRange, CellValue, Matrix, SheetAccess};
use excel_link_protocol::SheetRef;

use crate::bridge::ExcelBridge;

/// A worksheet inside a bridged workbook, addressed by name.
///
/// Every read and write is one round trip to the bridge. Combine with
/// [`RangeAccessExt`](excel_link_core::RangeAccessExt) for block and
/// column helpers.
#[derive(Clone)]
pub struct Worksheet<'a> {
    bridge: &'a ExcelBridge,
    workbook: u64,
    name: String,
}

impl<'a> Worksheet<'a> {
    pub(crate) fn new(bridge: &'a ExcelBridge, workbook: u64, name: &str) -> Self {
        Self {
            bridge,
            workbook,
            name: name.to_string(),
        }
    }

    fn sheet_ref(&self) -> SheetRef {
        SheetRef::Name(self.name.clone())
    }
}

impl SheetAccess for Worksheet<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell_value(&self, address: CellAddress) -> excel_link_core::Result<CellValue> {
        let rows =
            self.bridge
                .get_range_values(self.workbook, self.sheet_ref(), &address.to_a1_string())?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default())
    }

    fn range_values(&self, range: CellRange) -> excel_link_core::Result<Matrix> {
        Ok(self
            .bridge
            .get_range_values(self.workbook, self.sheet_ref(), &range.to_a1_string())?)
    }

    fn address_values(&self, address: &str) -> excel_link_core::Result<Matrix> {
        Ok(self
            .bridge
            .get_range_values(self.workbook, self.sheet_ref(), address)?)
    }

    fn set_range_values(&self, range: CellRange, rows: Matrix) -> excel_link_core::Result<()> {
        Ok(self.bridge.set_range_values(
            self.workbook,
            self.sheet_ref(),
            &range.to_a1_string(),
            rows,
        )?)
    }
}
