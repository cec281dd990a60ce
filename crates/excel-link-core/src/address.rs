//! Cell address and range types
//!
//! Everything here is 1-indexed to match the host's cell API: `A1` is
//! `(row 1, col 1)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;

/// Convert column letters to a 1-based column number (A = 1, Z = 26, AA = 27).
///
/// Letters are case-insensitive. Anything that is not an ASCII letter is an
/// error.
///
/// # Examples
/// ```
/// use excel_link_core::address::column_letters_to_number;
///
/// assert_eq!(column_letters_to_number("A").unwrap(), 1);
/// assert_eq!(column_letters_to_number("AZ").unwrap(), 52);
/// assert!(column_letters_to_number("A1").is_err());
/// ```
pub fn column_letters_to_number(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::InvalidAddress("empty column letters".into()));
    }

    let mut num: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!(
                "invalid column letter '{c}' in '{letters}'"
            )));
        }
        num = num
            .checked_mul(26)
            .and_then(|n| n.checked_add(letter_value(c)))
            .ok_or_else(|| Error::InvalidAddress(format!("column '{letters}' is too long")))?;
    }
    Ok(num)
}

/// Column conversion that skips anything that is not a letter and returns
/// whatever it accumulated. Empty or letter-free input gives 0.
pub fn column_letters_to_number_lossy(letters: &str) -> u32 {
    letters
        .chars()
        .filter(char::is_ascii_alphabetic)
        .fold(0u32, |num, c| {
            num.wrapping_mul(26).wrapping_add(letter_value(c))
        })
}

fn letter_value(c: char) -> u32 {
    c.to_ascii_uppercase() as u32 - 'A' as u32 + 1
}

/// Convert a 1-based column number to letters (1 = A, 26 = Z, 27 = AA).
///
/// Column 0 has no letters and yields an empty string.
pub fn column_number_to_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        let c = ((n % 26) as u8 + b'A') as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Split a label such as `"B12"` into a 1-based `(row, col)` pair.
///
/// Letters and digits are gathered into separate runs in their original
/// order, wherever they appear, so `"12B"` reads the same as `"B12"`. Any
/// other character is rejected.
pub fn string_address_to_row_col(label: &str) -> Result<(u32, u32)> {
    let mut letters = String::new();
    let mut digits = String::new();

    for c in label.chars() {
        if c.is_ascii_alphabetic() {
            letters.push(c);
        } else if c.is_ascii_digit() {
            digits.push(c);
        } else {
            return Err(Error::InvalidAddress(format!(
                "unexpected character '{c}' in '{label}'"
            )));
        }
    }

    if letters.is_empty() {
        return Err(Error::InvalidAddress(format!(
            "no column letters in '{label}'"
        )));
    }
    if digits.is_empty() {
        return Err(Error::InvalidAddress(format!("no row number in '{label}'")));
    }

    let row: u32 = digits
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{label}'")))?;
    if row == 0 {
        return Err(Error::InvalidAddress(format!(
            "row number must be >= 1 in '{label}'"
        )));
    }

    Ok((row, column_letters_to_number(&letters)?))
}

/// Label split that keeps the historical quirk: characters that are neither
/// letters nor digits are dropped without complaint. Still fails when no
/// digits remain, since there is no row to report.
pub fn string_address_to_row_col_lossy(label: &str) -> Result<(u32, u32)> {
    let letters: String = label.chars().filter(char::is_ascii_alphabetic).collect();
    let digits: String = label.chars().filter(char::is_ascii_digit).collect();

    let row = digits
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("no row number in '{label}'")))?;
    Ok((row, column_letters_to_number_lossy(&letters)))
}

/// An additive `(rows, cols)` adjustment applied to a base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    pub rows: u32,
    pub cols: u32,
}

impl Offset {
    pub const NONE: Offset = Offset { rows: 0, cols: 0 };

    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }
}

impl From<(u32, u32)> for Offset {
    fn from((rows, cols): (u32, u32)) -> Self {
        Self { rows, cols }
    }
}

/// A cell address, 1-indexed (`A1` is row 1, col 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a cell address from A1-style notation.
    ///
    /// # Examples
    /// ```
    /// use excel_link_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("AA100").unwrap();
    /// assert_eq!(addr.row, 100);
    /// assert_eq!(addr.col, 27);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let (row, col) = string_address_to_row_col(s.trim())?;
        Self::checked(row, col)
    }

    /// An address that lies on the sheet: row in `1..=MAX_ROWS`, column in
    /// `1..=MAX_COLS`.
    pub fn checked(row: u32, col: u32) -> Result<Self> {
        if !(1..=MAX_ROWS).contains(&row) {
            return Err(Error::InvalidAddress(format!(
                "row {row} out of bounds (1..={MAX_ROWS})"
            )));
        }
        if !(1..=MAX_COLS).contains(&col) {
            return Err(Error::InvalidAddress(format!(
                "column {col} out of bounds (1..={MAX_COLS})"
            )));
        }
        Ok(Self { row, col })
    }

    /// This address moved by `offset`. Fails if the result is off the sheet.
    pub fn offset_by(self, offset: Offset) -> Result<Self> {
        self.shifted(offset.rows, offset.cols)
    }

    /// This address moved `rows` down and `cols` right.
    pub fn shifted(self, rows: u32, cols: u32) -> Result<Self> {
        match (self.row.checked_add(rows), self.col.checked_add(cols)) {
            (Some(row), Some(col)) => Self::checked(row, col),
            _ => Err(Error::InvalidAddress(format!(
                "{self} moved by ({rows}, {cols}) is off the sheet"
            ))),
        }
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", column_number_to_letters(self.col), self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<(u32, u32)> for CellAddress {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

/// Where an operation starts: a label such as `"B2"` or a `(row, col)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Label(String),
    Position(CellAddress),
}

impl Anchor {
    pub fn resolve(&self) -> Result<CellAddress> {
        match self {
            Anchor::Label(label) => CellAddress::parse(label),
            Anchor::Position(addr) => CellAddress::checked(addr.row, addr.col),
        }
    }
}

impl From<&str> for Anchor {
    fn from(s: &str) -> Self {
        Anchor::Label(s.to_string())
    }
}

impl From<String> for Anchor {
    fn from(s: String) -> Self {
        Anchor::Label(s)
    }
}

impl From<(u32, u32)> for Anchor {
    fn from(pair: (u32, u32)) -> Self {
        Anchor::Position(pair.into())
    }
}

impl From<CellAddress> for Anchor {
    fn from(addr: CellAddress) -> Self {
        Anchor::Position(addr)
    }
}

/// A rectangle of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    /// Start address (top-left)
    pub start: CellAddress,
    /// End address (bottom-right)
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new cell range from any two opposite corners.
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// The `height` x `width` rectangle whose top-left is `top_left`.
    /// Both extents must be at least 1, and the rectangle must fit on the
    /// sheet.
    pub fn from_extent(top_left: CellAddress, height: u32, width: u32) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(Error::InvalidAddress(format!(
                "empty {height}x{width} range at {top_left}"
            )));
        }
        Ok(Self {
            start: top_left,
            end: top_left.shifted(height - 1, width - 1)?,
        })
    }

    /// Parse a range from A1:B10 notation
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        match s.split_once(':') {
            Some((start, end)) => Ok(Self::new(
                CellAddress::parse(start)?,
                CellAddress::parse(end)?,
            )),
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| CellAddress::new(row, col))
        })
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.is_single() {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_column_letters_to_number() {
        assert_eq!(column_letters_to_number("A").unwrap(), 1);
        assert_eq!(column_letters_to_number("Z").unwrap(), 26);
        assert_eq!(column_letters_to_number("AA").unwrap(), 27);
        assert_eq!(column_letters_to_number("AZ").unwrap(), 52);
        assert_eq!(column_letters_to_number("BA").unwrap(), 53);
        assert_eq!(column_letters_to_number("XFD").unwrap(), 16384);

        // Case insensitive
        assert_eq!(column_letters_to_number("ba").unwrap(), 53);
    }

    #[test]
    fn test_column_letters_rejects_non_letters() {
        assert!(column_letters_to_number("").is_err());
        assert!(column_letters_to_number("A-").is_err());
        assert!(column_letters_to_number("Ä").is_err());
        assert!(column_letters_to_number("ZZZZZZZZZZ").is_err());
    }

    #[test]
    fn test_column_letters_lossy_skips_junk() {
        assert_eq!(column_letters_to_number_lossy("A$A"), 27);
        assert_eq!(column_letters_to_number_lossy("12"), 0);
        assert_eq!(column_letters_to_number_lossy(""), 0);
    }

    #[test]
    fn test_column_number_to_letters() {
        assert_eq!(column_number_to_letters(1), "A");
        assert_eq!(column_number_to_letters(26), "Z");
        assert_eq!(column_number_to_letters(27), "AA");
        assert_eq!(column_number_to_letters(52), "AZ");
        assert_eq!(column_number_to_letters(53), "BA");
        assert_eq!(column_number_to_letters(702), "ZZ");
        assert_eq!(column_number_to_letters(703), "AAA");
        assert_eq!(column_number_to_letters(0), "");
    }

    #[test]
    fn test_string_address_to_row_col() {
        assert_eq!(string_address_to_row_col("A1").unwrap(), (1, 1));
        assert_eq!(string_address_to_row_col("B12").unwrap(), (12, 2));
        assert_eq!(string_address_to_row_col("AA100").unwrap(), (100, 27));
        // Runs are collected regardless of position
        assert_eq!(string_address_to_row_col("12B").unwrap(), (12, 2));
    }

    #[test]
    fn test_string_address_errors() {
        assert!(string_address_to_row_col("").is_err());
        assert!(string_address_to_row_col("A").is_err());
        assert!(string_address_to_row_col("1").is_err());
        assert!(string_address_to_row_col("A0").is_err());
        assert!(string_address_to_row_col("$A$1").is_err());
        assert!(string_address_to_row_col("A 1").is_err());
    }

    #[test]
    fn test_lossy_label_drops_unknown_characters() {
        // The quirk: '$' and ' ' vanish instead of being reported.
        assert_eq!(string_address_to_row_col_lossy("$B$12").unwrap(), (12, 2));
        assert_eq!(string_address_to_row_col_lossy("B 1 2").unwrap(), (12, 2));
        // ...and a range collapses into one nonsense cell.
        assert_eq!(string_address_to_row_col_lossy("A1:B2").unwrap(), (12, 28));
        assert!(string_address_to_row_col_lossy("AB").is_err());
    }

    #[test]
    fn test_cell_address_parse() {
        assert_eq!(CellAddress::parse("A1").unwrap(), CellAddress::new(1, 1));
        assert_eq!(CellAddress::parse(" c7 ").unwrap(), CellAddress::new(7, 3));
        assert_eq!(
            CellAddress::parse("XFD1048576").unwrap(),
            CellAddress::new(MAX_ROWS, MAX_COLS)
        );
        assert!(CellAddress::parse("A1048577").is_err());
        assert!(CellAddress::parse("XFE1").is_err());
    }

    #[test]
    fn test_offset_is_additive() {
        let base = CellAddress::new(2, 3);
        assert_eq!(base.offset_by(Offset::NONE).unwrap(), base);
        assert_eq!(base.offset_by((1, 4).into()).unwrap(), CellAddress::new(3, 7));
        assert_eq!(base.offset_by(Offset::new(1, 4)).unwrap().to_string(), "G3");
    }

    #[test]
    fn test_offset_off_the_sheet_is_an_error() {
        let base = CellAddress::new(2, 2);
        assert!(matches!(
            base.offset_by(Offset::new(u32::MAX, 0)),
            Err(Error::InvalidAddress(_))
        ));
        assert!(base.offset_by(Offset::new(0, MAX_COLS)).is_err());
        assert_eq!(
            CellAddress::new(1, 1).offset_by(Offset::new(MAX_ROWS - 1, 0)).unwrap(),
            CellAddress::new(MAX_ROWS, 1)
        );
    }

    #[test]
    fn test_anchor_resolve() {
        assert_eq!(Anchor::from("B2").resolve().unwrap(), CellAddress::new(2, 2));
        assert_eq!(Anchor::from((5, 1)).resolve().unwrap(), CellAddress::new(5, 1));
        assert!(Anchor::from("B").resolve().is_err());
    }

    #[test]
    fn test_pair_anchor_is_bounds_checked_like_a_label() {
        for pair in [(0, 5), (5, 0), (MAX_ROWS + 1, 1), (1, MAX_COLS + 1)] {
            assert!(
                matches!(Anchor::from(pair).resolve(), Err(Error::InvalidAddress(_))),
                "{pair:?} should be rejected"
            );
        }
        assert!(CellAddress::parse("A0").is_err());
    }

    #[test]
    fn test_cell_range_parse_and_display() {
        let range = CellRange::parse("A1:B2").unwrap();
        assert_eq!(range.start, CellAddress::new(1, 1));
        assert_eq!(range.end, CellAddress::new(2, 2));
        assert_eq!(range.to_string(), "A1:B2");

        // Corners are normalized
        let range = CellRange::parse("D4:B2").unwrap();
        assert_eq!(range.to_string(), "B2:D4");
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.col_count(), 3);

        let single = CellRange::parse("C3").unwrap();
        assert!(single.is_single());
        assert_eq!(single.to_string(), "C3");
    }

    #[test]
    fn test_from_extent() {
        let range = CellRange::from_extent(CellAddress::new(2, 2), 3, 1).unwrap();
        assert_eq!(range.to_string(), "B2:B4");
        let range = CellRange::from_extent(CellAddress::new(1, 1), 1, 1).unwrap();
        assert!(range.is_single());
        assert!(CellRange::from_extent(CellAddress::new(1, 1), 0, 1).is_err());
        assert!(CellRange::from_extent(CellAddress::new(MAX_ROWS, 1), 2, 1).is_err());
    }

    #[test]
    fn test_cells_iterate_row_major() {
        let range = CellRange::parse("A1:B2").unwrap();
        let cells: Vec<String> = range.cells().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }

    proptest! {
        #[test]
        fn prop_letters_invert_numbers(col in 1u32..=MAX_COLS) {
            let letters = column_number_to_letters(col);
            prop_assert_eq!(column_letters_to_number(&letters).unwrap(), col);
        }

        #[test]
        fn prop_a1_parses_back(row in 1u32..=MAX_ROWS, col in 1u32..=MAX_COLS) {
            let addr = CellAddress::new(row, col);
            prop_assert_eq!(CellAddress::parse(&addr.to_string()).unwrap(), addr);
        }
    }
}
