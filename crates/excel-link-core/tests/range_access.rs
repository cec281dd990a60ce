//! Range reads, writes and block discovery against the in-memory host.

use excel_link_core::memory::{MemorySheet, MemoryWorkbook};
use excel_link_core::prelude::*;
use pretty_assertions::assert_eq;

fn sheet() -> (MemoryWorkbook, MemorySheet) {
    let book = MemoryWorkbook::new();
    let sheet = book.sheet("Sheet1").unwrap();
    (book, sheet)
}

fn n(v: f64) -> CellValue {
    CellValue::Number(v)
}

fn s(v: &str) -> CellValue {
    CellValue::from(v)
}

fn shape_kind(err: Error) -> ShapeErrorKind {
    err.as_shape().expect("expected a shape error").kind
}

#[test]
fn test_write_range_rejects_flat_input() {
    let (_book, sheet) = sheet();
    let err = sheet.write_range("A1", vec![1.0, 2.0, 3.0]).unwrap_err();
    assert_eq!(shape_kind(err), ShapeErrorKind::NotTwoDimensional);
}

#[test]
fn test_write_range_spans_the_matrix() {
    let (_book, sheet) = sheet();
    sheet
        .write_range("B2", vec![vec![1.0, 2.0], vec![3.0, 4.0]])
        .unwrap();
    assert_eq!(
        sheet.read_range("B2:C3").unwrap().into_matrix(),
        vec![vec![n(1.0), n(2.0)], vec![n(3.0), n(4.0)]]
    );
    assert!(sheet.read_range("D2").unwrap() == RangeValue::Single(CellValue::Null));
}

#[test]
fn test_write_range_uses_top_left_of_a_range_address() {
    let (_book, sheet) = sheet();
    sheet.write_range("C3:D4", vec![vec!["x"]]).unwrap();
    assert_eq!(sheet.read_range("C3").unwrap(), RangeValue::Single(s("x")));
    assert_eq!(sheet.read_range("D4").unwrap(), RangeValue::Single(CellValue::Null));
}

#[test]
fn test_write_block_accepts_label_or_pair() {
    let (_book, sheet) = sheet();
    sheet
        .write_block((2, 2), vec![vec!["a", "b"]], Offset::NONE)
        .unwrap();
    sheet
        .write_block("B3", vec![vec!["c", "d"]], Offset::NONE)
        .unwrap();
    assert_eq!(
        sheet.read_range("B2:C3").unwrap(),
        RangeValue::Rows(vec![vec![s("a"), s("b")], vec![s("c"), s("d")]])
    );

    let err = sheet
        .write_block("A1", vec!["flat"], Offset::NONE)
        .unwrap_err();
    assert_eq!(shape_kind(err), ShapeErrorKind::NotTwoDimensional);
}

#[test]
fn test_offset_is_added_to_the_anchor() {
    let (_book, sheet) = sheet();
    sheet.write_block("A1", vec![vec![7.0]], (2, 3)).unwrap();
    assert_eq!(sheet.read_range("D3").unwrap(), RangeValue::Single(n(7.0)));
    assert_eq!(
        sheet.read_block("A1", (2, 3), 0).unwrap(),
        vec![vec![n(7.0)]]
    );
}

#[test]
fn test_write_column() {
    let (_book, sheet) = sheet();
    sheet
        .write_column("A1", vec![1.0, 2.0, 3.0], Offset::NONE)
        .unwrap();
    assert_eq!(
        sheet.read_range("A1:A3").unwrap().into_matrix(),
        vec![vec![n(1.0)], vec![n(2.0)], vec![n(3.0)]]
    );
    assert_eq!(sheet.read_range("B1").unwrap(), RangeValue::Single(CellValue::Null));

    let err = sheet
        .write_column("A1", vec![vec![1.0, 2.0], vec![3.0, 4.0]], Offset::NONE)
        .unwrap_err();
    let shape = err.as_shape().unwrap();
    assert_eq!(shape.kind, ShapeErrorKind::NotAColumn);
    assert_eq!(shape.shape, vec![2, 2]);
}

#[test]
fn test_write_row() {
    let (_book, sheet) = sheet();
    sheet
        .write_row("B1", vec!["x", "y", "z"], Offset::NONE)
        .unwrap();
    assert_eq!(
        sheet.read_range("B1:D1").unwrap().into_matrix(),
        vec![vec![s("x"), s("y"), s("z")]]
    );

    let err = sheet
        .write_row("A1", vec![vec![1, 2], vec![3, 4]], Offset::NONE)
        .unwrap_err();
    assert_eq!(shape_kind(err), ShapeErrorKind::NotARow);
}

#[test]
fn test_empty_write_is_a_no_op() {
    let (_book, sheet) = sheet();
    sheet
        .write_column("A1", Vec::<f64>::new(), Offset::NONE)
        .unwrap();
    sheet.write_row("A1", Vec::<f64>::new(), Offset::NONE).unwrap();
    sheet
        .write_row("A1", Vec::<Vec<f64>>::new(), Offset::NONE)
        .unwrap();
    sheet
        .write_column("A1", Vec::<Vec<f64>>::new(), Offset::NONE)
        .unwrap();
    assert_eq!(sheet.read_range("A1").unwrap(), RangeValue::Single(CellValue::Null));
}

#[test]
fn test_bad_anchor_is_an_address_error() {
    let (_book, sheet) = sheet();
    let err = sheet.read_column("A-1", Offset::NONE).unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)));
}

#[test]
fn test_pair_anchor_off_the_sheet_is_rejected() {
    let (book, sheet) = sheet();
    let err = sheet
        .write_block((0, 0), vec![vec![1.0]], Offset::NONE)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)));
    assert!(matches!(
        sheet.column_range((0, 5), Offset::NONE),
        Err(Error::InvalidAddress(_))
    ));
    assert_eq!(book.cell_reads(), 0);
}

#[test]
fn test_offset_past_the_sheet_edge_is_rejected() {
    let (_book, sheet) = sheet();
    let err = sheet
        .read_column("B2", Offset::new(u32::MAX, 0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)));

    // A block that would spill past the last row is refused before writing
    let err = sheet
        .write_column((1_048_576, 1), vec![1.0, 2.0], Offset::NONE)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)));
    assert_eq!(
        sheet.read_range("A1048576").unwrap(),
        RangeValue::Single(CellValue::Null)
    );
}

#[test]
fn test_scan_ends_at_the_last_row() {
    let (_book, sheet) = sheet();
    sheet
        .write_column("A1048575", vec!["x", "y"], Offset::NONE)
        .unwrap();
    assert_eq!(
        sheet.read_column("A1048575", Offset::NONE).unwrap(),
        vec![vec![s("x")], vec![s("y")]]
    );
}

#[test]
fn test_read_column_stops_at_null_only() {
    let (_book, sheet) = sheet();
    sheet
        .write_column("A1", vec![s("a"), s(""), s("c")], Offset::NONE)
        .unwrap();
    // An empty string does not end a column scan
    assert_eq!(
        sheet.read_column("A1", Offset::NONE).unwrap(),
        vec![vec![s("a")], vec![s("")], vec![s("c")]]
    );
    assert_eq!(
        sheet.column_range("A1", Offset::NONE).unwrap().to_string(),
        "A1:A3"
    );
}

#[test]
fn test_read_row_stops_at_null_only() {
    let (_book, sheet) = sheet();
    sheet
        .write_row("A2", vec![n(1.0), s(""), n(3.0)], Offset::NONE)
        .unwrap();
    sheet.write_row("E2", vec![n(5.0)], Offset::NONE).unwrap();
    assert_eq!(
        sheet.read_row((2, 1), Offset::NONE).unwrap(),
        vec![vec![n(1.0), s(""), n(3.0)]]
    );
}

#[test]
fn test_scan_from_empty_cell_returns_one_cell() {
    let (_book, sheet) = sheet();
    assert_eq!(
        sheet.read_column("C5", Offset::NONE).unwrap(),
        vec![vec![CellValue::Null]]
    );
    assert_eq!(
        sheet.read_row("C5", Offset::NONE).unwrap(),
        vec![vec![CellValue::Null]]
    );
    assert_eq!(
        sheet.read_block("C5", Offset::NONE, 0).unwrap(),
        vec![vec![CellValue::Null]]
    );
}

#[test]
fn test_read_block_stops_at_null_or_empty_string() {
    let (_book, sheet) = sheet();
    sheet
        .write_block(
            "A1",
            vec![
                vec![s("id"), s("name"), s("")],
                vec![n(1.0), s("bolt"), s("ignored")],
                vec![n(2.0), s("nut"), s("ignored")],
                vec![s(""), s("after"), s("")],
            ],
            Offset::NONE,
        )
        .unwrap();

    assert_eq!(
        sheet.block_range("A1", Offset::NONE, 0).unwrap().to_string(),
        "A1:B3"
    );
    assert_eq!(
        sheet.read_block("A1", Offset::NONE, 0).unwrap(),
        vec![
            vec![s("id"), s("name")],
            vec![n(1.0), s("bolt")],
            vec![n(2.0), s("nut")],
        ]
    );
}

#[test]
fn test_read_block_is_idempotent() {
    let (_book, sheet) = sheet();
    sheet
        .write_block("B2", vec![vec![1, 2, 3], vec![4, 5, 6]], Offset::NONE)
        .unwrap();
    let first = sheet.read_block("B2", Offset::NONE, 0).unwrap();
    let second = sheet.read_block("B2", Offset::NONE, 0).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].len(), 3);
}

#[test]
fn test_height_hint_skips_probes() {
    let (book, sheet) = sheet();
    sheet
        .write_column("A1", vec![1, 2, 3, 4, 5], Offset::NONE)
        .unwrap();

    let before = book.cell_reads();
    let unhinted = sheet.read_block("A1", Offset::NONE, 0).unwrap();
    let unhinted_reads = book.cell_reads() - before;

    let before = book.cell_reads();
    let hinted = sheet.read_block("A1", Offset::NONE, 4).unwrap();
    let hinted_reads = book.cell_reads() - before;

    assert_eq!(hinted, unhinted);
    assert_eq!(unhinted_reads, 8);
    assert_eq!(hinted_reads, 4);
}

#[test]
fn test_overstated_height_hint_is_trusted() {
    let (_book, sheet) = sheet();
    sheet
        .write_column("A1", vec!["a", "b"], Offset::NONE)
        .unwrap();

    let block = sheet.read_block("A1", Offset::NONE, 5).unwrap();
    assert_eq!(block.len(), 6);
    assert_eq!(block[0], vec![s("a")]);
    assert!(block[2..].iter().all(|row| row == &vec![CellValue::Null]));
}

#[test]
fn test_read_range_is_not_normalized() {
    let (_book, sheet) = sheet();
    sheet.write_row("A1", vec![1.0, 2.0], Offset::NONE).unwrap();
    assert_eq!(sheet.read_range("A1").unwrap(), RangeValue::Single(n(1.0)));
    assert_eq!(
        sheet.read_range("A1:B1").unwrap(),
        RangeValue::Rows(vec![vec![n(1.0), n(2.0)]])
    );
}
