//! Write inputs and their shape validation.

use crate::error::{ShapeError, ShapeErrorKind};
use crate::value::{CellValue, Matrix};

/// Values handed to a write operation, either one- or two-dimensional.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    /// A plain sequence of values
    Flat(Vec<CellValue>),
    /// Rows of values
    Grid(Matrix),
}

impl Array {
    /// The dimensions of this input.
    ///
    /// A grid whose rows are not all the same length has no rectangular
    /// shape and reports as one-dimensional `[rows]`.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Array::Flat(values) => vec![values.len()],
            Array::Grid(rows) => match rectangular_width(rows) {
                Some(width) => vec![rows.len(), width],
                None => vec![rows.len()],
            },
        }
    }

    /// Validate as a range or block: must already be two-dimensional.
    pub fn into_grid(self) -> Result<Matrix, ShapeError> {
        let shape = self.shape();
        match self {
            Array::Grid(rows) if shape.len() == 2 => Ok(rows),
            _ => Err(ShapeError::new(ShapeErrorKind::NotTwoDimensional, shape)),
        }
    }

    /// Validate as a column: one-dimensional input becomes `N x 1`, then the
    /// second dimension must be 1. Input with no cells passes unchanged.
    pub fn into_column(self) -> Result<Matrix, ShapeError> {
        let rows = match self {
            Array::Flat(values) => values.into_iter().map(|v| vec![v]).collect(),
            grid => grid.into_grid().map_err(|e| e.with_kind(ShapeErrorKind::NotAColumn))?,
        };
        let shape = matrix_shape(&rows);
        if shape[1] != 1 && !is_empty(&shape) {
            return Err(ShapeError::new(ShapeErrorKind::NotAColumn, shape));
        }
        Ok(rows)
    }

    /// Validate as a row: one-dimensional input becomes `1 x N`, then the
    /// first dimension must be 1. Input with no cells passes unchanged.
    pub fn into_row(self) -> Result<Matrix, ShapeError> {
        let rows = match self {
            Array::Flat(values) => vec![values],
            grid => grid.into_grid().map_err(|e| e.with_kind(ShapeErrorKind::NotARow))?,
        };
        let shape = matrix_shape(&rows);
        if shape[0] != 1 && !is_empty(&shape) {
            return Err(ShapeError::new(ShapeErrorKind::NotARow, shape));
        }
        Ok(rows)
    }
}

impl ShapeError {
    fn with_kind(mut self, kind: ShapeErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

fn rectangular_width(rows: &[Vec<CellValue>]) -> Option<usize> {
    let width = rows.first().map_or(0, Vec::len);
    rows.iter().all(|r| r.len() == width).then_some(width)
}

fn is_empty(shape: &[usize]) -> bool {
    shape.contains(&0)
}

/// `[rows, cols]` of a rectangular matrix.
pub(crate) fn matrix_shape(rows: &[Vec<CellValue>]) -> Vec<usize> {
    vec![rows.len(), rows.first().map_or(0, Vec::len)]
}

impl Array {
    /// Build a one-dimensional input from any values.
    pub fn flat<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<CellValue>,
    {
        Array::Flat(values.into_iter().map(Into::into).collect())
    }

    /// Build a two-dimensional input from rows of values.
    pub fn grid<R, I>(rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator,
        I::Item: Into<CellValue>,
    {
        Array::Grid(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

macro_rules! array_from_vecs {
    ($($t:ty),*) => {
        $(
            impl From<Vec<$t>> for Array {
                fn from(values: Vec<$t>) -> Self {
                    Array::flat(values)
                }
            }

            impl From<Vec<Vec<$t>>> for Array {
                fn from(rows: Vec<Vec<$t>>) -> Self {
                    Array::grid(rows)
                }
            }
        )*
    };
}

array_from_vecs!(CellValue, f64, i32, i64, bool, String, &str);

impl<T: Into<CellValue>, const W: usize, const H: usize> From<[[T; W]; H]> for Array {
    fn from(rows: [[T; W]; H]) -> Self {
        Array::Grid(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}
