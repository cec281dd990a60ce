//! Error types for excel-link-core

use std::fmt;

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error raised by an automation backend.
pub type HostError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in excel-link-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Input array has the wrong shape for the requested write
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Sheet name already exists in the workbook
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// A change-log entry is not of the form `<sheet>-<range>`
    #[error("Malformed change-log entry: {0:?}")]
    MalformedChange(String),

    /// Tabular conversion needs at least a header row
    #[error("Cannot build a table from an empty matrix")]
    EmptyTable,

    /// Failure reported by the automation backend, passed through as-is
    #[error("{0}")]
    Host(#[source] HostError),
}

impl Error {
    /// Wrap a backend error without altering it.
    pub fn host<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Host(Box::new(err))
    }

    /// Returns the shape error, if this is one.
    pub fn as_shape(&self) -> Option<&ShapeError> {
        match self {
            Error::Shape(e) => Some(e),
            _ => None,
        }
    }
}

/// Which shape rule an input array broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeErrorKind {
    /// Range and block writes need a 2-D input
    NotTwoDimensional,
    /// Column writes need the second dimension to be 1
    NotAColumn,
    /// Row writes need the first dimension to be 1
    NotARow,
}

impl ShapeErrorKind {
    fn message(self) -> &'static str {
        match self {
            ShapeErrorKind::NotTwoDimensional => {
                "Shape must be 2D for ranges, where each inner sequence is a row"
            }
            ShapeErrorKind::NotAColumn => "Columns must be 1D or the second dim must = 1",
            ShapeErrorKind::NotARow => "Rows must be 1D or the first dim must = 1",
        }
    }
}

/// An input array that cannot be written with the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ShapeError {
    pub kind: ShapeErrorKind,
    /// The offending shape, after any reshaping was applied
    pub shape: Vec<usize>,
}

impl ShapeError {
    pub fn new(kind: ShapeErrorKind, shape: Vec<usize>) -> Self {
        Self { kind, shape }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {}", self.shape, self.kind.message())
    }
}
