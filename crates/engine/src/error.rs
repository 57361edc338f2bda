//! Error types for sheet mutations.
//!
//! These are the hard failures: the mutation is rejected and the sheet is
//! left exactly as it was. Evaluation problems (`#REF!`, `#VALUE!`,
//! `#DIV/0!`) are ordinary values, see [`crate::value::ErrorKind`].

use thiserror::Error;

use crate::position::Position;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    #[error("invalid position {0}")]
    InvalidPosition(Position),

    #[error("formula syntax error: {0}")]
    FormulaSyntax(String),

    #[error("circular dependency through {0}")]
    CircularDependency(Position),
}

/// A1 name that is not a valid cell name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid cell name: {0:?}")]
pub struct ParsePositionError(pub String);

pub type Result<T> = std::result::Result<T, SheetError>;
