//! Error types shared by the loader, the spatial index, and the matchers.

use thiserror::Error;

/// Errors that can occur while loading point files or running a matching pass.
///
/// All of these are deterministic functions of the input; nothing is retried
/// and no partial output is written after a failure.
#[derive(Error, Debug)]
pub enum MatchError {
    /// A data row that failed to parse or validate. `row` is the 1-based
    /// index of the data row, not counting the header.
    #[error("malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    /// An operation that requires at least one point was given none.
    #[error("{0} contains no points")]
    EmptyInput(&'static str),

    /// A k-nearest query asked for zero neighbors.
    #[error("neighbor count must be positive")]
    InvalidNeighborCount,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
