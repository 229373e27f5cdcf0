//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum CriticError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Columns of a dataset have different numbers of transitions.
    #[error("Inconsistent length of {name}: expected {expected}, got {actual}")]
    InconsistentLength {
        /// Name of the offending column.
        name: &'static str,
        /// Number of observations in the dataset.
        expected: usize,
        /// Length of the offending column.
        actual: usize,
    },

    /// A minibatch was requested from a dataset without transitions.
    #[error("Cannot sample a batch from an empty dataset")]
    EmptyDataset,

    /// A network configuration required to build a critic is missing.
    #[error("{0} is not set")]
    MissingConfig(&'static str),
}
