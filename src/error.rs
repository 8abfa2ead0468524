//! Error types for the flight-insights library.
//!
//! `InsightsError` covers loading, configuration and input problems.
//! `HandlerError` is the reason a response handler could not produce an
//! envelope; the dispatcher turns it into a backup lookup instead of
//! propagating it.

use thiserror::Error;

/// Errors that can occur while loading data or configuring the application.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column the table cannot be built without is absent from the source
    #[error("Missing required column '{column}' in {table}")]
    MissingColumn {
        /// Table being loaded
        table: &'static str,
        /// Raw column name that was expected
        column: &'static str,
    },

    /// Invalid date format
    #[error("Invalid date '{value}' in column '{column}' (row {row})")]
    InvalidDate {
        /// Column being parsed
        column: &'static str,
        /// 1-based data row
        row: usize,
        /// Offending value
        value: String,
    },

    /// Invalid numeric value in a required column
    #[error("Invalid number '{value}' in column '{column}' (row {row})")]
    InvalidNumber {
        /// Column being parsed
        column: &'static str,
        /// 1-based data row
        row: usize,
        /// Offending value
        value: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Rejected query text
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `InsightsError`
pub type Result<T> = std::result::Result<T, InsightsError>;

impl From<anyhow::Error> for InsightsError {
    fn from(err: anyhow::Error) -> Self {
        InsightsError::Other(err.to_string())
    }
}

/// Why a response handler could not build an envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The aggregation is undefined on an empty source
    #[error("no {what} available to answer this question")]
    EmptySource {
        /// What the handler needed
        what: &'static str,
    },

    /// The backing table was not loaded
    #[error("{what} data is not available")]
    DataUnavailable {
        /// Which dataset is missing
        what: &'static str,
    },

    /// The question asked for an unusable number of entries
    #[error("invalid limit {limit}: {reason}")]
    InvalidLimit {
        /// Limit taken from the question
        limit: usize,
        /// Why it was rejected
        reason: String,
    },
}
