//! Error handling for the ETL pipeline.

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::io;

/// Specialized error type for the ETL pipeline.
///
/// Every stage either completes fully or aborts the run with one of these;
/// there is no partial-success path. Missing date parts, vacant group slots
/// and absent uncertainty flags are data facts (nulls), not errors.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// A column required by a stage is absent from the table at that stage
    #[error("schema mismatch in {stage}: column '{column}' not found")]
    SchemaMismatch {
        /// Stage that required the column
        stage: &'static str,
        /// Name of the missing column
        column: String,
    },

    /// A value could not be cast to its declared semantic type
    #[error("type coercion failed for column '{column}': {detail}")]
    TypeCoercion {
        /// Column being cast
        column: String,
        /// What went wrong
        detail: String,
    },

    /// An invalid pipeline parameter, detected before any heavy computation
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from an Arrow kernel or builder
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error writing Parquet data
    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

/// Result type for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;
