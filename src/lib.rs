//! Batch ETL that reshapes the Global Terrorism Database snapshot from an
//! event-centric wide table into a group-centric long table, cleans and
//! types its columns, filters to the top perpetrator groups, and persists
//! the result as Parquet (plus a CSV mirror) for the dashboard to consume.

pub mod config;
pub mod error;
pub mod features;
pub mod filter;
pub mod io;
pub mod longify;
pub mod mapper;
pub mod pipeline;
pub mod schema;
pub mod utils;

// Re-export the most common types for easier use
pub use config::PipelineConfig;
pub use error::{EtlError, Result};
pub use filter::GroupFilterOptions;
pub use mapper::ColumnMapping;
pub use schema::SemanticType;

// Arrow types
pub use arrow::record_batch::RecordBatch;
