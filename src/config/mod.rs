//! Configuration for a pipeline run.

use std::path::PathBuf;

use crate::error::{EtlError, Result};

/// Everything a single batch run needs, fixed at invocation time.
///
/// There is no other runtime configuration: one input snapshot in, two
/// output files out.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Raw incident table (wide, one row per incident), CSV snapshot
    pub incidents_path: PathBuf,
    /// Column-mapping spec: `ReadCols` / `RenameTo` pairs
    pub read_cols_path: PathBuf,
    /// Headerless single-column list of group names to exclude
    pub denylist_path: PathBuf,
    /// Primary columnar output, consumed by the dashboard
    pub parquet_out: PathBuf,
    /// Delimited mirror of the same table, for human inspection only
    pub csv_out: PathBuf,
    /// Number of top groups to keep (global, or per region when `regional`)
    pub top_n: i64,
    /// Drop rows before this year when set
    pub min_year: Option<i64>,
    /// Rank groups per (Region, Group) instead of globally
    pub regional: bool,
}

impl PipelineConfig {
    /// Check parameters before any heavy computation.
    pub fn validate(&self) -> Result<()> {
        if self.top_n <= 0 {
            return Err(EtlError::Configuration(format!(
                "top-n must be positive, got {}",
                self.top_n
            )));
        }
        Ok(())
    }
}
