//! Stage orchestration: extract, transform, load.
//!
//! One invocation reads one static snapshot and writes two static output
//! files. Data flows strictly left to right; each stage fully materializes
//! its output before the next begins, and any stage error aborts the run
//! before anything is written.

use log::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::mapper::ColumnMapping;
use crate::{features, filter, io, longify, schema};

/// Run the full pipeline described by `config`.
pub fn run(config: &PipelineConfig) -> Result<()> {
    config.validate()?;

    // Extract
    let mapping = ColumnMapping::from_csv(&config.read_cols_path)?;
    let denylist = io::read_denylist_csv(&config.denylist_path)?;
    let raw = io::read_incidents_csv(&config.incidents_path)?;

    // Transform
    let mapped = mapping.apply(&raw)?;
    let built = features::build_features(&mapped)?;
    let long = longify::longify_by_group(&built)?;
    let options = filter::GroupFilterOptions {
        top_n: config.top_n as usize,
        min_year: config.min_year,
        regional: config.regional,
    };
    let filtered = filter::filter_to_applicable_groups(&long, &denylist, &options)?;
    let normalized = schema::normalize(&filtered, config.regional)?;

    // Load
    io::write_parquet(&config.parquet_out, &normalized)?;
    io::write_csv(&config.csv_out, &normalized)?;

    info!(
        "pipeline complete: {} rows persisted to {} and {}",
        normalized.num_rows(),
        config.parquet_out.display(),
        config.csv_out.display()
    );
    Ok(())
}
