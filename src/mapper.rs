//! Column Mapper: projects the raw wide table down to the columns the
//! pipeline needs and renames them per the mapping spec.
//!
//! The spec is a two-column table (`ReadCols` = source name, `RenameTo` =
//! target name); both sides are trimmed of surrounding whitespace. Only the
//! listed columns survive, in mapping order; row order is untouched.

use std::path::Path;
use std::sync::Arc;

use arrow::array::Array;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use log::{debug, warn};

use crate::error::{EtlError, Result};
use crate::io;
use crate::utils::arrow::string_column;

const STAGE: &str = "column mapper";

/// Ordered (source, target) column pairs read from the mapping spec.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl ColumnMapping {
    /// Build a mapping from explicit pairs. Used directly by tests; the
    /// pipeline goes through [`ColumnMapping::from_csv`].
    #[must_use]
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Read the mapping spec from a CSV file with `ReadCols` and `RenameTo`
    /// header columns.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let batch = io::read_csv(path, true)?;
        let sources = string_column(&batch, "ReadCols", STAGE)?;
        let targets = string_column(&batch, "RenameTo", STAGE)?;

        let mut pairs = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            if sources.is_null(row) || targets.is_null(row) {
                warn!("mapping spec row {row} has an empty side, skipping");
                continue;
            }
            let source = sources.value(row).trim().to_string();
            let target = targets.value(row).trim().to_string();
            // A re-listed source keeps its original position; the later
            // target overwrites the earlier one.
            if let Some(existing) = pairs.iter_mut().find(|(s, _)| *s == source) {
                warn!("mapping spec lists source column '{source}' twice, keeping the last entry");
                existing.1 = target;
                continue;
            }
            pairs.push((source, target));
        }
        debug!("loaded {} column mappings from {}", pairs.len(), path.display());
        Ok(Self { pairs })
    }

    /// Project the raw table to the mapped columns and rename them.
    ///
    /// # Errors
    /// `SchemaMismatch` if a listed source column is absent from the batch
    pub fn apply(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        let mut fields = Vec::with_capacity(self.pairs.len());
        let mut columns = Vec::with_capacity(self.pairs.len());

        for (source, target) in &self.pairs {
            let idx = schema
                .index_of(source)
                .map_err(|_| EtlError::SchemaMismatch {
                    stage: STAGE,
                    column: source.clone(),
                })?;
            fields.push(schema.field(idx).clone().with_name(target.clone()));
            columns.push(batch.column(idx).clone());
        }

        Ok(RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            columns,
        )?)
    }
}
