//! Utilities for working with Arrow record batches.
//!
//! Column lookup, downcasting and mask filtering shared by every pipeline
//! stage. Lookups fail with a stage-identifying `SchemaMismatch` so a run
//! aborts with a message naming where the column went missing.

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::compute::filter as arrow_filter;
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::{EtlError, Result};

/// Get the column index by name from a record batch
///
/// # Errors
/// Returns `SchemaMismatch` if the column does not exist
pub fn column_index(batch: &RecordBatch, name: &str, stage: &'static str) -> Result<usize> {
    batch
        .schema()
        .index_of(name)
        .map_err(|_| EtlError::SchemaMismatch {
            stage,
            column: name.to_string(),
        })
}

/// Get a column from a record batch by name
pub fn column_by_name(batch: &RecordBatch, name: &str, stage: &'static str) -> Result<ArrayRef> {
    let idx = column_index(batch, name, stage)?;
    Ok(batch.column(idx).clone())
}

/// Get a column as a string array, failing with a clear message otherwise
pub fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    stage: &'static str,
) -> Result<&'a StringArray> {
    let idx = column_index(batch, name, stage)?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| EtlError::TypeCoercion {
            column: name.to_string(),
            detail: format!(
                "expected a Utf8 column in {stage}, found {}",
                batch.column(idx).data_type()
            ),
        })
}

/// Read a column as `Float64`, widening whatever numeric width the CSV
/// inference produced. Values that do not widen become null, which the
/// callers treat as "unknown" rather than as an error.
pub fn numeric_column(
    batch: &RecordBatch,
    name: &str,
    stage: &'static str,
) -> Result<Float64Array> {
    let column = column_by_name(batch, name, stage)?;
    let widened = cast(&column, &DataType::Float64).map_err(|e| EtlError::TypeCoercion {
        column: name.to_string(),
        detail: format!("cannot widen {} to Float64: {e}", column.data_type()),
    })?;
    let array = widened
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| EtlError::TypeCoercion {
            column: name.to_string(),
            detail: "widened column is not Float64".to_string(),
        })?;
    Ok(array.clone())
}

/// Filter a record batch down to the rows where `mask` is true.
///
/// # Errors
/// Returns an error if the mask length does not match the batch row count
pub fn filter_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(EtlError::Arrow(arrow::error::ArrowError::ComputeError(
            format!(
                "mask length ({}) does not match batch row count ({})",
                mask.len(),
                batch.num_rows()
            ),
        )));
    }

    let filtered: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| arrow_filter(col, mask))
        .collect::<arrow::error::Result<_>>()?;

    Ok(RecordBatch::try_new(batch.schema(), filtered)?)
}

/// Drop one column from a batch by name, keeping everything else in order.
pub fn drop_column(batch: &RecordBatch, name: &str, stage: &'static str) -> Result<RecordBatch> {
    let drop_idx = column_index(batch, name, stage)?;
    let keep: Vec<usize> = (0..batch.num_columns()).filter(|&i| i != drop_idx).collect();
    Ok(batch.project(&keep)?)
}

/// Whether the batch carries a column with this name.
pub fn has_column(batch: &RecordBatch, name: &str) -> bool {
    batch.schema().index_of(name).is_ok()
}
