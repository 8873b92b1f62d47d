//! Group Longifier: the central reshape.
//!
//! The wide table carries three parallel slots of group-attribution columns
//! (`Group1..3` and their sub-fields). This stage emits one row per
//! (incident, occupied slot): for each slot it projects the slot's five
//! columns plus every shared column, strips the slot suffix from the slot
//! columns, drops rows whose `Group` is null (vacant slot), and concatenates
//! the three per-slot tables in slot order with a fresh row index.
//!
//! An incident with zero occupied slots contributes zero rows; that is the
//! intended behavior, not an error. A group named in two slots of the same
//! incident yields two rows and is not deduplicated.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::CastOptions;
use arrow::compute::concat_batches;
use arrow::compute::is_not_null;
use arrow::compute::kernels::cast::cast_with_options;
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::util::display::FormatOptions;
use arrow::record_batch::RecordBatch;
use log::info;

use crate::error::{EtlError, Result};
use crate::utils::arrow::filter_batch;

const STAGE: &str = "group longifier";

/// Canonical group-attribute names, paired with a template producing the
/// slot-k spelling. One declarative table instead of three copied code
/// paths.
const SLOT_ATTRIBUTES: &[(&str, fn(usize) -> String)] = &[
    ("Group", |k| format!("Group{k}")),
    ("GroupSub", |k| format!("GroupSub{k}")),
    ("GroupClaimed", |k| format!("Group{k}Claimed")),
    ("GroupClaimedMethod", |k| format!("Group{k}ClaimedMethod")),
    ("GroupVerified", |k| format!("Group{k}Verified")),
];

/// Suffixed column names for slot `k`, in canonical attribute order.
fn slot_columns(k: usize) -> Vec<String> {
    SLOT_ATTRIBUTES.iter().map(|(_, spell)| spell(k)).collect()
}

/// Reshape the wide table into one row per (incident, occupied group slot).
pub fn longify_by_group(batch: &RecordBatch) -> Result<RecordBatch> {
    let slot_names: Vec<Vec<String>> = (1..=3).map(slot_columns).collect();
    let all_slot_names: Vec<&String> = slot_names.iter().flatten().collect();

    // Shared columns are everything outside the three slot families; they
    // get replicated onto every group row the incident emits.
    let schema = batch.schema();
    let shared: Vec<usize> = (0..batch.num_columns())
        .filter(|&i| {
            let name = schema.field(i).name();
            !all_slot_names.iter().any(|n| *n == name)
        })
        .collect();

    let mut slot_batches = Vec::with_capacity(3);
    let mut canonical: Option<SchemaRef> = None;
    for (slot, names) in slot_names.iter().enumerate() {
        let slot_batch = project_slot(batch, names, &shared, canonical.as_ref())?;
        if canonical.is_none() {
            canonical = Some(slot_batch.schema());
        }
        info!(
            "slot {} contributes {} occupied rows",
            slot + 1,
            slot_batch.num_rows()
        );
        slot_batches.push(slot_batch);
    }

    let canonical = canonical.ok_or_else(|| EtlError::SchemaMismatch {
        stage: STAGE,
        column: "Group1".to_string(),
    })?;
    let long = concat_batches(&canonical, &slot_batches)?;
    info!(
        "longified {} incidents into {} group rows",
        batch.num_rows(),
        long.num_rows()
    );
    Ok(long)
}

/// Project one slot's columns (renamed to canonical) plus the shared
/// columns, then keep only rows where the slot is occupied.
///
/// `canonical` is the schema produced for slot 1; later slots are cast to
/// it so the three tables concatenate even when the raw file inferred
/// different widths per slot.
fn project_slot(
    batch: &RecordBatch,
    slot_names: &[String],
    shared: &[usize],
    canonical: Option<&SchemaRef>,
) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<Field> = Vec::with_capacity(slot_names.len() + shared.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(slot_names.len() + shared.len());

    for ((canonical_name, _), suffixed) in SLOT_ATTRIBUTES.iter().zip(slot_names) {
        let idx = schema
            .index_of(suffixed)
            .map_err(|_| EtlError::SchemaMismatch {
                stage: STAGE,
                column: suffixed.clone(),
            })?;
        let mut column = batch.column(idx).clone();
        let mut field = schema.field(idx).clone().with_name(*canonical_name);
        if let Some(canonical) = canonical {
            let target = canonical.field_with_name(canonical_name)?;
            if target.data_type() != column.data_type() {
                // Non-safe cast: a slot value that does not fit the slot-1
                // type is a fatal mismatch, not a silent null.
                let options = CastOptions {
                    safe: false,
                    format_options: FormatOptions::default(),
                };
                column = cast_with_options(&column, target.data_type(), &options).map_err(
                    |e| EtlError::TypeCoercion {
                        column: suffixed.clone(),
                        detail: format!("slot column does not align with slot 1: {e}"),
                    },
                )?;
                field = field.with_data_type(target.data_type().clone());
            }
        }
        fields.push(field);
        columns.push(column);
    }

    for &idx in shared {
        fields.push(schema.field(idx).clone());
        columns.push(batch.column(idx).clone());
    }

    let projected = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;

    // Vacant slot: the Group value is null.
    let group = crate::utils::arrow::column_by_name(&projected, "Group", STAGE)?;
    let occupied = is_not_null(&group)?;
    filter_batch(&projected, &occupied)
}
