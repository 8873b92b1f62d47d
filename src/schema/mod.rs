//! Schema Normalizer: fixed semantic types, redundant-column drops and the
//! final sort.
//!
//! Every column in the type table is cast to its declared type; a value
//! that cannot be coerced is a fatal `TypeCoercion`, never a silent null.
//! Columns not listed pass through unchanged. The now redundant date parts
//! and raw uncertainty flags are dropped, the sub-type columns go with them
//! in the global dataset (the regional variant keeps them), and the table
//! is sorted for locality on disk.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::kernels::cast::cast_with_options;
use arrow::compute::{CastOptions, SortColumn, SortOptions, lexsort_to_indices, take};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::util::display::FormatOptions;
use log::{info, warn};

use crate::error::{EtlError, Result};
use crate::utils::arrow::{column_by_name, column_index, has_column};

const STAGE: &str = "schema normalizer";

/// Semantic type of an output column.
///
/// Standardizes the handful of shapes the dashboard consumes, each with a
/// single Arrow representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    /// Low-cardinality label, dictionary-encoded
    Category,
    /// 64-bit floating point
    Float64,
    /// Narrow integer flag or small count
    Int8,
    /// Millisecond timestamp
    Timestamp,
    /// Free text
    Text,
}

impl SemanticType {
    /// The Arrow `DataType` this semantic type is stored as.
    #[must_use]
    pub fn arrow_type(self) -> DataType {
        match self {
            SemanticType::Category => {
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
            }
            SemanticType::Float64 => DataType::Float64,
            SemanticType::Int8 => DataType::Int8,
            SemanticType::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, None),
            SemanticType::Text => DataType::Utf8,
        }
    }
}

/// Fixed column -> semantic type table for the final dataset. Columns not
/// listed here (EventID, Year, GroupClaimed, GroupVerified) pass through
/// with whatever type the upstream stages produced.
pub const COLUMN_TYPES: &[(&str, SemanticType)] = &[
    ("Country", SemanticType::Category),
    ("Region", SemanticType::Category),
    ("SubRegion", SemanticType::Category),
    ("City", SemanticType::Category),
    ("Latitude", SemanticType::Float64),
    ("Longitude", SemanticType::Float64),
    ("SpecificLocation", SemanticType::Text),
    ("AttackDetails", SemanticType::Text),
    ("AttackSuccess", SemanticType::Int8),
    ("SuicideAttack", SemanticType::Int8),
    ("AttackType1", SemanticType::Category),
    ("AttackType2", SemanticType::Category),
    ("AttackType3", SemanticType::Category),
    ("TargetType1", SemanticType::Category),
    ("SpecificTarget1", SemanticType::Category),
    ("TargetNationality1", SemanticType::Category),
    ("TargetType2", SemanticType::Category),
    ("SpecificTarget2", SemanticType::Category),
    ("TargetNationality2", SemanticType::Category),
    ("TargetType3", SemanticType::Category),
    ("SpecificTarget3", SemanticType::Category),
    ("TargetNationality3", SemanticType::Category),
    ("Group", SemanticType::Category),
    ("GroupSub", SemanticType::Category),
    ("GroupClaimedMethod", SemanticType::Category),
    ("MotiveDetails", SemanticType::Text),
    ("WeaponType1", SemanticType::Category),
    ("WeaponType2", SemanticType::Category),
    ("WeaponType3", SemanticType::Category),
    ("NVictimsKilled", SemanticType::Float64),
    ("NVictimsWounded", SemanticType::Float64),
    ("Casualties", SemanticType::Float64),
    ("PropertyDamaged", SemanticType::Int8),
    ("PropertyDamagedExtent", SemanticType::Category),
    ("PropertyDamageUSD", SemanticType::Float64),
    ("RansomUSD", SemanticType::Float64),
    ("RansomPaid", SemanticType::Float64),
    ("HostageOrKidnapOutcome", SemanticType::Text),
    ("EventDateTime", SemanticType::Timestamp),
    ("CityCountry", SemanticType::Text),
];

/// Columns merged into derived fields upstream and no longer needed.
pub const DROP_COLUMNS: &[&str] = &[
    "Month",
    "Day",
    "Group1Uncertain",
    "Group2Uncertain",
    "Group3Uncertain",
];

/// Sub-type detail columns. The global dataset drops them; the regional
/// variant keeps them, dictionary-encoded like the other labels.
pub const SUBTYPE_COLUMNS: &[&str] = &[
    "TargetSubType1",
    "TargetSubType2",
    "TargetSubType3",
    "WeaponSubType1",
    "WeaponSubType2",
    "WeaponSubType3",
];

/// Cast, drop and sort the filtered long table into its persisted form.
///
/// Sort keys are `Group` then `EventDateTime` ascending, with `Region`
/// prepended in the regional variant; nulls sort last. Sorting happens
/// before the dictionary cast so the keys compare as plain strings.
pub fn normalize(batch: &RecordBatch, regional: bool) -> Result<RecordBatch> {
    info!("normalizing schema over {} rows", batch.num_rows());

    let dropped = drop_redundant(batch, regional)?;
    let sorted = sort_for_locality(&dropped, regional)?;
    cast_to_semantic_types(&sorted, regional)
}

fn drop_redundant(batch: &RecordBatch, regional: bool) -> Result<RecordBatch> {
    let mut drops: Vec<&str> = DROP_COLUMNS.to_vec();
    if !regional {
        drops.extend_from_slice(SUBTYPE_COLUMNS);
    }
    let schema = batch.schema();
    let keep: Vec<usize> = (0..batch.num_columns())
        .filter(|&i| !drops.contains(&schema.field(i).name().as_str()))
        .collect();
    for name in &drops {
        if !has_column(batch, name) {
            warn!("drop-list column '{name}' already absent");
        }
    }
    Ok(batch.project(&keep)?)
}

fn sort_for_locality(batch: &RecordBatch, regional: bool) -> Result<RecordBatch> {
    if batch.num_rows() == 0 {
        return Ok(batch.clone());
    }

    let mut keys: Vec<&str> = Vec::with_capacity(3);
    if regional {
        keys.push("Region");
    }
    keys.push("Group");
    keys.push("EventDateTime");

    let sort_columns: Vec<SortColumn> = keys
        .iter()
        .map(|key| {
            Ok(SortColumn {
                values: column_by_name(batch, key, STAGE)?,
                options: Some(SortOptions {
                    descending: false,
                    nulls_first: false,
                }),
            })
        })
        .collect::<Result<_>>()?;

    let indices = lexsort_to_indices(&sort_columns, None)?;
    let columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| take(col, &indices, None))
        .collect::<arrow::error::Result<_>>()?;
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}

fn cast_to_semantic_types(batch: &RecordBatch, regional: bool) -> Result<RecordBatch> {
    let options = CastOptions {
        safe: false,
        format_options: FormatOptions::default(),
    };

    let mut typed: Vec<(&str, SemanticType)> = COLUMN_TYPES.to_vec();
    if regional {
        typed.extend(
            SUBTYPE_COLUMNS
                .iter()
                .map(|name| (*name, SemanticType::Category)),
        );
    }

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    for (name, semantic) in &typed {
        let idx = column_index(batch, name, STAGE)?;
        let target = semantic.arrow_type();
        if columns[idx].data_type() == &target {
            continue;
        }
        columns[idx] = cast_with_options(&columns[idx], &target, &options).map_err(|e| {
            EtlError::TypeCoercion {
                column: (*name).to_string(),
                detail: e.to_string(),
            }
        })?;
        fields[idx] = fields[idx].clone().with_data_type(target);
    }

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}
