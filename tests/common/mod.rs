//! Shared builders for test record batches.
//!
//! `wide_batch` produces a mapped-and-renamed incident table carrying every
//! column the pipeline expects after the Column Mapper, with boring default
//! values; tests override the columns they care about.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;

/// Columns that arrive as integers from the snapshot.
pub const INT_COLUMNS: &[&str] = &["EventID", "Year", "Month", "Day"];

/// Columns that arrive as floating point (counts, coordinates, 0/1 flags).
pub const FLOAT_COLUMNS: &[&str] = &[
    "Latitude",
    "Longitude",
    "AttackSuccess",
    "SuicideAttack",
    "Group1Claimed",
    "Group2Claimed",
    "Group3Claimed",
    "Group1Uncertain",
    "Group2Uncertain",
    "Group3Uncertain",
    "IsUnaffiliatedIndividual",
    "NVictimsKilled",
    "NVictimsWounded",
    "PropertyDamaged",
    "PropertyDamageUSD",
    "RansomUSD",
    "RansomPaid",
];

/// Columns that arrive as text.
pub const STRING_COLUMNS: &[&str] = &[
    "Country",
    "Region",
    "SubRegion",
    "City",
    "SpecificLocation",
    "AttackDetails",
    "AttackType1",
    "AttackType2",
    "AttackType3",
    "TargetType1",
    "TargetType2",
    "TargetType3",
    "TargetSubType1",
    "TargetSubType2",
    "TargetSubType3",
    "SpecificTarget1",
    "SpecificTarget2",
    "SpecificTarget3",
    "TargetNationality1",
    "TargetNationality2",
    "TargetNationality3",
    "Group1",
    "Group2",
    "Group3",
    "GroupSub1",
    "GroupSub2",
    "GroupSub3",
    "Group1ClaimedMethod",
    "Group2ClaimedMethod",
    "Group3ClaimedMethod",
    "MotiveDetails",
    "WeaponType1",
    "WeaponType2",
    "WeaponType3",
    "WeaponSubType1",
    "WeaponSubType2",
    "WeaponSubType3",
    "PropertyDamagedExtent",
    "HostageOrKidnapOutcome",
];

/// Build a mapped wide incident table with `rows` rows of defaults, then
/// replace any column named in `overrides`.
///
/// Defaults: integer columns hold 1 (except `Year`, which holds 2001),
/// float columns hold 0.0, string columns hold "x" except the slot 2/3
/// group names, which default to vacant (null).
pub fn wide_batch(rows: usize, overrides: &[(&str, ArrayRef)]) -> RecordBatch {
    let mut fields: Vec<Field> = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for &name in INT_COLUMNS {
        let default: i64 = if name == "Year" { 2001 } else { 1 };
        fields.push(Field::new(
            name,
            arrow::datatypes::DataType::Int64,
            true,
        ));
        columns.push(Arc::new(Int64Array::from(vec![default; rows])));
    }
    for &name in FLOAT_COLUMNS {
        fields.push(Field::new(
            name,
            arrow::datatypes::DataType::Float64,
            true,
        ));
        columns.push(Arc::new(Float64Array::from(vec![0.0; rows])));
    }
    for &name in STRING_COLUMNS {
        fields.push(Field::new(name, arrow::datatypes::DataType::Utf8, true));
        let default: Vec<Option<&str>> = if name == "Group2" || name == "Group3" {
            vec![None; rows]
        } else {
            vec![Some("x"); rows]
        };
        columns.push(Arc::new(StringArray::from(default)));
    }

    for (name, array) in overrides {
        let idx = fields
            .iter()
            .position(|f| f.name().as_str() == *name)
            .unwrap_or_else(|| panic!("override names unknown column '{name}'"));
        fields[idx] = Field::new(*name, array.data_type().clone(), true);
        columns[idx] = array.clone();
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
}

/// Shorthand for a nullable string override column.
pub fn strings(values: Vec<Option<&str>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

/// Shorthand for a nullable float override column.
pub fn floats(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

/// Shorthand for a nullable integer override column.
pub fn ints(values: Vec<Option<i64>>) -> ArrayRef {
    Arc::new(Int64Array::from(values))
}
