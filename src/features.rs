//! Feature Builder: derived columns and categorical cleanup.
//!
//! Appends `EventDateTime`, `CityCountry`, `Casualties` and the three
//! per-slot `Group{k}Verified` flags, and collapses verbose category labels
//! in the attack/target/weapon type columns to shorter canonical ones. All
//! operations are row-wise and total: bad or missing inputs become nulls,
//! never errors. No rows are added or removed.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, Int8Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use log::info;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::utils::arrow::{numeric_column, string_column};

const STAGE: &str = "feature builder";

/// Attack-type labels collapsed to canonical short forms.
const ATTACK_TYPE_RELABELS: &[(&str, &str)] = &[
    ("Bombing/Explosion", "Bombing"),
    ("Facility/Infrastructure Attack", "Facility/Infra Attack"),
    ("Hostage Taking (Barricade Incident)", "Hostage Taking"),
    ("Hostage Taking (Kidnapping)", "Hostage Taking"),
];

/// Target-type labels collapsed to canonical short forms.
const TARGET_TYPE_RELABELS: &[(&str, &str)] = &[
    ("Airports & Aircraft", "Airport/Aircraft"),
    ("Food or Water Supply", "Food/Water Supply"),
    ("Government (Diplomatic)", "Government"),
    ("Government (General)", "Government"),
    ("Journalists & Media", "Media"),
    ("Private Citizens & Property", "Citizens/Property"),
    ("Religious Figures/Institutions", "Religious Entity"),
    ("Terrorists/Non-State Militia", "Terrorists/Militia"),
];

/// Weapon-type labels collapsed to canonical short forms.
const WEAPON_TYPE_RELABELS: &[(&str, &str)] = &[(
    "Vehicle (not to include vehicle-borne explosives, i.e., car or truck bombs)",
    "Vehicle",
)];

/// Derive all feature columns and apply the category relabels.
pub fn build_features(batch: &RecordBatch) -> Result<RecordBatch> {
    info!("building derived features over {} rows", batch.num_rows());

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    // Collapse near-duplicate category spellings, three slots per family.
    for (family, table) in [
        ("AttackType", ATTACK_TYPE_RELABELS),
        ("TargetType", TARGET_TYPE_RELABELS),
        ("WeaponType", WEAPON_TYPE_RELABELS),
    ] {
        for k in 1..=3 {
            let name = format!("{family}{k}");
            let idx = crate::utils::arrow::column_index(batch, &name, STAGE)?;
            let relabeled = relabel(string_column(batch, &name, STAGE)?, table);
            columns[idx] = Arc::new(relabeled);
        }
    }

    let mut push = |name: &str, data_type: DataType, array: ArrayRef| {
        fields.push(Field::new(name, data_type, true));
        columns.push(array);
    };

    push(
        "EventDateTime",
        DataType::Timestamp(TimeUnit::Millisecond, None),
        Arc::new(event_datetime(batch)?),
    );
    push("CityCountry", DataType::Utf8, Arc::new(city_country(batch)?));
    push(
        "Casualties",
        DataType::Float64,
        Arc::new(casualties(batch)?),
    );
    for k in 1..=3 {
        let uncertain = numeric_column(batch, &format!("Group{k}Uncertain"), STAGE)?;
        push(
            &format!("Group{k}Verified"),
            DataType::Int8,
            Arc::new(verified_flags(&uncertain)),
        );
    }

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}

/// Combined timestamp from the Year/Month/Day parts. Any missing part or an
/// invalid calendar date (GTD uses month/day 0 for "unknown") yields null.
fn event_datetime(batch: &RecordBatch) -> Result<TimestampMillisecondArray> {
    let years = numeric_column(batch, "Year", STAGE)?;
    let months = numeric_column(batch, "Month", STAGE)?;
    let days = numeric_column(batch, "Day", STAGE)?;

    let values: Vec<Option<i64>> = (0..batch.num_rows())
        .map(|row| {
            let (y, m, d) = match (
                value_at(&years, row),
                value_at(&months, row),
                value_at(&days, row),
            ) {
                (Some(y), Some(m), Some(d)) => (y, m, d),
                _ => return None,
            };
            if m < 1.0 || d < 1.0 {
                return None;
            }
            NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .collect();

    Ok(TimestampMillisecondArray::from(values))
}

/// `"{City}, {Country}"`, null when either side is null.
fn city_country(batch: &RecordBatch) -> Result<StringArray> {
    let cities = string_column(batch, "City", STAGE)?;
    let countries = string_column(batch, "Country", STAGE)?;

    let values: Vec<Option<String>> = (0..batch.num_rows())
        .map(|row| {
            if cities.is_null(row) || countries.is_null(row) {
                None
            } else {
                Some(format!("{}, {}", cities.value(row), countries.value(row)))
            }
        })
        .collect();

    Ok(StringArray::from(values))
}

/// Killed plus wounded, null when either count is unknown.
fn casualties(batch: &RecordBatch) -> Result<Float64Array> {
    let killed = numeric_column(batch, "NVictimsKilled", STAGE)?;
    let wounded = numeric_column(batch, "NVictimsWounded", STAGE)?;

    let values: Vec<Option<f64>> = (0..batch.num_rows())
        .map(|row| match (value_at(&killed, row), value_at(&wounded, row)) {
            (Some(k), Some(w)) => Some(k + w),
            _ => None,
        })
        .collect();

    Ok(Float64Array::from(values))
}

/// Truth table for one slot's verified flag: uncertain 0 -> verified 1,
/// uncertain 1 -> verified 0, anything else -> null.
fn verified_flags(uncertain: &Float64Array) -> Int8Array {
    let values: Vec<Option<i8>> = (0..uncertain.len())
        .map(|row| match value_at(uncertain, row) {
            Some(v) if v == 0.0 => Some(1),
            Some(v) if v == 1.0 => Some(0),
            _ => None,
        })
        .collect();
    Int8Array::from(values)
}

/// Rewrite labels through a lookup table; unmapped labels pass through.
fn relabel(column: &StringArray, table: &[(&str, &str)]) -> StringArray {
    let lookup: FxHashMap<&str, &str> = table.iter().copied().collect();
    let values: Vec<Option<&str>> = column
        .iter()
        .map(|v| v.map(|label| *lookup.get(label).unwrap_or(&label)))
        .collect();
    StringArray::from(values)
}

fn value_at(array: &Float64Array, row: usize) -> Option<f64> {
    if array.is_null(row) {
        None
    } else {
        Some(array.value(row))
    }
}
