//! Schema Normalizer: declared types are enforced, redundant columns are
//! gone, rows come out sorted, and coercion failures are loud.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, Int8Array, StringArray,
    TimestampMillisecondArray};
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use gtd_etl::schema::{COLUMN_TYPES, DROP_COLUMNS, SUBTYPE_COLUMNS, SemanticType, normalize};
use gtd_etl::EtlError;

/// Build a filtered long table the way the upstream stages would shape it:
/// every typed column in its raw (pre-cast) representation, the passthrough
/// columns, and the redundant columns awaiting the drop.
fn prenormalize_batch(rows: usize, overrides: &[(&str, ArrayRef)]) -> RecordBatch {
    let mut fields: Vec<Field> = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for (name, semantic) in COLUMN_TYPES {
        let (data_type, column): (DataType, ArrayRef) = match semantic {
            SemanticType::Category | SemanticType::Text => (
                DataType::Utf8,
                Arc::new(StringArray::from(vec![Some("x"); rows])),
            ),
            SemanticType::Float64 | SemanticType::Int8 => (
                DataType::Float64,
                Arc::new(Float64Array::from(vec![0.0; rows])),
            ),
            SemanticType::Timestamp => (
                DataType::Timestamp(TimeUnit::Millisecond, None),
                Arc::new(TimestampMillisecondArray::from(vec![0i64; rows])),
            ),
        };
        fields.push(Field::new(*name, data_type, true));
        columns.push(column);
    }

    // Passthrough columns the type table deliberately leaves alone.
    fields.push(Field::new("EventID", DataType::Int64, true));
    columns.push(Arc::new(Int64Array::from(vec![1i64; rows])));
    fields.push(Field::new("Year", DataType::Int64, true));
    columns.push(Arc::new(Int64Array::from(vec![2001i64; rows])));
    fields.push(Field::new("GroupClaimed", DataType::Float64, true));
    columns.push(Arc::new(Float64Array::from(vec![0.0; rows])));
    fields.push(Field::new("GroupVerified", DataType::Int8, true));
    columns.push(Arc::new(Int8Array::from(vec![1i8; rows])));

    // Redundant columns awaiting the drop, plus the sub-type detail that
    // only the regional variant retains.
    for name in DROP_COLUMNS {
        fields.push(Field::new(*name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(vec![0.0; rows])));
    }
    for name in SUBTYPE_COLUMNS {
        fields.push(Field::new(*name, DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(vec![Some("x"); rows])));
    }

    for (name, array) in overrides {
        let idx = fields.iter().position(|f| f.name().as_str() == *name).unwrap();
        fields[idx] = Field::new(*name, array.data_type().clone(), true);
        columns[idx] = array.clone();
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
}

fn string_values(batch: &RecordBatch, name: &str) -> Vec<String> {
    let idx = batch.schema().index_of(name).unwrap();
    let as_utf8 = cast(batch.column(idx), &DataType::Utf8).unwrap();
    as_utf8
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .iter()
        .map(|v| v.unwrap().to_string())
        .collect()
}

#[test]
fn every_listed_column_gets_its_declared_type() {
    let out = normalize(&prenormalize_batch(2, &[]), false).unwrap();
    let schema = out.schema();
    for (name, semantic) in COLUMN_TYPES {
        let field = schema.field_with_name(name).unwrap();
        assert_eq!(
            field.data_type(),
            &semantic.arrow_type(),
            "column {name} has the wrong type"
        );
    }
}

#[test]
fn redundant_columns_are_dropped_and_passthroughs_survive() {
    let out = normalize(&prenormalize_batch(2, &[]), false).unwrap();
    let schema = out.schema();
    for name in DROP_COLUMNS.iter().chain(SUBTYPE_COLUMNS) {
        assert!(schema.index_of(name).is_err(), "{name} should be dropped");
    }
    assert_eq!(
        schema.field_with_name("Year").unwrap().data_type(),
        &DataType::Int64
    );
    assert!(schema.index_of("EventID").is_ok());
    assert!(schema.index_of("GroupVerified").is_ok());
}

#[test]
fn rows_are_sorted_by_group_then_event_time() {
    let batch = prenormalize_batch(
        3,
        &[
            (
                "Group",
                Arc::new(StringArray::from(vec![Some("B"), Some("A"), Some("A")])) as ArrayRef,
            ),
            (
                "EventDateTime",
                Arc::new(TimestampMillisecondArray::from(vec![10, 20, 10])) as ArrayRef,
            ),
        ],
    );
    let out = normalize(&batch, false).unwrap();
    assert_eq!(string_values(&out, "Group"), vec!["A", "A", "B"]);

    let ts_idx = out.schema().index_of("EventDateTime").unwrap();
    let ts = out
        .column(ts_idx)
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .unwrap();
    assert_eq!(ts.value(0), 10);
    assert_eq!(ts.value(1), 20);
}

#[test]
fn regional_variant_sorts_by_region_first() {
    let batch = prenormalize_batch(
        3,
        &[
            (
                "Region",
                Arc::new(StringArray::from(vec![Some("S"), Some("N"), Some("N")])) as ArrayRef,
            ),
            (
                "Group",
                Arc::new(StringArray::from(vec![Some("A"), Some("Z"), Some("B")])) as ArrayRef,
            ),
        ],
    );
    let out = normalize(&batch, true).unwrap();
    assert_eq!(string_values(&out, "Region"), vec!["N", "N", "S"]);
    assert_eq!(string_values(&out, "Group"), vec!["B", "Z", "A"]);
}

#[test]
fn regional_variant_keeps_subtype_detail_as_categories() {
    let out = normalize(&prenormalize_batch(2, &[]), true).unwrap();
    let schema = out.schema();
    for name in SUBTYPE_COLUMNS {
        let field = schema.field_with_name(name).unwrap();
        assert_eq!(
            field.data_type(),
            &SemanticType::Category.arrow_type(),
            "column {name} has the wrong type"
        );
    }
}

#[test]
fn uncoercible_values_fail_loudly() {
    let batch = prenormalize_batch(
        1,
        &[(
            "Latitude",
            Arc::new(StringArray::from(vec![Some("not a number")])) as ArrayRef,
        )],
    );
    let err = normalize(&batch, false).unwrap_err();
    assert!(matches!(err, EtlError::TypeCoercion { .. }));
}

#[test]
fn missing_listed_column_is_a_schema_mismatch() {
    let batch = prenormalize_batch(1, &[]);
    let without_group = {
        let idx = batch.schema().index_of("Group").unwrap();
        let keep: Vec<usize> = (0..batch.num_columns()).filter(|&i| i != idx).collect();
        batch.project(&keep).unwrap()
    };
    let err = normalize(&without_group, false).unwrap_err();
    assert!(matches!(err, EtlError::SchemaMismatch { .. }));
}

#[test]
fn empty_input_normalizes_to_an_empty_output() {
    let out = normalize(&prenormalize_batch(0, &[]), false).unwrap();
    assert_eq!(out.num_rows(), 0);
}
