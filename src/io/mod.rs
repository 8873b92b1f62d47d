//! File boundary: CSV in, Parquet and CSV out.
//!
//! The raw snapshot, the mapping spec and the denylist are all consumed as
//! CSV. Each is read once per run into a fully materialized record batch;
//! outputs are written only after the whole transform has succeeded, so a
//! failed run leaves no partial files behind.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::Result;
use crate::utils::arrow::string_column;

const BATCH_SIZE: usize = 8192;

/// Read a CSV file into a single record batch, inferring the schema from
/// the full file so late-file values cannot contradict the inferred types.
pub fn read_csv(path: &Path, has_header: bool) -> Result<RecordBatch> {
    info!("reading {}", path.display());
    let mut file = File::open(path)?;
    let format = Format::default().with_header(has_header);
    let (schema, _) = format.infer_schema(&mut file, None)?;
    file.rewind()?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(has_header)
        .with_batch_size(BATCH_SIZE)
        .build(file)?;

    let batches: Vec<RecordBatch> = reader.collect::<arrow::error::Result<_>>()?;
    let combined = concat_batches(&schema, &batches)?;
    info!(
        "read {} rows x {} columns from {}",
        combined.num_rows(),
        combined.num_columns(),
        path.display()
    );
    Ok(combined)
}

/// Read the raw incident snapshot (wide table, header row).
pub fn read_incidents_csv(path: &Path) -> Result<RecordBatch> {
    read_csv(path, true)
}

/// Read the group denylist: a headerless, single-column file of names.
pub fn read_denylist_csv(path: &Path) -> Result<Vec<String>> {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "Group",
        DataType::Utf8,
        true,
    )]));
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(false)
        .with_batch_size(BATCH_SIZE)
        .build(File::open(path)?)?;
    let batches: Vec<RecordBatch> = reader.collect::<arrow::error::Result<_>>()?;
    let combined = concat_batches(&schema, &batches)?;

    let names = string_column(&combined, "Group", "denylist reader")?;
    let denylist: Vec<String> = names
        .iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    info!("denylist holds {} group names", denylist.len());
    Ok(denylist)
}

/// Write the primary columnar output. No row-index column is emitted; the
/// batch's own columns are the whole contract.
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    info!("wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}

/// Write the delimited mirror of the final table, for human inspection.
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    info!("wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}
