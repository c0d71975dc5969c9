//! Parquet file operations
//!
//! This module reads CLIF tables into typed records and persists intermediate
//! and final artefacts. Record types go through `serde_arrow`; the wide table,
//! whose columns depend on configuration, builds its own batch.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::{Error, Result};
use crate::utils::logging::{
    TableIo, log_missing_table, log_table_io_complete, log_table_io_start,
};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
}

/// A record type stored as one table file
pub trait TableRecord: Serialize + DeserializeOwned {
    /// Table name, used for the `clif_<table>.parquet` file name
    const TABLE_NAME: &'static str;

    /// Arrow fields traced from the record type
    fn fields() -> Result<Vec<FieldRef>> {
        Ok(Vec::<FieldRef>::from_type::<Self>(
            TracingOptions::default().allow_null_fields(true),
        )?)
    }
}

/// Path of a table file inside a directory
#[must_use]
pub fn table_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("clif_{table}.parquet"))
}

/// Validates that a directory exists and is a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", dir.display()),
        )));
    }
    Ok(())
}

/// Read a parquet file into Arrow record batches
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_table_io_start(TableIo::Read, path);

    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE))
        .build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_table_io_complete(TableIo::Read, path, rows, start.elapsed());
    Ok(batches)
}

/// Write record batches to a parquet file, replacing any existing file
pub fn write_parquet(path: &Path, schema: Arc<Schema>, batches: &[RecordBatch]) -> Result<()> {
    let start = std::time::Instant::now();
    log_table_io_start(TableIo::Write, path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    let mut rows = 0;
    for batch in batches {
        writer.write(batch)?;
        rows += batch.num_rows();
    }
    writer.close()?;

    log_table_io_complete(TableIo::Write, path, rows, start.elapsed());
    Ok(())
}

/// Convert typed records into a record batch
pub fn to_record_batch<T: TableRecord>(records: &[T]) -> Result<RecordBatch> {
    let fields = T::fields()?;
    Ok(serde_arrow::to_record_batch(&fields, &records)?)
}

/// Convert a record batch into typed records
///
/// Timestamp columns and integer `*_id` columns are cast to strings first so
/// tables written by other tools deserialize into the record types.
pub fn from_record_batch<T: TableRecord>(batch: &RecordBatch) -> Result<Vec<T>> {
    let batch = adapt_record_batch(batch)?;
    Ok(serde_arrow::from_record_batch::<Vec<T>>(&batch)?)
}

/// Read a table file into typed records
pub fn read_table<T: TableRecord>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(Error::MissingTable {
            table: T::TABLE_NAME.to_string(),
            path: path.display().to_string(),
        });
    }
    let mut records = Vec::new();
    for batch in read_parquet(path)? {
        records.extend(from_record_batch::<T>(&batch)?);
    }
    Ok(records)
}

/// Read a table from a directory using the `clif_<table>.parquet` convention
pub fn read_table_from_dir<T: TableRecord>(dir: &Path) -> Result<Vec<T>> {
    read_table(&table_path(dir, T::TABLE_NAME))
}

/// Read a table if its file exists, otherwise return no records
pub fn read_optional_table<T: TableRecord>(dir: &Path) -> Result<Vec<T>> {
    let path = table_path(dir, T::TABLE_NAME);
    if path.exists() {
        read_table(&path)
    } else {
        log_missing_table(T::TABLE_NAME, &path);
        Ok(Vec::new())
    }
}

/// Write typed records to a table file
pub fn write_table<T: TableRecord>(path: &Path, records: &[T]) -> Result<()> {
    let batch = to_record_batch(records)?;
    write_parquet(path, batch.schema(), &[batch])
}

/// Cast columns that serde cannot read directly into their string form
fn adapt_record_batch(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let needs_adaptation = schema
        .fields()
        .iter()
        .any(|field| target_type(field).is_some());
    if !needs_adaptation {
        return Ok(batch.clone());
    }

    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        match target_type(field) {
            Some(target) => {
                let naive = match field.data_type() {
                    DataType::Timestamp(unit, Some(_)) => {
                        cast(column, &DataType::Timestamp(*unit, None))?
                    }
                    _ => Arc::clone(column),
                };
                columns.push(cast(&naive, &target)?);
                fields.push(Field::new(field.name(), target, field.is_nullable()));
            }
            None => {
                columns.push(Arc::clone(column));
                fields.push(field.as_ref().clone());
            }
        }
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn target_type(field: &Field) -> Option<DataType> {
    match field.data_type() {
        DataType::Timestamp(_, _) => Some(DataType::LargeUtf8),
        DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64
            if field.name().ends_with("_id") =>
        {
            Some(DataType::LargeUtf8)
        }
        _ => None,
    }
}
