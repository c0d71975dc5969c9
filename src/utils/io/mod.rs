//! IO utilities for file operations
//!
//! This module provides utilities for reading and writing CLIF tables and
//! derived artefacts as Parquet files.

pub mod parquet;

// Re-export commonly used functions for convenience
pub use parquet::{
    TableRecord, from_record_batch, read_optional_table, read_parquet, read_table,
    read_table_from_dir, table_path, to_record_batch, validate_directory, write_parquet,
    write_table,
};
