//! Log lines for table files and pipeline stages
//!
//! Table files are named by their stem (`clif_vitals`, `sofa_scores`) so a
//! run log reads as a list of CLIF tables consumed and produced.

use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Direction of a table file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableIo {
    /// Loading an input table
    Read,
    /// Writing an output table
    Write,
}

impl fmt::Display for TableIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "Read"),
            Self::Write => write!(f, "Wrote"),
        }
    }
}

/// Table name of a file path, falling back to the full path
fn table_label(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

fn table_io_message(io: TableIo, path: &Path, rows: usize, elapsed: Duration) -> String {
    let preposition = match io {
        TableIo::Read => "from",
        TableIo::Write => "to",
    };
    format!(
        "{io} {rows} rows {preposition} table {} in {elapsed:?}",
        table_label(path)
    )
}

/// Log that a table file is about to be read or written
pub fn log_table_io_start(io: TableIo, path: &Path) {
    let verb = match io {
        TableIo::Read => "Loading",
        TableIo::Write => "Saving",
    };
    log::debug!("{verb} table {} at {}", table_label(path), path.display());
}

/// Log a finished table read or write
///
/// # Arguments
/// * `io` - Whether the table was read or written
/// * `path` - Table file
/// * `rows` - Number of rows transferred
/// * `elapsed` - Time spent on the file
pub fn log_table_io_complete(io: TableIo, path: &Path, rows: usize, elapsed: Duration) {
    log::info!("{}", table_io_message(io, path, rows, elapsed));
}

/// Log the start of a pipeline stage
///
/// # Arguments
/// * `stage` - Stage name
/// * `items` - Number of input items the stage will process
pub fn log_stage_start(stage: &str, items: usize) {
    log::info!("{stage}: processing {items} items");
}

/// Log the completion of a pipeline stage
///
/// # Arguments
/// * `stage` - Stage name
/// * `produced` - Number of output items
/// * `excluded` - Number of input records excluded
/// * `elapsed` - Time spent in the stage
pub fn log_stage_complete(stage: &str, produced: usize, excluded: usize, elapsed: Duration) {
    if excluded > 0 {
        log::info!("{stage}: produced {produced} items in {elapsed:?} ({excluded} records excluded)");
    } else {
        log::info!("{stage}: produced {produced} items in {elapsed:?}");
    }
}

/// Warn that an optional CLIF table has no file and contributes no records
pub fn log_missing_table(table: &str, path: &Path) {
    log::warn!(
        "No {table} table at {}, continuing without {table} records",
        path.display()
    );
}
