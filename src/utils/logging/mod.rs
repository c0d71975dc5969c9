//! Logging utilities for stage output and progress tracking
//!
//! This module provides consistent log lines for pipeline stages and file
//! operations, and progress bars for the per-patient and per-id stages.

pub mod log;
pub mod progress;

// Re-export commonly used functions for convenience
pub use self::log::{
    TableIo, log_missing_table, log_stage_complete, log_stage_start, log_table_io_complete,
    log_table_io_start,
};
pub use progress::{create_stage_progress_bar, finish_progress_bar};
