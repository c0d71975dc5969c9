//! Utility modules shared by the pipeline stages

pub mod io;
pub mod logging;

// Re-export the most common helpers
pub use io::{TableRecord, read_table, write_table};
pub use logging::{log_stage_complete, log_stage_start};
