//! Progress reporting utilities for long-running operations
//!
//! Stages that fan out over patients or cohort ids report progress through
//! `indicatif`. Bars are hidden unless progress display is enabled, so
//! library callers and tests see no terminal output.

use indicatif::{ProgressBar, ProgressStyle};

/// Default style for a stage progress bar
pub const DEFAULT_STAGE_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}) {msg}";

/// Create a progress bar for a stage
///
/// # Arguments
/// * `length` - Number of items the stage processes
/// * `description` - Message displayed next to the bar
/// * `visible` - Whether to draw the bar at all
///
/// # Returns
/// A configured `ProgressBar`, hidden when `visible` is false
#[must_use]
pub fn create_stage_progress_bar(length: u64, description: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(length);
    if let Ok(style) = ProgressStyle::default_bar().template(DEFAULT_STAGE_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(description.to_string());
    pb
}

/// Finish a progress bar with a completion message
///
/// # Arguments
/// * `pb` - The `ProgressBar` to finish
/// * `message` - Optional completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}
