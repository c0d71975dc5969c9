//! Configuration for cohort derivation and scoring
//!
//! A run is described by one JSON document. Every section has defaults, so a
//! minimal file only names the table directory. The whole configuration is
//! validated before any table is read; an inconsistent configuration is a
//! fatal [`Error::Configuration`].

pub mod features;
pub mod outliers;
pub mod sofa;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::cohort::{MAX_SPAN_HOURS, hours_to_duration};

pub use features::{Aggregation, FeatureSpec, FeatureSpecConfig, WideDatasetConfig};
pub use outliers::{OutlierRanges, PlausibleRange};
pub use sofa::SofaConfig;

/// Configuration of the encounter stitcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchingConfig {
    /// Largest gap, in hours, between a discharge and the next admission
    /// that still joins both stays into one block
    pub gap_hours: f64,
    /// Whether to draw a progress bar
    pub show_progress: bool,
}

impl Default for StitchingConfig {
    fn default() -> Self {
        Self {
            gap_hours: 6.0,
            show_progress: false,
        }
    }
}

impl StitchingConfig {
    /// Set the gap threshold
    #[must_use]
    pub fn with_gap_hours(mut self, hours: f64) -> Self {
        self.gap_hours = hours;
        self
    }

    /// Enable or disable the progress bar
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Gap threshold as a duration
    #[must_use]
    pub fn gap(&self) -> Duration {
        hours_to_duration(self.gap_hours)
    }

    /// Check the gap threshold
    pub fn validate(&self) -> Result<()> {
        if !self.gap_hours.is_finite() || self.gap_hours < 0.0 {
            return Err(Error::configuration(format!(
                "stitching gap must be a non-negative number of hours, got {}",
                self.gap_hours
            )));
        }
        if self.gap_hours > MAX_SPAN_HOURS {
            return Err(Error::configuration(format!(
                "stitching gap of {} hours exceeds the {MAX_SPAN_HOURS} hour limit",
                self.gap_hours
            )));
        }
        Ok(())
    }
}

/// Top-level configuration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClifConfig {
    /// Directory holding the `clif_<table>.parquet` files
    pub tables_path: PathBuf,
    /// Directory the derived tables are written to
    pub output_path: PathBuf,
    /// Table file format
    pub file_type: String,
    /// Site timezone, informational; timestamps are read as recorded
    pub timezone: Option<String>,
    /// Worker threads, defaults to the number of CPUs
    pub threads: Option<usize>,
    /// Encounter stitching
    pub stitching: StitchingConfig,
    /// SOFA scoring
    pub sofa: SofaConfig,
}

impl Default for ClifConfig {
    fn default() -> Self {
        Self {
            tables_path: PathBuf::from("."),
            output_path: PathBuf::from("output"),
            file_type: "parquet".to_string(),
            timezone: None,
            threads: None,
            stitching: StitchingConfig::default(),
            sofa: SofaConfig::default(),
        }
    }
}

impl ClifConfig {
    /// Parse and validate a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Set the table directory
    #[must_use]
    pub fn with_tables_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tables_path = path.into();
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Replace the stitching section
    #[must_use]
    pub fn with_stitching(mut self, stitching: StitchingConfig) -> Self {
        self.stitching = stitching;
        self
    }

    /// Replace the SOFA section
    #[must_use]
    pub fn with_sofa(mut self, sofa: SofaConfig) -> Self {
        self.sofa = sofa;
        self
    }

    /// Number of worker threads to use
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.filter(|&n| n > 0).unwrap_or_else(num_cpus::get)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        if !self.file_type.eq_ignore_ascii_case("parquet") {
            return Err(Error::configuration(format!(
                "unsupported file type '{}', only parquet tables are read",
                self.file_type
            )));
        }
        self.stitching.validate()?;
        self.sofa.validate()
    }
}

impl fmt::Display for ClifConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CLIF Configuration:")?;
        writeln!(f, "  Tables: {}", self.tables_path.display())?;
        writeln!(f, "  Output: {}", self.output_path.display())?;
        if let Some(timezone) = &self.timezone {
            writeln!(f, "  Timezone: {timezone}")?;
        }
        writeln!(f, "  Threads: {}", self.thread_count())?;
        writeln!(f, "  Stitching Gap: {} hours", self.stitching.gap_hours)?;
        write!(f, "{}", self.sofa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config = ClifConfig::from_json_str(
            r#"{"tables_path": "/data/clif", "file_type": "parquet", "timezone": "US/Central"}"#,
        )
        .unwrap();
        assert_eq!(config.tables_path, PathBuf::from("/data/clif"));
        assert_eq!(config.stitching.gap_hours, 6.0);
        assert_eq!(config.sofa.window_hours, 24.0);
        assert!(config.sofa.fill_na_scores_with_zero);
        assert!(config.sofa.remove_outliers);
    }

    #[test]
    fn test_negative_gap_is_rejected() {
        let result = ClifConfig::from_json_str(r#"{"stitching": {"gap_hours": -1}}"#);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_huge_gap_is_rejected() {
        let config = StitchingConfig::default().with_gap_hours(1e13);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
        let result = ClifConfig::from_json_str(r#"{"stitching": {"gap_hours": 1e13}}"#);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_unsupported_file_type() {
        let result = ClifConfig::from_json_str(r#"{"file_type": "csv"}"#);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_unknown_feature_category() {
        let json = r#"{"sofa": {"features": [{"table": "labs", "category": "lactate"}]}}"#;
        assert!(matches!(
            ClifConfig::from_json_str(json),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_gap_is_allowed() {
        let config = StitchingConfig::default().with_gap_hours(0.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.gap(), Duration::zero());
    }
}
