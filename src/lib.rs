//! A Rust library for deriving analysis cohorts from CLIF clinical tables:
//! encounter stitching, wide feature tables and SOFA scoring.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{ClifConfig, SofaConfig, StitchingConfig, WideDatasetConfig};
pub use error::{DataQualityIssue, Error, IssueKind, QualityReport, Result};

// Pipeline stages
pub use algorithm::{
    CohortInput, SofaResult, StandardDoseConverter, StitchResult, UnitNormalizer,
    WideDatasetResult, assemble_wide_dataset, score_wide_table, stitch_encounters,
};
pub use pipeline::{ClinicalTables, SofaRun, run_sofa};

// Arrow types
pub use arrow::record_batch::RecordBatch;
