//! Algorithm implementations for cohort derivation
//!
//! This module contains the stages of the derivation pipeline: encounter
//! stitching, unit normalization, wide feature assembly, SOFA scoring and the
//! cohort helpers built on top of them.

pub mod cohort;
pub mod sofa;
pub mod stitching;
pub mod units;
pub mod wide;

pub use sofa::{SofaResult, score_wide_table};
pub use stitching::{StitchResult, stitch_encounters};
pub use units::{Conversion, ConversionStatus, StandardDoseConverter, UnitNormalizer};
pub use wide::{CohortInput, WideDatasetResult, assemble_wide_dataset};
