//! Domain models for CLIF cohort derivation
//!
//! This module contains the records of the standardized clinical tables and
//! the derived entities produced by stitching, feature assembly and scoring.

pub mod adt;
pub mod cohort;
pub mod diagnosis;
pub mod encounter;
pub mod events;
pub mod hospitalization;
pub mod sofa;
pub mod types;
pub mod wide;

// Re-export commonly used types
pub use adt::Transfer;
pub use cohort::{CohortKey, CohortMember, CohortWindow};
pub use diagnosis::HospitalDiagnosis;
pub use encounter::{
    EncounterBlock, EncounterBlockId, EncounterMapping, EncounterMappingRow,
    StitchedHospitalization, StitchedTransfer,
};
pub use events::{
    AssessmentRecord, ClinicalEvent, EventValue, LabRecord, MedicationAdmin,
    RespiratorySupportRecord, VitalRecord,
};
pub use hospitalization::{Hospitalization, Patient};
pub use sofa::{SofaComponent, SofaScore, SofaSummary};
pub use types::{Category, DeviceCategory, SourceTable, ValueKind, WorseDirection};
pub use wide::{FeatureValue, WideColumn, WideRow, WideTable};
