//! Pipeline stages over loaded CLIF tables
//!
//! [`ClinicalTables`] holds every input table and is never modified. Each
//! stage borrows it and returns a new artefact, so stages can be rerun with
//! different configuration against the same loaded data.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::algorithm::cohort::build_cohort_members;
use crate::algorithm::sofa::{SofaResult, score_wide_table};
use crate::algorithm::stitching::{StitchResult, stitch_encounters};
use crate::algorithm::units::{StandardDoseConverter, UnitNormalizer};
use crate::algorithm::wide::{CohortInput, WideDatasetResult, assemble_wide_dataset};
use crate::config::{SofaConfig, StitchingConfig, WideDatasetConfig};
use crate::error::{QualityReport, Result};
use crate::models::adt::Transfer;
use crate::models::cohort::CohortMember;
use crate::models::diagnosis::HospitalDiagnosis;
use crate::models::encounter::{EncounterMappingRow, StitchedHospitalization, StitchedTransfer};
use crate::models::events::{
    AssessmentRecord, ClinicalEvent, LabRecord, MedicationAdmin, RespiratorySupportRecord,
    VitalRecord,
};
use crate::models::hospitalization::{Hospitalization, Patient};
use crate::models::sofa::{SofaScore, SofaSummary};
use crate::models::wide::WideTable;
use crate::utils::io::{
    TableRecord, read_optional_table, read_table_from_dir, validate_directory, write_parquet,
    write_table,
};

/// Every CLIF table the pipeline reads
#[derive(Debug, Clone, Default)]
pub struct ClinicalTables {
    /// Hospitalizations
    pub hospitalizations: Vec<Hospitalization>,
    /// Patient demographics
    pub patients: Vec<Patient>,
    /// ADT movements
    pub transfers: Vec<Transfer>,
    /// Hospital diagnoses
    pub diagnoses: Vec<HospitalDiagnosis>,
    /// Laboratory results
    pub labs: Vec<LabRecord>,
    /// Vital signs
    pub vitals: Vec<VitalRecord>,
    /// Patient assessments
    pub assessments: Vec<AssessmentRecord>,
    /// Respiratory support observations
    pub respiratory_support: Vec<RespiratorySupportRecord>,
    /// Continuous medication administrations
    pub medications: Vec<MedicationAdmin>,
}

impl ClinicalTables {
    /// Load tables from `clif_<table>.parquet` files in a directory
    ///
    /// The hospitalization table is required; every other table may be
    /// missing and is then empty.
    pub fn load(dir: &Path) -> Result<Self> {
        validate_directory(dir)?;
        let start = Instant::now();
        log::info!("Loading CLIF tables from {}", dir.display());

        let tables = Self {
            hospitalizations: read_table_from_dir(dir)?,
            patients: read_optional_table(dir)?,
            transfers: read_optional_table(dir)?,
            diagnoses: read_optional_table(dir)?,
            labs: read_optional_table(dir)?,
            vitals: read_optional_table(dir)?,
            assessments: read_optional_table(dir)?,
            respiratory_support: read_optional_table(dir)?,
            medications: read_optional_table(dir)?,
        };

        log::info!(
            "Loaded {} hospitalizations, {} events and {} medication rows in {:?}",
            tables.hospitalizations.len(),
            tables.event_count(),
            tables.medications.len(),
            start.elapsed()
        );
        Ok(tables)
    }

    /// Labs, vitals, assessments and respiratory support as generic events
    #[must_use]
    pub fn events(&self) -> Vec<ClinicalEvent> {
        let mut events = Vec::with_capacity(self.event_count());
        events.extend(self.labs.iter().map(ClinicalEvent::from));
        events.extend(self.vitals.iter().map(ClinicalEvent::from));
        events.extend(self.assessments.iter().map(ClinicalEvent::from));
        events.extend(
            self.respiratory_support
                .iter()
                .flat_map(RespiratorySupportRecord::events),
        );
        events
    }

    fn event_count(&self) -> usize {
        self.labs.len() + self.vitals.len() + self.assessments.len() + self.respiratory_support.len()
    }
}

/// Link hospitalizations into encounter blocks
pub fn stitch(tables: &ClinicalTables, config: &StitchingConfig) -> Result<StitchResult> {
    stitch_encounters(&tables.hospitalizations, &tables.transfers, config)
}

/// Write the encounter mapping and the block-keyed hospitalization and ADT
/// tables of a stitching result into a directory
pub fn write_stitched(dir: &Path, stitched: &StitchResult) -> Result<()> {
    write_table(
        &output_file(dir, EncounterMappingRow::TABLE_NAME),
        stitched.mapping.rows(),
    )?;
    write_table(
        &output_file(dir, StitchedHospitalization::TABLE_NAME),
        &stitched.hospitalizations,
    )?;
    write_table(
        &output_file(dir, StitchedTransfer::TABLE_NAME),
        &stitched.transfers,
    )
}

/// Cohort members of a stitching result, joined with demographics
#[must_use]
pub fn cohort_members(tables: &ClinicalTables, stitched: &StitchResult) -> Vec<CohortMember> {
    build_cohort_members(&stitched.hospitalizations, &tables.patients)
}

/// Build the wide feature table for a cohort
pub fn assemble_wide(
    tables: &ClinicalTables,
    cohort: &CohortInput<'_>,
    config: &WideDatasetConfig,
    normalizer: &dyn UnitNormalizer,
) -> Result<WideDatasetResult> {
    let events = tables.events();
    assemble_wide_dataset(cohort, &events, &tables.medications, config, normalizer)
}

/// Score a wide table
pub fn score(wide: &WideTable, config: &SofaConfig) -> Result<SofaResult> {
    score_wide_table(wide, config)
}

/// Wide table and scores of one SOFA run
#[derive(Debug, Clone, Default)]
pub struct SofaRun {
    /// Assembled features
    pub wide: WideTable,
    /// One score per wide row
    pub scores: Vec<SofaScore>,
    /// Issues from assembly and scoring
    pub report: QualityReport,
}

impl SofaRun {
    /// Write `wide_dataset.parquet` and `sofa_scores.parquet` into a directory
    pub fn write(&self, dir: &Path) -> Result<()> {
        let batch = self.wide.to_record_batch()?;
        write_parquet(&dir.join("wide_dataset.parquet"), batch.schema(), &[batch])?;
        write_table(&output_file(dir, SofaScore::TABLE_NAME), &self.scores)
    }
}

/// Assemble the SOFA feature set for a cohort and score it
///
/// The configuration is validated first, so a bad feature set fails before
/// any event is read.
pub fn run_sofa(
    tables: &ClinicalTables,
    cohort: &CohortInput<'_>,
    config: &SofaConfig,
) -> Result<SofaRun> {
    config.validate()?;
    let wide_config = config.wide_config()?;
    let converter = StandardDoseConverter::new();

    let WideDatasetResult { table, mut report } =
        assemble_wide(tables, cohort, &wide_config, &converter)?;
    let scored = score(&table, config)?;
    report.merge(scored.report);

    let summary = SofaSummary::from_scores(&scored.scores);
    log::info!("{summary}");

    Ok(SofaRun {
        wide: table,
        scores: scored.scores,
        report,
    })
}

/// Path of an output table inside a directory
#[must_use]
pub fn output_file(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.parquet"))
}
