//! Encounter stitching
//!
//! Hospitalizations of the same patient that follow each other within the
//! configured gap are linked into encounter blocks. Patients are independent,
//! so the merge runs in parallel per patient; block ids are assigned only
//! after all patients are done, from a global sort, so they do not depend on
//! scheduling.

pub mod interval;

use std::time::Instant;

use itertools::Itertools;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::config::StitchingConfig;
use crate::error::{DataQualityIssue, QualityReport, Result};
use crate::models::adt::Transfer;
use crate::models::encounter::{
    EncounterBlock, EncounterMapping, EncounterMappingRow, StitchedHospitalization,
    StitchedTransfer,
};
use crate::models::hospitalization::Hospitalization;
use crate::utils::logging::{
    create_stage_progress_bar, finish_progress_bar, log_stage_complete, log_stage_start,
};

pub use interval::{IntervalGroup, MergeOutcome, RawSpan, merge_intervals};

const STAGE: &str = "Encounter stitching";

/// Output of the encounter stitcher
#[derive(Debug, Clone, Default)]
pub struct StitchResult {
    /// Encounter blocks ordered by id
    pub blocks: Vec<EncounterBlock>,
    /// One hospitalization row per block
    pub hospitalizations: Vec<StitchedHospitalization>,
    /// Transfers of stitched hospitalizations, keyed by block
    pub transfers: Vec<StitchedTransfer>,
    /// Hospitalization to block mapping
    pub mapping: EncounterMapping,
    /// Records that could not be stitched
    pub report: QualityReport,
}

/// Block of one patient before its id is known
struct PendingBlock<'a> {
    patient_id: &'a str,
    group: IntervalGroup,
    members: Vec<&'a Hospitalization>,
}

/// Per-patient merge result
struct PatientOutcome<'a> {
    blocks: Vec<PendingBlock<'a>>,
    rejected: Vec<(&'a Hospitalization, DataQualityIssue)>,
}

/// Link hospitalizations into encounter blocks
///
/// Hospitalizations without identifiers, duplicates of an earlier id, and
/// stays with a missing or inverted admission/discharge span are left out of
/// every block and reported. All other hospitalizations appear exactly once
/// in the mapping.
pub fn stitch_encounters(
    hospitalizations: &[Hospitalization],
    transfers: &[Transfer],
    config: &StitchingConfig,
) -> Result<StitchResult> {
    config.validate()?;
    let start = Instant::now();
    log_stage_start(STAGE, hospitalizations.len());

    let mut report = QualityReport::new();
    let candidates = screen_hospitalizations(hospitalizations, &mut report);

    let mut by_patient: Vec<(&str, Vec<&Hospitalization>)> = candidates
        .into_iter()
        .into_group_map_by(|h| h.patient_id.as_str())
        .into_iter()
        .collect();
    by_patient.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let pb = create_stage_progress_bar(
        by_patient.len() as u64,
        "Stitching patients",
        config.show_progress,
    );
    let gap = config.gap();
    let outcomes: Vec<PatientOutcome<'_>> = by_patient
        .par_iter()
        .map(|(patient_id, stays)| {
            let outcome = stitch_patient(*patient_id, stays, gap);
            pb.inc(1);
            outcome
        })
        .collect();
    finish_progress_bar(&pb, Some("Stitching complete"));

    let mut pending = Vec::new();
    for outcome in outcomes {
        for (stay, issue) in outcome.rejected {
            report.record(
                issue,
                stay.hospitalization_id.as_str(),
                format!(
                    "admission {:?}, discharge {:?}",
                    stay.admission_dttm, stay.discharge_dttm
                ),
            );
        }
        pending.extend(outcome.blocks);
    }

    pending.sort_by(|a, b| {
        (a.group.start, a.patient_id, first_id(a)).cmp(&(b.group.start, b.patient_id, first_id(b)))
    });

    let mut blocks = Vec::with_capacity(pending.len());
    let mut stitched = Vec::with_capacity(pending.len());
    let mut mapping_rows = Vec::new();
    for (idx, block) in pending.into_iter().enumerate() {
        let id = idx as u64 + 1;
        stitched.push(stitched_row(id, &block));
        mapping_rows.extend(block.members.iter().map(|stay| EncounterMappingRow {
            hospitalization_id: stay.hospitalization_id.clone(),
            encounter_block: id,
        }));
        blocks.push(EncounterBlock {
            encounter_block: id,
            patient_id: block.patient_id.to_string(),
            block_start: block.group.start,
            block_end: block.group.end,
            hospitalization_ids: block
                .members
                .iter()
                .map(|stay| stay.hospitalization_id.clone())
                .collect(),
        });
    }
    let mapping = EncounterMapping::from_rows(mapping_rows);

    let transfers = stitch_transfers(transfers, &mapping, &mut report);

    report.log_summary(STAGE);
    log_stage_complete(STAGE, blocks.len(), report.len(), start.elapsed());

    Ok(StitchResult {
        blocks,
        hospitalizations: stitched,
        transfers,
        mapping,
        report,
    })
}

/// Drop hospitalizations without identifiers and repeated ids
fn screen_hospitalizations<'a>(
    hospitalizations: &'a [Hospitalization],
    report: &mut QualityReport,
) -> Vec<&'a Hospitalization> {
    let mut seen = FxHashSet::default();
    let mut kept = Vec::with_capacity(hospitalizations.len());
    for stay in hospitalizations {
        if stay.hospitalization_id.trim().is_empty() || stay.patient_id.trim().is_empty() {
            report.record(
                DataQualityIssue::MissingIdentifier,
                stay.hospitalization_id.as_str(),
                format!("patient '{}'", stay.patient_id),
            );
        } else if !seen.insert(stay.hospitalization_id.as_str()) {
            report.record(
                DataQualityIssue::DuplicateIdentifier,
                stay.hospitalization_id.as_str(),
                "hospitalization listed more than once, first row kept",
            );
        } else {
            kept.push(stay);
        }
    }
    kept
}

fn stitch_patient<'a>(
    patient_id: &'a str,
    stays: &[&'a Hospitalization],
    gap: chrono::Duration,
) -> PatientOutcome<'a> {
    let spans: Vec<RawSpan> = stays
        .iter()
        .map(|stay| (stay.admission_dttm, stay.discharge_dttm))
        .collect();
    let merged = merge_intervals(&spans, gap);
    log::debug!(
        "Patient {patient_id}: {} stays in {} blocks",
        stays.len(),
        merged.groups.len()
    );

    let blocks = merged
        .groups
        .into_iter()
        .map(|group| {
            let members = group.members.iter().map(|&idx| stays[idx]).collect();
            PendingBlock {
                patient_id,
                group,
                members,
            }
        })
        .collect();
    let rejected = merged
        .rejected
        .into_iter()
        .map(|(idx, issue)| (stays[idx], issue))
        .collect();

    PatientOutcome { blocks, rejected }
}

fn first_id<'a>(block: &PendingBlock<'a>) -> &'a str {
    block
        .members
        .first()
        .map_or("", |stay| stay.hospitalization_id.as_str())
}

fn stitched_row(id: u64, block: &PendingBlock<'_>) -> StitchedHospitalization {
    let first = block.members.first();
    let last_discharged = block
        .members
        .iter()
        .max_by_key(|stay| stay.discharge_dttm)
        .copied();

    StitchedHospitalization {
        encounter_block: id,
        patient_id: block.patient_id.to_string(),
        hospitalization_id: first.map(|s| s.hospitalization_id.clone()).unwrap_or_default(),
        admission_dttm: block.group.start,
        discharge_dttm: block.group.end,
        age_at_admission: first.and_then(|s| s.age_at_admission),
        discharge_category: last_discharged.and_then(|s| s.discharge_category.clone()),
        hospitalization_count: block.members.len() as u32,
    }
}

/// Attach block ids to transfers of stitched hospitalizations
fn stitch_transfers(
    transfers: &[Transfer],
    mapping: &EncounterMapping,
    report: &mut QualityReport,
) -> Vec<StitchedTransfer> {
    let mut stitched: Vec<StitchedTransfer> = transfers
        .iter()
        .filter_map(|transfer| {
            if transfer.hospitalization_id.trim().is_empty() {
                report.record(
                    DataQualityIssue::MissingIdentifier,
                    "",
                    "transfer without hospitalization id",
                );
                return None;
            }
            let Some(block) = mapping.block_of(&transfer.hospitalization_id) else {
                report.record(
                    DataQualityIssue::UnknownHospitalization,
                    transfer.hospitalization_id.as_str(),
                    "transfer of an unknown or unstitched hospitalization",
                );
                return None;
            };
            Some(StitchedTransfer {
                encounter_block: block,
                hospitalization_id: transfer.hospitalization_id.clone(),
                hospital_id: transfer.hospital_id.clone(),
                in_dttm: transfer.in_dttm,
                out_dttm: transfer.out_dttm,
                location_category: transfer.location_category.clone(),
                location_type: transfer.location_type.clone(),
            })
        })
        .collect();

    stitched.sort_by(|a, b| {
        a.encounter_block
            .cmp(&b.encounter_block)
            .then(a.in_dttm.cmp(&b.in_dttm))
    });
    stitched
}
