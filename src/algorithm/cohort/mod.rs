//! Cohort construction
//!
//! Turns stitched encounters into cohort windows and member tables. The
//! filters in [`filters`] select which hospitalizations or blocks take part.

pub mod filters;

use rustc_hash::FxHashMap;

use crate::models::cohort::{CohortMember, CohortWindow};
use crate::models::encounter::{EncounterBlock, StitchedHospitalization};
use crate::models::hospitalization::{Hospitalization, Patient};

pub use filters::{
    FilterCriteria, HospitalizationFilter, adult_hospitalizations, blocks_for_hospitalizations,
    blocks_with_category, blocks_with_diagnosis_prefix,
};

/// Windows covering the first `hours` of each hospitalization
///
/// Hospitalizations without an admission time get no window.
#[must_use]
pub fn cohort_from_admissions<'a>(
    hospitalizations: impl IntoIterator<Item = &'a Hospitalization>,
    hours: f64,
) -> Vec<CohortWindow> {
    let mut skipped = 0usize;
    let windows: Vec<_> = hospitalizations
        .into_iter()
        .filter_map(|h| {
            let window = CohortWindow::from_admission(h, hours);
            if window.is_none() {
                skipped += 1;
            }
            window
        })
        .collect();
    if skipped > 0 {
        log::warn!("{skipped} hospitalizations without admission time left out of the cohort");
    }
    windows
}

/// Windows covering the first `hours` of each encounter block
#[must_use]
pub fn cohort_from_encounter_blocks<'a>(
    blocks: impl IntoIterator<Item = &'a EncounterBlock>,
    hours: f64,
) -> Vec<CohortWindow> {
    blocks
        .into_iter()
        .map(|block| CohortWindow::from_block(block, hours))
        .collect()
}

/// Join stitched blocks with patient demographics
///
/// Blocks whose patient is missing from `patients` keep empty demographics.
#[must_use]
pub fn build_cohort_members(
    stitched: &[StitchedHospitalization],
    patients: &[Patient],
) -> Vec<CohortMember> {
    let by_id: FxHashMap<&str, &Patient> = patients
        .iter()
        .map(|p| (p.patient_id.as_str(), p))
        .collect();

    stitched
        .iter()
        .map(|block| {
            let patient = by_id.get(block.patient_id.as_str());
            CohortMember {
                encounter_block: block.encounter_block,
                patient_id: block.patient_id.clone(),
                hospitalization_id: block.hospitalization_id.clone(),
                admission_dttm: block.admission_dttm,
                discharge_dttm: block.discharge_dttm,
                age_at_admission: block.age_at_admission,
                discharge_category: block.discharge_category.clone(),
                sex_category: patient.and_then(|p| p.sex_category.clone()),
                race_category: patient.and_then(|p| p.race_category.clone()),
                ethnicity_category: patient.and_then(|p| p.ethnicity_category.clone()),
                death_dttm: patient.and_then(|p| p.death_dttm),
            }
        })
        .collect()
}
