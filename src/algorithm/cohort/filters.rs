//! Cohort filtering criteria
//!
//! Simple filters used to narrow hospitalizations and encounter blocks down
//! to a study cohort before feature assembly.

use std::collections::BTreeSet;

use chrono::Datelike;
use rustc_hash::FxHashSet;

use crate::models::diagnosis::HospitalDiagnosis;
use crate::models::encounter::{EncounterBlockId, EncounterMapping};
use crate::models::events::ClinicalEvent;
use crate::models::hospitalization::Hospitalization;
use crate::models::types::Category;

/// Defines a criterion for filtering records
pub trait FilterCriteria<T> {
    /// Determine if a record meets the filter criteria
    fn meets_criteria(&self, record: &T) -> bool;
}

/// A filter that can be applied to a hospitalization
#[derive(Debug, Clone)]
pub enum HospitalizationFilter {
    /// Age at admission within a range
    AgeRange {
        /// Minimum age (inclusive)
        min_age: Option<i32>,
        /// Maximum age (inclusive)
        max_age: Option<i32>,
    },
    /// Admission year within a range (inclusive)
    AdmissionYears {
        /// First admission year
        first: i32,
        /// Last admission year
        last: i32,
    },
    /// Hospitalization id in a set
    IdList(FxHashSet<String>),
    /// All criteria must be met
    All(Vec<HospitalizationFilter>),
    /// Any criterion must be met
    Any(Vec<HospitalizationFilter>),
}

impl FilterCriteria<Hospitalization> for HospitalizationFilter {
    fn meets_criteria(&self, hospitalization: &Hospitalization) -> bool {
        match self {
            Self::AgeRange { min_age, max_age } => {
                let Some(age) = hospitalization.age_at_admission else {
                    // Unknown age never qualifies for an age restriction
                    return false;
                };
                min_age.is_none_or(|min| age >= min) && max_age.is_none_or(|max| age <= max)
            }
            Self::AdmissionYears { first, last } => hospitalization
                .admission_dttm
                .is_some_and(|admission| (*first..=*last).contains(&admission.year())),
            Self::IdList(ids) => ids.contains(&hospitalization.hospitalization_id),
            Self::All(filters) => filters.iter().all(|f| f.meets_criteria(hospitalization)),
            Self::Any(filters) => filters.iter().any(|f| f.meets_criteria(hospitalization)),
        }
    }
}

/// Hospitalizations of adults, optionally restricted to admission years
#[must_use]
pub fn adult_hospitalizations(
    hospitalizations: &[Hospitalization],
    min_age: i32,
    admission_years: Option<(i32, i32)>,
) -> Vec<&Hospitalization> {
    let mut criteria = vec![HospitalizationFilter::AgeRange {
        min_age: Some(min_age),
        max_age: None,
    }];
    if let Some((first, last)) = admission_years {
        criteria.push(HospitalizationFilter::AdmissionYears { first, last });
    }
    let filter = HospitalizationFilter::All(criteria);

    let selected: Vec<_> = hospitalizations
        .iter()
        .filter(|h| filter.meets_criteria(h))
        .collect();
    log::info!(
        "Selected {} of {} hospitalizations aged {min_age}+",
        selected.len(),
        hospitalizations.len()
    );
    selected
}

/// Blocks containing any of the given hospitalizations
#[must_use]
pub fn blocks_for_hospitalizations<'a>(
    mapping: &EncounterMapping,
    hospitalization_ids: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<EncounterBlockId> {
    hospitalization_ids
        .into_iter()
        .filter_map(|id| mapping.block_of(id))
        .collect()
}

/// Blocks with a diagnosis code starting with any of the prefixes
///
/// With `present_on_admission_only`, diagnoses not flagged as present on
/// admission are ignored.
#[must_use]
pub fn blocks_with_diagnosis_prefix<S: AsRef<str>>(
    mapping: &EncounterMapping,
    diagnoses: &[HospitalDiagnosis],
    prefixes: &[S],
    present_on_admission_only: bool,
) -> BTreeSet<EncounterBlockId> {
    blocks_for_hospitalizations(
        mapping,
        diagnoses
            .iter()
            .filter(|d| !present_on_admission_only || d.present_on_admission == Some(true))
            .filter(|d| d.matches_any_prefix(prefixes))
            .map(|d| d.hospitalization_id.as_str()),
    )
}

/// Blocks with at least one recorded value of a category
#[must_use]
pub fn blocks_with_category(
    mapping: &EncounterMapping,
    events: &[ClinicalEvent],
    category: Category,
) -> BTreeSet<EncounterBlockId> {
    blocks_for_hospitalizations(
        mapping,
        events
            .iter()
            .filter(|e| e.value.is_some() && e.resolved_category() == Some(category))
            .map(|e| e.hospitalization_id.as_str()),
    )
}
