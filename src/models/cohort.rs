//! Cohort windows
//!
//! A cohort is a list of ids (hospitalizations or encounter blocks) with the
//! interval over which events are eligible for feature assembly.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::encounter::{EncounterBlock, EncounterBlockId};
use crate::models::hospitalization::Hospitalization;
use crate::utils::io::TableRecord;

/// How cohort ids relate to the `hospitalization_id` of event tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortKey {
    /// Cohort ids are hospitalization ids
    #[default]
    Hospitalization,
    /// Cohort ids are encounter block ids; events are re-keyed through the mapping
    EncounterBlock,
}

/// Eligibility window for one cohort id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortWindow {
    /// Hospitalization id or encounter block id
    pub id: String,
    /// Window start (inclusive)
    pub start_time: NaiveDateTime,
    /// Window end (inclusive)
    pub end_time: NaiveDateTime,
}

impl CohortWindow {
    /// Create a window
    #[must_use]
    pub fn new(id: impl Into<String>, start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
        }
    }

    /// Window covering the first `hours` after `start`
    #[must_use]
    pub fn first_hours(id: impl Into<String>, start: NaiveDateTime, hours: f64) -> Self {
        let end = start
            .checked_add_signed(hours_to_duration(hours))
            .unwrap_or(NaiveDateTime::MAX);
        Self::new(id, start, end)
    }

    /// First `hours` of a hospitalization, `None` without an admission time
    #[must_use]
    pub fn from_admission(hospitalization: &Hospitalization, hours: f64) -> Option<Self> {
        let admission = hospitalization.admission_dttm?;
        Some(Self::first_hours(
            hospitalization.hospitalization_id.as_str(),
            admission,
            hours,
        ))
    }

    /// First `hours` of an encounter block, keyed by the block id
    #[must_use]
    pub fn from_block(block: &EncounterBlock, hours: f64) -> Self {
        Self::first_hours(block.encounter_block.to_string(), block.block_start, hours)
    }

    /// Whether `start_time <= end_time`
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start_time <= self.end_time
    }

    /// Whether a timestamp lies in `[start_time, end_time]`
    #[must_use]
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

impl TableRecord for CohortWindow {
    const TABLE_NAME: &'static str = "cohort";
}

/// Encounter block joined with its hospitalization and patient attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortMember {
    /// Block identifier
    pub encounter_block: EncounterBlockId,
    /// Patient identifier
    pub patient_id: String,
    /// First hospitalization of the block
    pub hospitalization_id: String,
    /// Block admission
    pub admission_dttm: NaiveDateTime,
    /// Block discharge
    pub discharge_dttm: NaiveDateTime,
    /// Age at the first admission
    pub age_at_admission: Option<i32>,
    /// Disposition of the last discharge
    pub discharge_category: Option<String>,
    /// Sex
    pub sex_category: Option<String>,
    /// Race
    pub race_category: Option<String>,
    /// Ethnicity
    pub ethnicity_category: Option<String>,
    /// Time of death, if recorded
    pub death_dttm: Option<NaiveDateTime>,
}

impl TableRecord for CohortMember {
    const TABLE_NAME: &'static str = "cohort_members";
}

/// Longest span, in hours, accepted for gaps and windows (about a century)
pub const MAX_SPAN_HOURS: f64 = 876_600.0;

/// Convert fractional hours into a duration with second precision
///
/// Values beyond what a duration can hold saturate at [`Duration::MAX`].
#[must_use]
pub fn hours_to_duration(hours: f64) -> Duration {
    Duration::try_seconds((hours * 3600.0).round() as i64).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_huge_window_saturates() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let window = CohortWindow::first_hours("h1", start, 1e13);
        assert_eq!(window.end_time, NaiveDateTime::MAX);
        assert!(window.is_valid());
        assert_eq!(hours_to_duration(1e20), Duration::MAX);
    }
}
