//! Hospitalization and patient records
//!
//! Source records are immutable. Stitching produces derived
//! [`crate::models::encounter::EncounterBlock`] values and never edits these.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::io::TableRecord;

/// A single hospital admission as recorded by the source system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospitalization {
    /// Unique hospitalization identifier
    pub hospitalization_id: String,
    /// Patient the hospitalization belongs to
    pub patient_id: String,
    /// Admission timestamp
    pub admission_dttm: Option<NaiveDateTime>,
    /// Discharge timestamp
    pub discharge_dttm: Option<NaiveDateTime>,
    /// Age in years at admission
    pub age_at_admission: Option<i32>,
    /// Discharge disposition (Home, Expired, Acute Care Hospital, ...)
    pub discharge_category: Option<String>,
}

impl Hospitalization {
    /// Create a hospitalization with the required fields
    #[must_use]
    pub fn new(
        hospitalization_id: impl Into<String>,
        patient_id: impl Into<String>,
        admission_dttm: Option<NaiveDateTime>,
        discharge_dttm: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            hospitalization_id: hospitalization_id.into(),
            patient_id: patient_id.into(),
            admission_dttm,
            discharge_dttm,
            age_at_admission: None,
            discharge_category: None,
        }
    }

    /// Set the age at admission
    #[must_use]
    pub fn with_age(mut self, age: i32) -> Self {
        self.age_at_admission = Some(age);
        self
    }

    /// Set the discharge category
    #[must_use]
    pub fn with_discharge_category(mut self, category: impl Into<String>) -> Self {
        self.discharge_category = Some(category.into());
        self
    }

    /// Admission/discharge span when both timestamps are present
    #[must_use]
    pub fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.admission_dttm?, self.discharge_dttm?))
    }
}

impl TableRecord for Hospitalization {
    const TABLE_NAME: &'static str = "hospitalization";
}

/// Patient demographics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Unique patient identifier
    pub patient_id: String,
    /// Date and time of death, if known
    pub death_dttm: Option<NaiveDateTime>,
    /// Race category
    pub race_category: Option<String>,
    /// Sex category
    pub sex_category: Option<String>,
    /// Ethnicity category
    pub ethnicity_category: Option<String>,
}

impl Patient {
    /// Create a patient with no demographics filled in
    #[must_use]
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            death_dttm: None,
            race_category: None,
            sex_category: None,
            ethnicity_category: None,
        }
    }
}

impl TableRecord for Patient {
    const TABLE_NAME: &'static str = "patient";
}
