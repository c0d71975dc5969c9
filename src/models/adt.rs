//! Admission, discharge and transfer (ADT) records

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::io::TableRecord;

/// Movement of a patient between locations within a hospitalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Hospitalization the movement belongs to
    pub hospitalization_id: String,
    /// Facility identifier
    pub hospital_id: Option<String>,
    /// Time the patient entered the location
    pub in_dttm: Option<NaiveDateTime>,
    /// Time the patient left the location
    pub out_dttm: Option<NaiveDateTime>,
    /// Location category (ed, ward, icu, procedural, ...)
    pub location_category: Option<String>,
    /// Location type (general_icu, cardiac_icu, ...)
    pub location_type: Option<String>,
}

impl Transfer {
    /// Create a transfer record
    #[must_use]
    pub fn new(
        hospitalization_id: impl Into<String>,
        in_dttm: Option<NaiveDateTime>,
        out_dttm: Option<NaiveDateTime>,
        location_category: impl Into<String>,
    ) -> Self {
        Self {
            hospitalization_id: hospitalization_id.into(),
            hospital_id: None,
            in_dttm,
            out_dttm,
            location_category: Some(location_category.into()),
            location_type: None,
        }
    }

    /// Set the facility
    #[must_use]
    pub fn with_hospital(mut self, hospital_id: impl Into<String>) -> Self {
        self.hospital_id = Some(hospital_id.into());
        self
    }
}

impl TableRecord for Transfer {
    const TABLE_NAME: &'static str = "adt";
}
