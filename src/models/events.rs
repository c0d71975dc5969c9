//! Clinical event records
//!
//! Labs, vitals, assessments and respiratory support rows are all projected
//! into the generic [`ClinicalEvent`] shape before windowing. Continuous
//! medications stay separate because their dose has to pass the unit
//! normalizer first.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::models::types::{Category, SourceTable};
use crate::utils::io::TableRecord;

/// Value carried by an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    /// Numeric measurement
    Numeric(f64),
    /// Categorical label
    Categorical(String),
}

impl EventValue {
    /// Numeric content, if any
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::Categorical(_) => None,
        }
    }

    /// Label content, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Categorical(label) => Some(label),
        }
    }
}

/// Generic clinical event
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalEvent {
    /// Hospitalization the event was recorded in
    pub hospitalization_id: String,
    /// Event timestamp
    pub event_dttm: Option<NaiveDateTime>,
    /// Table the event came from
    pub table: SourceTable,
    /// Raw category label
    pub category: String,
    /// Recorded value
    pub value: Option<EventValue>,
}

impl ClinicalEvent {
    /// Create a numeric event
    #[must_use]
    pub fn numeric(
        hospitalization_id: impl Into<String>,
        event_dttm: NaiveDateTime,
        category: Category,
        value: f64,
    ) -> Self {
        Self {
            hospitalization_id: hospitalization_id.into(),
            event_dttm: Some(event_dttm),
            table: category.table(),
            category: category.as_str().to_string(),
            value: Some(EventValue::Numeric(value)),
        }
    }

    /// Create a categorical event
    #[must_use]
    pub fn categorical(
        hospitalization_id: impl Into<String>,
        event_dttm: NaiveDateTime,
        category: Category,
        label: impl Into<String>,
    ) -> Self {
        Self {
            hospitalization_id: hospitalization_id.into(),
            event_dttm: Some(event_dttm),
            table: category.table(),
            category: category.as_str().to_string(),
            value: Some(EventValue::Categorical(label.into())),
        }
    }

    /// Resolve the raw category label against the event's table
    #[must_use]
    pub fn resolved_category(&self) -> Option<Category> {
        Category::parse(self.table, &self.category)
    }
}

/// Row of the `labs` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabRecord {
    /// Hospitalization identifier
    pub hospitalization_id: String,
    /// Result timestamp
    pub lab_result_dttm: Option<NaiveDateTime>,
    /// Lab category
    pub lab_category: Option<String>,
    /// Numeric result
    pub lab_value_numeric: Option<f64>,
    /// Unit of the result
    pub reference_unit: Option<String>,
}

impl From<&LabRecord> for ClinicalEvent {
    fn from(record: &LabRecord) -> Self {
        Self {
            hospitalization_id: record.hospitalization_id.clone(),
            event_dttm: record.lab_result_dttm,
            table: SourceTable::Labs,
            category: record.lab_category.clone().unwrap_or_default(),
            value: record.lab_value_numeric.map(EventValue::Numeric),
        }
    }
}

impl TableRecord for LabRecord {
    const TABLE_NAME: &'static str = "labs";
}

/// Row of the `vitals` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalRecord {
    /// Hospitalization identifier
    pub hospitalization_id: String,
    /// Measurement timestamp
    pub recorded_dttm: Option<NaiveDateTime>,
    /// Vital category
    pub vital_category: Option<String>,
    /// Measured value
    pub vital_value: Option<f64>,
}

impl From<&VitalRecord> for ClinicalEvent {
    fn from(record: &VitalRecord) -> Self {
        Self {
            hospitalization_id: record.hospitalization_id.clone(),
            event_dttm: record.recorded_dttm,
            table: SourceTable::Vitals,
            category: record.vital_category.clone().unwrap_or_default(),
            value: record.vital_value.map(EventValue::Numeric),
        }
    }
}

impl TableRecord for VitalRecord {
    const TABLE_NAME: &'static str = "vitals";
}

/// Row of the `patient_assessments` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    /// Hospitalization identifier
    pub hospitalization_id: String,
    /// Assessment timestamp
    pub recorded_dttm: Option<NaiveDateTime>,
    /// Assessment category
    pub assessment_category: Option<String>,
    /// Numeric result
    pub numerical_value: Option<f64>,
    /// Categorical result
    pub categorical_value: Option<String>,
}

impl From<&AssessmentRecord> for ClinicalEvent {
    fn from(record: &AssessmentRecord) -> Self {
        let value = record
            .numerical_value
            .map(EventValue::Numeric)
            .or_else(|| record.categorical_value.clone().map(EventValue::Categorical));
        Self {
            hospitalization_id: record.hospitalization_id.clone(),
            event_dttm: record.recorded_dttm,
            table: SourceTable::PatientAssessments,
            category: record.assessment_category.clone().unwrap_or_default(),
            value,
        }
    }
}

impl TableRecord for AssessmentRecord {
    const TABLE_NAME: &'static str = "patient_assessments";
}

/// Row of the `respiratory_support` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespiratorySupportRecord {
    /// Hospitalization identifier
    pub hospitalization_id: String,
    /// Observation timestamp
    pub recorded_dttm: Option<NaiveDateTime>,
    /// Device in use
    pub device_category: Option<String>,
    /// Set FiO2, as a fraction or a percentage
    pub fio2_set: Option<f64>,
}

impl RespiratorySupportRecord {
    /// Split the row into a device event and a FiO2 event
    #[must_use]
    pub fn events(&self) -> SmallVec<[ClinicalEvent; 2]> {
        let mut events = smallvec![];
        if let Some(device) = &self.device_category {
            events.push(ClinicalEvent {
                hospitalization_id: self.hospitalization_id.clone(),
                event_dttm: self.recorded_dttm,
                table: SourceTable::RespiratorySupport,
                category: Category::DeviceCategory.as_str().to_string(),
                value: Some(EventValue::Categorical(device.clone())),
            });
        }
        if let Some(fio2) = self.fio2_set {
            events.push(ClinicalEvent {
                hospitalization_id: self.hospitalization_id.clone(),
                event_dttm: self.recorded_dttm,
                table: SourceTable::RespiratorySupport,
                category: Category::Fio2Set.as_str().to_string(),
                value: Some(EventValue::Numeric(fio2)),
            });
        }
        events
    }
}

impl TableRecord for RespiratorySupportRecord {
    const TABLE_NAME: &'static str = "respiratory_support";
}

/// Row of the `medication_admin_continuous` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAdmin {
    /// Hospitalization identifier
    pub hospitalization_id: String,
    /// Administration timestamp
    pub admin_dttm: Option<NaiveDateTime>,
    /// Medication category
    pub med_category: Option<String>,
    /// Recorded dose
    pub med_dose: Option<f64>,
    /// Unit of the recorded dose
    pub med_dose_unit: Option<String>,
}

impl MedicationAdmin {
    /// Create a medication administration record
    #[must_use]
    pub fn new(
        hospitalization_id: impl Into<String>,
        admin_dttm: NaiveDateTime,
        category: Category,
        dose: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            hospitalization_id: hospitalization_id.into(),
            admin_dttm: Some(admin_dttm),
            med_category: Some(category.as_str().to_string()),
            med_dose: Some(dose),
            med_dose_unit: Some(unit.into()),
        }
    }

    /// Resolve the medication category
    #[must_use]
    pub fn resolved_category(&self) -> Option<Category> {
        self.med_category
            .as_deref()
            .and_then(|name| Category::parse(SourceTable::MedicationAdminContinuous, name))
    }
}

impl TableRecord for MedicationAdmin {
    const TABLE_NAME: &'static str = "medication_admin_continuous";
}
