//! Common domain type definitions
//!
//! Typed names for the CLIF source tables and the categories the cohort and
//! scoring code consumes. Raw tables carry categories as strings; they are
//! resolved into these enums once, when configuration is loaded or when an
//! event is projected into the wide table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source table of a clinical event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    /// Laboratory results
    Labs,
    /// Vital signs
    Vitals,
    /// Bedside assessments (GCS, RASS, ...)
    PatientAssessments,
    /// Continuously infused medications
    MedicationAdminContinuous,
    /// Respiratory support device and settings
    RespiratorySupport,
}

impl SourceTable {
    /// All source tables
    pub const ALL: [Self; 5] = [
        Self::Labs,
        Self::Vitals,
        Self::PatientAssessments,
        Self::MedicationAdminContinuous,
        Self::RespiratorySupport,
    ];

    /// Table name as used in file names and configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Labs => "labs",
            Self::Vitals => "vitals",
            Self::PatientAssessments => "patient_assessments",
            Self::MedicationAdminContinuous => "medication_admin_continuous",
            Self::RespiratorySupport => "respiratory_support",
        }
    }

    /// Parse a table name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|table| table.as_str() == name)
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a category carries numbers or labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Numeric measurement
    Numeric,
    /// Categorical label
    Categorical,
}

/// Direction in which a category gets worse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorseDirection {
    /// Lower values are worse (platelets, MAP, GCS, PaO2)
    Lower,
    /// Higher values are worse (creatinine, bilirubin, vasopressor doses)
    Higher,
}

/// Clinical category consumed by the wide table and the SOFA scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Serum creatinine (mg/dL)
    Creatinine,
    /// Platelet count (10^3/uL)
    PlateletCount,
    /// Arterial partial pressure of oxygen (mmHg)
    Po2Arterial,
    /// Total bilirubin (mg/dL)
    BilirubinTotal,
    /// Mean arterial pressure (mmHg)
    Map,
    /// Peripheral oxygen saturation (%)
    Spo2,
    /// Body weight (kg)
    WeightKg,
    /// Height (cm)
    HeightCm,
    /// Glasgow Coma Scale total
    GcsTotal,
    /// Norepinephrine infusion
    Norepinephrine,
    /// Epinephrine infusion
    Epinephrine,
    /// Dopamine infusion
    Dopamine,
    /// Dobutamine infusion
    Dobutamine,
    /// Respiratory support device
    DeviceCategory,
    /// Set fraction of inspired oxygen
    Fio2Set,
}

impl Category {
    /// All known categories
    pub const ALL: [Self; 15] = [
        Self::Creatinine,
        Self::PlateletCount,
        Self::Po2Arterial,
        Self::BilirubinTotal,
        Self::Map,
        Self::Spo2,
        Self::WeightKg,
        Self::HeightCm,
        Self::GcsTotal,
        Self::Norepinephrine,
        Self::Epinephrine,
        Self::Dopamine,
        Self::Dobutamine,
        Self::DeviceCategory,
        Self::Fio2Set,
    ];

    /// Vasopressors and inotropes scored by the cardiovascular component
    pub const VASOPRESSORS: [Self; 4] = [
        Self::Norepinephrine,
        Self::Epinephrine,
        Self::Dopamine,
        Self::Dobutamine,
    ];

    /// Category name as used in the CLIF tables
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creatinine => "creatinine",
            Self::PlateletCount => "platelet_count",
            Self::Po2Arterial => "po2_arterial",
            Self::BilirubinTotal => "bilirubin_total",
            Self::Map => "map",
            Self::Spo2 => "spo2",
            Self::WeightKg => "weight_kg",
            Self::HeightCm => "height_cm",
            Self::GcsTotal => "gcs_total",
            Self::Norepinephrine => "norepinephrine",
            Self::Epinephrine => "epinephrine",
            Self::Dopamine => "dopamine",
            Self::Dobutamine => "dobutamine",
            Self::DeviceCategory => "device_category",
            Self::Fio2Set => "fio2_set",
        }
    }

    /// Table the category is recorded in
    #[must_use]
    pub const fn table(self) -> SourceTable {
        match self {
            Self::Creatinine | Self::PlateletCount | Self::Po2Arterial | Self::BilirubinTotal => {
                SourceTable::Labs
            }
            Self::Map | Self::Spo2 | Self::WeightKg | Self::HeightCm => SourceTable::Vitals,
            Self::GcsTotal => SourceTable::PatientAssessments,
            Self::Norepinephrine | Self::Epinephrine | Self::Dopamine | Self::Dobutamine => {
                SourceTable::MedicationAdminContinuous
            }
            Self::DeviceCategory | Self::Fio2Set => SourceTable::RespiratorySupport,
        }
    }

    /// Kind of value the category carries
    #[must_use]
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::DeviceCategory => ValueKind::Categorical,
            _ => ValueKind::Numeric,
        }
    }

    /// Whether the category is a continuous medication
    #[must_use]
    pub const fn is_medication(self) -> bool {
        matches!(self.table(), SourceTable::MedicationAdminContinuous)
    }

    /// Direction in which the measurement indicates worse organ function
    #[must_use]
    pub const fn worse_direction(self) -> WorseDirection {
        match self {
            Self::PlateletCount | Self::Po2Arterial | Self::Map | Self::Spo2 | Self::GcsTotal => {
                WorseDirection::Lower
            }
            _ => WorseDirection::Higher,
        }
    }

    /// Parse a category name within a given table
    #[must_use]
    pub fn parse(table: SourceTable, name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.table() == table && category.as_str() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Respiratory support device, ranked by invasiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceCategory {
    /// Breathing room air
    RoomAir = 0,
    /// Unlisted device
    Other = 1,
    /// Nasal cannula
    NasalCannula = 2,
    /// Trach collar
    TrachCollar = 3,
    /// Face mask
    FaceMask = 4,
    /// High flow nasal cannula
    HighFlowNc = 5,
    /// Continuous positive airway pressure
    Cpap = 6,
    /// Non-invasive positive pressure ventilation
    Nippv = 7,
    /// Invasive mechanical ventilation
    Imv = 8,
}

impl DeviceCategory {
    /// Label as written in the `device_category` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoomAir => "Room Air",
            Self::Other => "Other",
            Self::NasalCannula => "Nasal Cannula",
            Self::TrachCollar => "Trach Collar",
            Self::FaceMask => "Face Mask",
            Self::HighFlowNc => "High Flow NC",
            Self::Cpap => "CPAP",
            Self::Nippv => "NIPPV",
            Self::Imv => "IMV",
        }
    }

    /// Parse a device label, case-insensitive
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "room air" | "room_air" => Some(Self::RoomAir),
            "other" => Some(Self::Other),
            "nasal cannula" | "nasal_cannula" => Some(Self::NasalCannula),
            "trach collar" | "trach_collar" => Some(Self::TrachCollar),
            "face mask" | "face_mask" => Some(Self::FaceMask),
            "high flow nc" | "high_flow_nc" => Some(Self::HighFlowNc),
            "cpap" => Some(Self::Cpap),
            "nippv" => Some(Self::Nippv),
            "imv" => Some(Self::Imv),
            _ => None,
        }
    }

    /// Whether the device counts as respiratory support for the top SOFA tiers
    #[must_use]
    pub const fn is_advanced_support(self) -> bool {
        matches!(self, Self::HighFlowNc | Self::Cpap | Self::Nippv | Self::Imv)
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
