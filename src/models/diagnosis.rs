//! Hospital diagnosis model
//!
//! Diagnoses are only used by cohort filters, e.g. excluding encounters with
//! end-stage renal disease present on admission.

use serde::{Deserialize, Serialize};

use crate::utils::io::TableRecord;

/// Diagnosis coded during a hospitalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalDiagnosis {
    /// Hospitalization identifier
    pub hospitalization_id: String,
    /// ICD diagnosis code, with or without the dot
    pub diagnosis_code: String,
    /// Code system (icd10cm, icd9cm)
    pub diagnosis_code_format: Option<String>,
    /// Whether the condition was present on admission
    pub present_on_admission: Option<bool>,
}

impl HospitalDiagnosis {
    /// Create a new diagnosis
    #[must_use]
    pub fn new(
        hospitalization_id: impl Into<String>,
        diagnosis_code: impl Into<String>,
        present_on_admission: Option<bool>,
    ) -> Self {
        Self {
            hospitalization_id: hospitalization_id.into(),
            diagnosis_code: diagnosis_code.into(),
            diagnosis_code_format: None,
            present_on_admission,
        }
    }

    /// Code without dots or surrounding whitespace, upper-cased
    #[must_use]
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.diagnosis_code)
    }

    /// Check if the code starts with any of the given prefixes
    ///
    /// Prefixes are compared after normalization, so `N18.5` matches `N185`.
    #[must_use]
    pub fn matches_any_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        let code = self.normalized_code();
        prefixes
            .iter()
            .any(|prefix| code.starts_with(&normalize_code(prefix.as_ref())))
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().replace('.', "").to_uppercase()
}

impl TableRecord for HospitalDiagnosis {
    const TABLE_NAME: &'static str = "hospital_diagnosis";
}
