//! Unit normalization for medication doses
//!
//! The feature assembler asks a [`UnitNormalizer`] to convert each recorded
//! dose into the unit configured for its column. Anything other than
//! [`ConversionStatus::Success`] means the record has no usable value; callers
//! never fall back to the unconverted number.

pub mod dose;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::types::Category;

pub use dose::{DoseUnit, StandardDoseConverter};

/// Outcome of a single conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Value converted
    Success,
    /// Source or target unit could not be parsed
    UnrecognizedUnit,
    /// Units measure different things (mass vs. units, rate vs. amount)
    IncompatibleDimension,
    /// No source unit recorded
    MissingUnit,
    /// Weight-based conversion needed but no weight was available
    MissingWeight,
}

impl ConversionStatus {
    /// Short name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::UnrecognizedUnit => "unrecognized_unit",
            Self::IncompatibleDimension => "incompatible_dimension",
            Self::MissingUnit => "missing_unit",
            Self::MissingWeight => "missing_weight",
        }
    }

    /// Whether the conversion produced a value
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of normalizing one dose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    /// Converted value; `None` unless the status is `Success`
    pub value: Option<f64>,
    /// Outcome
    pub status: ConversionStatus,
}

impl Conversion {
    /// Successful conversion
    #[must_use]
    pub const fn success(value: f64) -> Self {
        Self {
            value: Some(value),
            status: ConversionStatus::Success,
        }
    }

    /// Failed conversion
    #[must_use]
    pub const fn failure(status: ConversionStatus) -> Self {
        Self {
            value: None,
            status,
        }
    }

    /// Converted value, only when the conversion succeeded
    #[must_use]
    pub fn converted(&self) -> Option<f64> {
        if self.status.is_success() {
            self.value
        } else {
            None
        }
    }
}

/// Converts a medication dose to a caller-specified unit
pub trait UnitNormalizer: Send + Sync {
    /// Convert `value`, recorded in `source_unit`, into `target_unit`
    ///
    /// `weight_kg` is the patient weight to use for weight-based units.
    fn normalize(
        &self,
        category: Category,
        value: f64,
        source_unit: Option<&str>,
        target_unit: &str,
        weight_kg: Option<f64>,
    ) -> Conversion;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_conversion_has_no_value() {
        let conversion = Conversion {
            value: Some(1.0),
            status: ConversionStatus::UnrecognizedUnit,
        };
        assert_eq!(conversion.converted(), None);
        assert_eq!(Conversion::success(0.1).converted(), Some(0.1));
        assert_eq!(ConversionStatus::MissingWeight.to_string(), "missing_weight");
    }
}
