//! Dose unit parsing and conversion
//!
//! Units have the shape `amount[/kg][/time]`, e.g. `mcg/kg/min`, `mg/hr` or
//! `units/min`. Amounts are converted through a base unit per dimension
//! (micrograms for mass, units for unit-dosed drugs) and rates through minutes.

use crate::algorithm::units::{Conversion, ConversionStatus, UnitNormalizer};
use crate::models::types::Category;

/// Dimension of the dosed amount
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    /// Mass, as a factor to micrograms
    Mass(f64),
    /// Unit-dosed drugs (vasopressin), as a factor to units
    Units(f64),
}

impl Amount {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "ng" => Some(Self::Mass(0.001)),
            "mcg" | "ug" => Some(Self::Mass(1.0)),
            "mg" => Some(Self::Mass(1000.0)),
            "g" | "gm" => Some(Self::Mass(1_000_000.0)),
            "u" | "unit" | "units" => Some(Self::Units(1.0)),
            "mu" | "milliunit" | "milliunits" => Some(Self::Units(0.001)),
            _ => None,
        }
    }

    const fn factor(self) -> f64 {
        match self {
            Self::Mass(factor) | Self::Units(factor) => factor,
        }
    }

    const fn same_dimension(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Mass(_), Self::Mass(_)) | (Self::Units(_), Self::Units(_))
        )
    }
}

/// Parsed dose unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoseUnit {
    /// Dosed amount
    pub amount: Amount,
    /// Whether the dose is per kilogram of body weight
    pub per_kg: bool,
    /// Length of the rate period in minutes, `None` for a bolus amount
    pub period_minutes: Option<f64>,
}

impl DoseUnit {
    /// Parse a unit string, case-insensitive
    #[must_use]
    pub fn parse(unit: &str) -> Option<Self> {
        let normalized: String = unit
            .trim()
            .to_lowercase()
            .replace(['µ', 'μ'], "u")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if normalized.is_empty() {
            return None;
        }

        let mut parts = normalized.split('/');
        let amount = Amount::parse(parts.next()?)?;
        let mut per_kg = false;
        let mut period_minutes = None;

        for part in parts {
            match part {
                "kg" if !per_kg && period_minutes.is_none() => per_kg = true,
                "min" | "minute" if period_minutes.is_none() => period_minutes = Some(1.0),
                "h" | "hr" | "hour" if period_minutes.is_none() => period_minutes = Some(60.0),
                _ => return None,
            }
        }

        Some(Self {
            amount,
            per_kg,
            period_minutes,
        })
    }
}

/// Converter for the mass and unit based infusion rates of the medication table
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDoseConverter;

impl StandardDoseConverter {
    /// Create a converter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Convert between two parsed units
    #[must_use]
    pub fn convert(
        value: f64,
        source: DoseUnit,
        target: DoseUnit,
        weight_kg: Option<f64>,
    ) -> Conversion {
        if !source.amount.same_dimension(target.amount) {
            return Conversion::failure(ConversionStatus::IncompatibleDimension);
        }

        let rate_factor = match (source.period_minutes, target.period_minutes) {
            (Some(from), Some(to)) => to / from,
            (None, None) => 1.0,
            _ => return Conversion::failure(ConversionStatus::IncompatibleDimension),
        };

        let weight = weight_kg.filter(|w| w.is_finite() && *w > 0.0);
        let weight_factor = match (source.per_kg, target.per_kg) {
            (true, true) | (false, false) => 1.0,
            (false, true) => match weight {
                Some(w) => 1.0 / w,
                None => return Conversion::failure(ConversionStatus::MissingWeight),
            },
            (true, false) => match weight {
                Some(w) => w,
                None => return Conversion::failure(ConversionStatus::MissingWeight),
            },
        };

        let amount_factor = source.amount.factor() / target.amount.factor();
        Conversion::success(value * amount_factor * rate_factor * weight_factor)
    }
}

impl UnitNormalizer for StandardDoseConverter {
    fn normalize(
        &self,
        _category: Category,
        value: f64,
        source_unit: Option<&str>,
        target_unit: &str,
        weight_kg: Option<f64>,
    ) -> Conversion {
        let Some(source_unit) = source_unit.filter(|u| !u.trim().is_empty()) else {
            return Conversion::failure(ConversionStatus::MissingUnit);
        };
        match (DoseUnit::parse(source_unit), DoseUnit::parse(target_unit)) {
            (Some(source), Some(target)) => Self::convert(value, source, target, weight_kg),
            _ => Conversion::failure(ConversionStatus::UnrecognizedUnit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "mcg/kg/min";

    fn normalize(value: f64, unit: Option<&str>, weight: Option<f64>) -> Conversion {
        StandardDoseConverter::new().normalize(Category::Norepinephrine, value, unit, TARGET, weight)
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap();
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_parse_spellings() {
        let unit = DoseUnit::parse("MCG/KG/MIN").unwrap();
        assert!(unit.per_kg);
        assert_eq!(unit.period_minutes, Some(1.0));
        assert_eq!(DoseUnit::parse("µg/kg/min"), Some(unit));
        assert_eq!(DoseUnit::parse(" ug / kg / min "), Some(unit));
        assert_eq!(DoseUnit::parse("mg/hour").unwrap().period_minutes, Some(60.0));
        assert!(DoseUnit::parse("puffs").is_none());
        assert!(DoseUnit::parse("mcg/min/kg").is_none());
        assert!(DoseUnit::parse("mcg/kg/kg").is_none());
    }

    #[test]
    fn test_identity_conversion() {
        let conversion = normalize(0.15, Some("mcg/kg/min"), None);
        assert_eq!(conversion.status, ConversionStatus::Success);
        assert_close(conversion.value, 0.15);
    }

    #[test]
    fn test_weight_based_conversion() {
        // 12 mcg/min for an 80 kg patient
        let conversion = normalize(12.0, Some("mcg/min"), Some(80.0));
        assert_close(conversion.converted(), 0.15);

        // 0.9 mg/hr = 15 mcg/min, over 100 kg
        let conversion = normalize(0.9, Some("mg/hr"), Some(100.0));
        assert_close(conversion.converted(), 0.15);
    }

    #[test]
    fn test_missing_weight() {
        let conversion = normalize(1.0, Some("mg/hr"), None);
        assert_eq!(conversion.status, ConversionStatus::MissingWeight);
        assert_eq!(conversion.converted(), None);

        let conversion = normalize(1.0, Some("mg/hr"), Some(0.0));
        assert_eq!(conversion.status, ConversionStatus::MissingWeight);
    }

    #[test]
    fn test_failure_statuses() {
        assert_eq!(normalize(1.0, None, Some(70.0)).status, ConversionStatus::MissingUnit);
        assert_eq!(normalize(1.0, Some("  "), Some(70.0)).status, ConversionStatus::MissingUnit);
        assert_eq!(
            normalize(1.0, Some("ml/hr"), Some(70.0)).status,
            ConversionStatus::UnrecognizedUnit
        );
        assert_eq!(
            normalize(1.0, Some("units/min"), Some(70.0)).status,
            ConversionStatus::IncompatibleDimension
        );
        assert_eq!(
            normalize(1.0, Some("mcg/kg"), Some(70.0)).status,
            ConversionStatus::IncompatibleDimension
        );
    }
}
