//! Feature specifications for the wide table
//!
//! Configuration names features by strings (`table`, `category`,
//! `aggregation`, `unit`). They are resolved into typed [`FeatureSpec`]
//! values before any computation runs; anything that does not resolve is a
//! configuration error.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::outliers::OutlierRanges;
use crate::error::{Error, Result};
use crate::models::types::{Category, SourceTable, ValueKind, WorseDirection};
use crate::models::wide::WideColumn;

/// How events of one category are reduced to a single value per window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Smallest value
    Min,
    /// Largest value
    Max,
    /// Arithmetic mean
    Mean,
    /// Earliest value by event time
    First,
    /// Latest value by event time
    Last,
    /// Most invasive respiratory device
    MostInvasive,
}

impl Aggregation {
    /// Parse an aggregation name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "mean" => Some(Self::Mean),
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            "most_invasive" => Some(Self::MostInvasive),
            _ => None,
        }
    }

    /// Worst-value aggregation for a category
    #[must_use]
    pub const fn worst_for(category: Category) -> Self {
        match category.value_kind() {
            ValueKind::Categorical => Self::MostInvasive,
            ValueKind::Numeric => match category.worse_direction() {
                WorseDirection::Lower => Self::Min,
                WorseDirection::Higher => Self::Max,
            },
        }
    }

    /// Whether the aggregation can reduce values of the given kind
    #[must_use]
    pub const fn supports(self, kind: ValueKind) -> bool {
        match self {
            Self::Min | Self::Max | Self::Mean => matches!(kind, ValueKind::Numeric),
            Self::First | Self::Last => true,
            Self::MostInvasive => matches!(kind, ValueKind::Categorical),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::First => "first",
            Self::Last => "last",
            Self::MostInvasive => "most_invasive",
        };
        f.write_str(name)
    }
}

/// A resolved feature: which category to aggregate, how, and in which unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    /// Category aggregated into the column
    pub category: Category,
    /// Aggregation applied within the window
    pub aggregation: Aggregation,
    /// Target unit, required for medications and forbidden otherwise
    pub unit: Option<String>,
}

impl FeatureSpec {
    /// Feature using the category's worst-value aggregation
    #[must_use]
    pub fn worst(category: Category) -> Self {
        Self {
            category,
            aggregation: Aggregation::worst_for(category),
            unit: None,
        }
    }

    /// Set the target unit
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the aggregation
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Column produced by this feature
    #[must_use]
    pub fn column(&self) -> WideColumn {
        WideColumn::new(self.category, self.unit.clone())
    }

    /// Check that aggregation and unit fit the category
    pub fn validate(&self) -> Result<()> {
        if !self.aggregation.supports(self.category.value_kind()) {
            return Err(Error::configuration(format!(
                "aggregation '{}' cannot be applied to category '{}'",
                self.aggregation, self.category
            )));
        }
        match (&self.unit, self.category.is_medication()) {
            (None, true) => Err(Error::configuration(format!(
                "medication category '{}' has no preferred unit",
                self.category
            ))),
            (Some(unit), false) => Err(Error::configuration(format!(
                "category '{}' is not a medication but has unit '{unit}'",
                self.category
            ))),
            (Some(unit), true) if unit.trim().is_empty() => Err(Error::configuration(format!(
                "medication category '{}' has an empty preferred unit",
                self.category
            ))),
            _ => Ok(()),
        }
    }
}

/// Feature as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpecConfig {
    /// Source table name
    pub table: String,
    /// Category name within the table
    pub category: String,
    /// Aggregation name; defaults to the category's worst value
    #[serde(default)]
    pub aggregation: Option<String>,
    /// Target unit; medications fall back to the preferred unit map
    #[serde(default)]
    pub unit: Option<String>,
}

impl FeatureSpecConfig {
    /// Configuration entry for a category with default aggregation
    #[must_use]
    pub fn for_category(category: Category) -> Self {
        Self {
            table: category.table().as_str().to_string(),
            category: category.as_str().to_string(),
            aggregation: None,
            unit: None,
        }
    }

    /// Resolve names into a typed feature
    pub fn resolve(&self, preferred_units: &BTreeMap<String, String>) -> Result<FeatureSpec> {
        let table = SourceTable::parse(&self.table).ok_or_else(|| {
            Error::configuration(format!("unknown table '{}'", self.table))
        })?;
        let category = Category::parse(table, &self.category).ok_or_else(|| {
            Error::configuration(format!(
                "unknown category '{}' for table '{table}'",
                self.category
            ))
        })?;
        let aggregation = match &self.aggregation {
            Some(name) => Aggregation::parse(name).ok_or_else(|| {
                Error::configuration(format!(
                    "unknown aggregation '{name}' for category '{category}'"
                ))
            })?,
            None => Aggregation::worst_for(category),
        };
        let unit = self
            .unit
            .clone()
            .or_else(|| preferred_units.get(category.as_str()).cloned());

        let spec = FeatureSpec {
            category,
            aggregation,
            unit,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Resolved configuration of the temporal feature assembler
#[derive(Debug, Clone, PartialEq)]
pub struct WideDatasetConfig {
    features: Vec<FeatureSpec>,
    /// Plausible ranges; events outside them are dropped before aggregation
    pub outlier_ranges: Option<OutlierRanges>,
    /// Whether to draw a progress bar
    pub show_progress: bool,
}

impl WideDatasetConfig {
    /// Create a configuration from resolved features
    ///
    /// Every feature must be valid and each category may appear only once.
    pub fn new(features: Vec<FeatureSpec>) -> Result<Self> {
        if features.is_empty() {
            return Err(Error::configuration("wide dataset has no features"));
        }
        let mut seen = Vec::with_capacity(features.len());
        for feature in &features {
            feature.validate()?;
            if seen.contains(&feature.category) {
                return Err(Error::configuration(format!(
                    "category '{}' is configured more than once",
                    feature.category
                )));
            }
            seen.push(feature.category);
        }
        Ok(Self {
            features,
            outlier_ranges: None,
            show_progress: false,
        })
    }

    /// Resolve configuration entries and build the configuration
    pub fn from_config(
        entries: &[FeatureSpecConfig],
        preferred_units: &BTreeMap<String, String>,
    ) -> Result<Self> {
        for key in preferred_units.keys() {
            let known = Category::parse(SourceTable::MedicationAdminContinuous, key).is_some();
            if !known {
                return Err(Error::configuration(format!(
                    "preferred unit given for unknown medication '{key}'"
                )));
            }
        }
        let features = entries
            .iter()
            .map(|entry| entry.resolve(preferred_units))
            .collect::<Result<Vec<_>>>()?;
        Self::new(features)
    }

    /// Drop events outside the given plausible ranges
    pub fn with_outlier_ranges(mut self, ranges: OutlierRanges) -> Result<Self> {
        ranges.validate()?;
        self.outlier_ranges = Some(ranges);
        Ok(self)
    }

    /// Enable or disable the progress bar
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Resolved features, in column order
    #[must_use]
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Feature configured for a category
    #[must_use]
    pub fn feature(&self, category: Category) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.category == category)
    }

    /// Columns of the resulting wide table
    #[must_use]
    pub fn columns(&self) -> Vec<WideColumn> {
        self.features.iter().map(FeatureSpec::column).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units() -> BTreeMap<String, String> {
        BTreeMap::from([("norepinephrine".to_string(), "mcg/kg/min".to_string())])
    }

    #[test]
    fn test_resolve_defaults_to_worst_value() {
        let spec = FeatureSpecConfig::for_category(Category::PlateletCount)
            .resolve(&units())
            .unwrap();
        assert_eq!(spec.aggregation, Aggregation::Min);

        let spec = FeatureSpecConfig::for_category(Category::Creatinine)
            .resolve(&units())
            .unwrap();
        assert_eq!(spec.aggregation, Aggregation::Max);
    }

    #[test]
    fn test_medication_takes_preferred_unit() {
        let spec = FeatureSpecConfig::for_category(Category::Norepinephrine)
            .resolve(&units())
            .unwrap();
        assert_eq!(spec.unit.as_deref(), Some("mcg/kg/min"));
        assert_eq!(spec.column().name, "norepinephrine_mcg_kg_min");
    }

    #[test]
    fn test_medication_without_unit_is_rejected() {
        let result =
            FeatureSpecConfig::for_category(Category::Dopamine).resolve(&BTreeMap::new());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        let entry = FeatureSpecConfig {
            table: "labs".to_string(),
            category: "troponin".to_string(),
            aggregation: None,
            unit: None,
        };
        assert!(matches!(entry.resolve(&units()), Err(Error::Configuration(_))));

        let entry = FeatureSpecConfig {
            aggregation: Some("median".to_string()),
            ..FeatureSpecConfig::for_category(Category::Map)
        };
        assert!(matches!(entry.resolve(&units()), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_incompatible_aggregation_is_rejected() {
        let spec = FeatureSpec::worst(Category::Map).with_aggregation(Aggregation::MostInvasive);
        assert!(spec.validate().is_err());
        let spec = FeatureSpec::worst(Category::DeviceCategory).with_aggregation(Aggregation::Mean);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_duplicate_category_is_rejected() {
        let result = WideDatasetConfig::new(vec![
            FeatureSpec::worst(Category::Map),
            FeatureSpec::worst(Category::Map).with_aggregation(Aggregation::Mean),
        ]);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
