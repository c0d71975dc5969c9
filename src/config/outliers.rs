//! Plausible value ranges per category

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::types::Category;

/// Inclusive range of biologically plausible values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibleRange {
    /// Smallest plausible value
    pub min: f64,
    /// Largest plausible value
    pub max: f64,
}

impl PlausibleRange {
    /// Create a range
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether a value lies inside the range
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Declared plausible ranges, keyed by category
///
/// Categories without a declared range accept every finite value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutlierRanges {
    ranges: BTreeMap<Category, PlausibleRange>,
}

impl Default for OutlierRanges {
    fn default() -> Self {
        let ranges = [
            (Category::Creatinine, PlausibleRange::new(0.0, 20.0)),
            (Category::PlateletCount, PlausibleRange::new(0.0, 2000.0)),
            (Category::BilirubinTotal, PlausibleRange::new(0.0, 80.0)),
            (Category::Map, PlausibleRange::new(0.0, 250.0)),
            (Category::Po2Arterial, PlausibleRange::new(0.0, 700.0)),
            (Category::Fio2Set, PlausibleRange::new(0.21, 1.0)),
            (Category::Spo2, PlausibleRange::new(50.0, 100.0)),
            (Category::GcsTotal, PlausibleRange::new(3.0, 15.0)),
            (Category::Norepinephrine, PlausibleRange::new(0.0, 3.0)),
            (Category::Epinephrine, PlausibleRange::new(0.0, 3.0)),
            (Category::Dopamine, PlausibleRange::new(0.0, 50.0)),
            (Category::Dobutamine, PlausibleRange::new(0.0, 40.0)),
        ];
        Self {
            ranges: ranges.into_iter().collect(),
        }
    }
}

impl OutlierRanges {
    /// No declared ranges
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ranges: BTreeMap::new(),
        }
    }

    /// Declare or replace the range of a category
    #[must_use]
    pub fn with_range(mut self, category: Category, min: f64, max: f64) -> Self {
        self.ranges.insert(category, PlausibleRange::new(min, max));
        self
    }

    /// Range declared for a category
    #[must_use]
    pub fn range(&self, category: Category) -> Option<PlausibleRange> {
        self.ranges.get(&category).copied()
    }

    /// Whether a value is plausible for its category
    #[must_use]
    pub fn is_plausible(&self, category: Category, value: f64) -> bool {
        self.range(category).is_none_or(|range| range.contains(value))
    }

    /// Check that every range is finite and ordered
    pub fn validate(&self) -> Result<()> {
        for (category, range) in &self.ranges {
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(Error::configuration(format!(
                    "invalid outlier range for '{category}': [{}, {}]",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}
