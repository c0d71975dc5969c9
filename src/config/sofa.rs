//! SOFA scoring configuration

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithm::sofa::thresholds::SofaThresholds;
use crate::algorithm::units::DoseUnit;
use crate::config::features::{FeatureSpecConfig, WideDatasetConfig};
use crate::config::outliers::OutlierRanges;
use crate::error::{Error, Result};
use crate::models::cohort::MAX_SPAN_HOURS;
use crate::models::types::Category;

/// Unit in which the scorer reads vasopressor doses
pub const VASOPRESSOR_UNIT: &str = "mcg/kg/min";

/// Categories the scorer reads from the wide table
pub const REQUIRED_CATEGORIES: [Category; 12] = [
    Category::Creatinine,
    Category::PlateletCount,
    Category::Po2Arterial,
    Category::BilirubinTotal,
    Category::Map,
    Category::GcsTotal,
    Category::Norepinephrine,
    Category::Epinephrine,
    Category::Dopamine,
    Category::Dobutamine,
    Category::DeviceCategory,
    Category::Fio2Set,
];

/// Configuration of a SOFA run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SofaConfig {
    /// Length of the scoring window after admission, in hours
    pub window_hours: f64,
    /// Score undetermined components as 0 instead of leaving the total undefined
    pub fill_na_scores_with_zero: bool,
    /// Drop implausible values before aggregation
    pub remove_outliers: bool,
    /// Impute P/F from SpO2/FiO2 when no PaO2 is available
    pub impute_pf_from_spo2: bool,
    /// Features of the wide table the scorer runs on
    pub features: Vec<FeatureSpecConfig>,
    /// Target unit per medication category
    pub preferred_units: BTreeMap<String, String>,
    /// Plausible ranges used when `remove_outliers` is set
    pub outlier_ranges: OutlierRanges,
    /// Clinical cutoffs
    pub thresholds: SofaThresholds,
    /// Whether to draw progress bars
    pub show_progress: bool,
}

impl Default for SofaConfig {
    fn default() -> Self {
        let mut features: Vec<FeatureSpecConfig> = REQUIRED_CATEGORIES
            .iter()
            .map(|&category| FeatureSpecConfig::for_category(category))
            .collect();
        features.push(FeatureSpecConfig::for_category(Category::Spo2));

        let preferred_units = Category::VASOPRESSORS
            .iter()
            .map(|category| (category.as_str().to_string(), VASOPRESSOR_UNIT.to_string()))
            .collect();

        Self {
            window_hours: 24.0,
            fill_na_scores_with_zero: true,
            remove_outliers: true,
            impute_pf_from_spo2: false,
            features,
            preferred_units,
            outlier_ranges: OutlierRanges::default(),
            thresholds: SofaThresholds::default(),
            show_progress: false,
        }
    }
}

impl SofaConfig {
    /// Set the scoring window length
    #[must_use]
    pub fn with_window_hours(mut self, hours: f64) -> Self {
        self.window_hours = hours;
        self
    }

    /// Set the missing-component policy
    #[must_use]
    pub fn with_fill_na_scores_with_zero(mut self, fill: bool) -> Self {
        self.fill_na_scores_with_zero = fill;
        self
    }

    /// Enable or disable outlier removal
    #[must_use]
    pub fn with_remove_outliers(mut self, remove: bool) -> Self {
        self.remove_outliers = remove;
        self
    }

    /// Enable or disable SpO2-based P/F imputation
    #[must_use]
    pub fn with_impute_pf_from_spo2(mut self, impute: bool) -> Self {
        self.impute_pf_from_spo2 = impute;
        self
    }

    /// Replace the clinical cutoffs
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: SofaThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Replace the plausible ranges
    #[must_use]
    pub fn with_outlier_ranges(mut self, ranges: OutlierRanges) -> Self {
        self.outlier_ranges = ranges;
        self
    }

    /// Enable or disable progress bars
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Resolve the wide table configuration of this run
    ///
    /// Fails when a category the scorer reads is missing or when a
    /// vasopressor column is not in mcg/kg/min.
    pub fn wide_config(&self) -> Result<WideDatasetConfig> {
        let wide = WideDatasetConfig::from_config(&self.features, &self.preferred_units)?;

        let mut required = REQUIRED_CATEGORIES.to_vec();
        if self.impute_pf_from_spo2 {
            required.push(Category::Spo2);
        }
        for category in required {
            if wide.feature(category).is_none() {
                return Err(Error::configuration(format!(
                    "SOFA scoring requires a '{category}' feature"
                )));
            }
        }

        let expected = DoseUnit::parse(VASOPRESSOR_UNIT);
        for category in Category::VASOPRESSORS {
            let unit = wide.feature(category).and_then(|f| f.unit.as_deref());
            if unit.and_then(DoseUnit::parse) != expected {
                return Err(Error::configuration(format!(
                    "SOFA scoring reads '{category}' in {VASOPRESSOR_UNIT}, configured unit is {}",
                    unit.unwrap_or("none")
                )));
            }
        }

        let wide = wide.with_progress(self.show_progress);
        if self.remove_outliers {
            wide.with_outlier_ranges(self.outlier_ranges.clone())
        } else {
            Ok(wide)
        }
    }

    /// Check the configuration before any computation
    pub fn validate(&self) -> Result<()> {
        if !self.window_hours.is_finite() || self.window_hours <= 0.0 {
            return Err(Error::configuration(format!(
                "scoring window must be positive, got {} hours",
                self.window_hours
            )));
        }
        if self.window_hours > MAX_SPAN_HOURS {
            return Err(Error::configuration(format!(
                "scoring window of {} hours exceeds the {MAX_SPAN_HOURS} hour limit",
                self.window_hours
            )));
        }
        self.thresholds.validate()?;
        self.outlier_ranges.validate()?;
        self.wide_config().map(|_| ())
    }
}

impl fmt::Display for SofaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SOFA Configuration:")?;
        writeln!(f, "  Window: {} hours", self.window_hours)?;
        writeln!(f, "  Fill Missing Scores With Zero: {}", self.fill_na_scores_with_zero)?;
        writeln!(f, "  Remove Outliers: {}", self.remove_outliers)?;
        writeln!(f, "  Impute P/F From SpO2: {}", self.impute_pf_from_spo2)?;
        writeln!(f, "  Features: {}", self.features.len())?;
        writeln!(
            f,
            "  Catecholamine Tier 4 Cutoff: {} {VASOPRESSOR_UNIT}",
            self.thresholds.catecholamine_high
        )?;
        Ok(())
    }
}
