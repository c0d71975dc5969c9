//! SOFA threshold ladders
//!
//! Each ladder lists the cutoffs of tiers 1 to 4. For categories where lower
//! is worse a value scores a tier when it is `<=` the cutoff; where higher is
//! worse, when it is `>=` the cutoff. A value exactly on a cutoff therefore
//! always lands in the worse tier.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::types::WorseDirection;

/// Cutoffs for tiers 1 to 4
pub type Ladder = [f64; 4];

/// Tier reached by a value on a ladder
#[must_use]
pub fn ladder_tier(value: f64, ladder: &Ladder, direction: WorseDirection) -> u8 {
    let reached = ladder
        .iter()
        .filter(|&&cutoff| match direction {
            WorseDirection::Lower => value <= cutoff,
            WorseDirection::Higher => value >= cutoff,
        })
        .count();
    reached as u8
}

/// Clinical cutoffs used by the scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SofaThresholds {
    /// PaO2/FiO2 ratio (mmHg), descending
    pub pf_ratio: Ladder,
    /// Platelet count (10^3/uL), descending
    pub platelets: Ladder,
    /// Total bilirubin (mg/dL), ascending
    pub bilirubin: Ladder,
    /// Creatinine (mg/dL), ascending
    pub creatinine: Ladder,
    /// Glasgow Coma Scale total, descending
    pub gcs: Ladder,
    /// MAP at or below which the cardiovascular component scores 1
    pub map_mmhg: f64,
    /// Dopamine dose (mcg/kg/min) from which the component scores 3
    pub dopamine_medium: f64,
    /// Dopamine dose (mcg/kg/min) from which the component scores 4
    pub dopamine_high: f64,
    /// Norepinephrine or epinephrine dose (mcg/kg/min) from which the component scores 4
    pub catecholamine_high: f64,
    /// FiO2 assumed when PaO2 or SpO2 is present without a recorded FiO2
    pub default_fio2: f64,
    /// SpO2 (%) above which the saturation curve is too flat to impute P/F
    pub spo2_imputation_max: f64,
}

impl Default for SofaThresholds {
    fn default() -> Self {
        Self {
            pf_ratio: [400.0, 300.0, 200.0, 100.0],
            platelets: [150.0, 100.0, 50.0, 20.0],
            bilirubin: [1.2, 2.0, 6.0, 12.0],
            creatinine: [1.2, 2.0, 3.5, 5.0],
            gcs: [14.0, 12.0, 9.0, 5.0],
            map_mmhg: 70.0,
            dopamine_medium: 5.0,
            dopamine_high: 15.0,
            catecholamine_high: 0.2,
            default_fio2: 0.21,
            spo2_imputation_max: 97.0,
        }
    }
}

impl SofaThresholds {
    /// Ladders of the original SOFA publication (Vincent et al., 1996)
    ///
    /// Identical to the default except for the catecholamine cutoff of tier 4,
    /// which is 0.1 mcg/kg/min.
    #[must_use]
    pub fn vincent_1996() -> Self {
        Self {
            catecholamine_high: 0.1,
            ..Self::default()
        }
    }

    /// Set the norepinephrine/epinephrine cutoff of tier 4
    #[must_use]
    pub fn with_catecholamine_high(mut self, dose: f64) -> Self {
        self.catecholamine_high = dose;
        self
    }

    /// Check that every ladder is finite and monotone in its direction
    pub fn validate(&self) -> Result<()> {
        let ladders = [
            ("pf_ratio", &self.pf_ratio, WorseDirection::Lower),
            ("platelets", &self.platelets, WorseDirection::Lower),
            ("bilirubin", &self.bilirubin, WorseDirection::Higher),
            ("creatinine", &self.creatinine, WorseDirection::Higher),
            ("gcs", &self.gcs, WorseDirection::Lower),
        ];
        for (name, ladder, direction) in ladders {
            let ordered = ladder.windows(2).all(|pair| match direction {
                WorseDirection::Lower => pair[0] > pair[1],
                WorseDirection::Higher => pair[0] < pair[1],
            });
            if !ordered || ladder.iter().any(|c| !c.is_finite()) {
                return Err(Error::configuration(format!(
                    "SOFA ladder '{name}' is not strictly monotone: {ladder:?}"
                )));
            }
        }

        let scalars = [
            self.map_mmhg,
            self.dopamine_medium,
            self.dopamine_high,
            self.catecholamine_high,
            self.spo2_imputation_max,
        ];
        if scalars.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(Error::configuration(
                "SOFA cardiovascular and SpO2 cutoffs must be positive",
            ));
        }
        if self.dopamine_medium >= self.dopamine_high {
            return Err(Error::configuration(format!(
                "dopamine cutoffs out of order: {} >= {}",
                self.dopamine_medium, self.dopamine_high
            )));
        }
        if !(self.default_fio2 > 0.0 && self.default_fio2 <= 1.0) {
            return Err(Error::configuration(format!(
                "default FiO2 must be a fraction in (0, 1], got {}",
                self.default_fio2
            )));
        }
        Ok(())
    }
}
