//! Per-organ SOFA component scores
//!
//! Each function scores one organ system from the aggregated inputs and
//! returns `None` when none of the values it needs are present.

use smallvec::SmallVec;

use crate::algorithm::sofa::thresholds::{SofaThresholds, ladder_tier};
use crate::config::OutlierRanges;
use crate::models::types::{Category, DeviceCategory, WorseDirection};
use crate::models::wide::{WideRow, WideTable};

/// Highest respiratory tier reachable without advanced respiratory support
pub const UNSUPPORTED_RESPIRATORY_CAP: u8 = 2;

/// Values of one wide row the scorer reads
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SofaInputs {
    /// Worst PaO2 (mmHg)
    pub po2_arterial: Option<f64>,
    /// Worst FiO2 (fraction)
    pub fio2_set: Option<f64>,
    /// Worst SpO2 (%)
    pub spo2: Option<f64>,
    /// Most invasive device
    pub device: Option<DeviceCategory>,
    /// Worst platelet count (10^3/uL)
    pub platelet_count: Option<f64>,
    /// Worst total bilirubin (mg/dL)
    pub bilirubin_total: Option<f64>,
    /// Worst MAP (mmHg)
    pub map: Option<f64>,
    /// Highest norepinephrine dose (mcg/kg/min)
    pub norepinephrine: Option<f64>,
    /// Highest epinephrine dose (mcg/kg/min)
    pub epinephrine: Option<f64>,
    /// Highest dopamine dose (mcg/kg/min)
    pub dopamine: Option<f64>,
    /// Highest dobutamine dose (mcg/kg/min)
    pub dobutamine: Option<f64>,
    /// Worst GCS total
    pub gcs_total: Option<f64>,
    /// Worst creatinine (mg/dL)
    pub creatinine: Option<f64>,
}

impl SofaInputs {
    /// Read the inputs of one row
    ///
    /// When `ranges` is given, implausible values are treated as absent and
    /// returned alongside the inputs.
    #[must_use]
    pub fn from_row(
        table: &WideTable,
        row: &WideRow,
        ranges: Option<&OutlierRanges>,
    ) -> (Self, SmallVec<[(Category, f64); 2]>) {
        let mut rejected = SmallVec::new();
        let mut read = |category: Category| {
            let value = table.numeric(row, category)?;
            if ranges.is_some_and(|r| !r.is_plausible(category, value)) {
                rejected.push((category, value));
                return None;
            }
            Some(value)
        };

        let inputs = Self {
            po2_arterial: read(Category::Po2Arterial),
            fio2_set: read(Category::Fio2Set),
            spo2: read(Category::Spo2),
            platelet_count: read(Category::PlateletCount),
            bilirubin_total: read(Category::BilirubinTotal),
            map: read(Category::Map),
            norepinephrine: read(Category::Norepinephrine),
            epinephrine: read(Category::Epinephrine),
            dopamine: read(Category::Dopamine),
            dobutamine: read(Category::Dobutamine),
            gcs_total: read(Category::GcsTotal),
            creatinine: read(Category::Creatinine),
            device: table
                .categorical(row, Category::DeviceCategory)
                .and_then(DeviceCategory::parse),
        };
        (inputs, rejected)
    }
}

/// PaO2/FiO2 ratio, or its SpO2-based estimate when enabled
///
/// The ratio is formed from the window's aggregated values, the lowest PaO2
/// over the highest FiO2, so the two need not come from the same draw. A
/// missing FiO2 falls back to the room-air default. The estimate inverts
/// S/F = 64 + 0.84 x P/F and is only used for SpO2 on the steep part of the
/// saturation curve.
#[must_use]
pub fn pf_ratio(inputs: &SofaInputs, thresholds: &SofaThresholds, impute: bool) -> Option<f64> {
    let fio2 = inputs
        .fio2_set
        .filter(|f| *f > 0.0)
        .unwrap_or(thresholds.default_fio2);

    if let Some(po2) = inputs.po2_arterial {
        return Some(po2 / fio2);
    }
    if impute {
        if let Some(spo2) = inputs.spo2.filter(|s| *s <= thresholds.spo2_imputation_max) {
            return Some((spo2 / fio2 - 64.0) / 0.84);
        }
    }
    None
}

/// Respiratory component
#[must_use]
pub fn respiratory_score(
    inputs: &SofaInputs,
    thresholds: &SofaThresholds,
    impute: bool,
) -> Option<u8> {
    let ratio = pf_ratio(inputs, thresholds, impute)?;
    let tier = ladder_tier(ratio, &thresholds.pf_ratio, WorseDirection::Lower);
    let supported = inputs.device.is_some_and(DeviceCategory::is_advanced_support);
    if supported {
        Some(tier)
    } else {
        Some(tier.min(UNSUPPORTED_RESPIRATORY_CAP))
    }
}

/// Coagulation component
#[must_use]
pub fn coagulation_score(inputs: &SofaInputs, thresholds: &SofaThresholds) -> Option<u8> {
    inputs
        .platelet_count
        .map(|v| ladder_tier(v, &thresholds.platelets, WorseDirection::Lower))
}

/// Liver component
#[must_use]
pub fn liver_score(inputs: &SofaInputs, thresholds: &SofaThresholds) -> Option<u8> {
    inputs
        .bilirubin_total
        .map(|v| ladder_tier(v, &thresholds.bilirubin, WorseDirection::Higher))
}

/// Central nervous system component
#[must_use]
pub fn cns_score(inputs: &SofaInputs, thresholds: &SofaThresholds) -> Option<u8> {
    inputs
        .gcs_total
        .map(|v| ladder_tier(v, &thresholds.gcs, WorseDirection::Lower))
}

/// Renal component
#[must_use]
pub fn renal_score(inputs: &SofaInputs, thresholds: &SofaThresholds) -> Option<u8> {
    inputs
        .creatinine
        .map(|v| ladder_tier(v, &thresholds.creatinine, WorseDirection::Higher))
}

/// Cardiovascular component
///
/// Any running vasopressor sets the score and MAP only matters when none is.
/// Doses of zero count as not running.
#[must_use]
pub fn cardiovascular_score(inputs: &SofaInputs, thresholds: &SofaThresholds) -> Option<u8> {
    let running = |dose: Option<f64>| dose.filter(|d| *d > 0.0);
    let dopamine = running(inputs.dopamine);
    let dobutamine = running(inputs.dobutamine);
    let catecholamine = match (running(inputs.norepinephrine), running(inputs.epinephrine)) {
        (Some(ne), Some(epi)) => Some(ne.max(epi)),
        (ne, epi) => ne.or(epi),
    };

    let vasopressor_tier = if dopamine.is_some_and(|d| d >= thresholds.dopamine_high)
        || catecholamine.is_some_and(|d| d >= thresholds.catecholamine_high)
    {
        Some(4)
    } else if dopamine.is_some_and(|d| d >= thresholds.dopamine_medium) || catecholamine.is_some() {
        Some(3)
    } else if dopamine.is_some() || dobutamine.is_some() {
        Some(2)
    } else {
        None
    };

    if vasopressor_tier.is_some() {
        return vasopressor_tier;
    }

    let any_dose_recorded = [
        inputs.norepinephrine,
        inputs.epinephrine,
        inputs.dopamine,
        inputs.dobutamine,
    ]
    .iter()
    .any(Option::is_some);

    match inputs.map {
        Some(map) if map <= thresholds.map_mmhg => Some(1),
        Some(_) => Some(0),
        None if any_dose_recorded => Some(0),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> SofaThresholds {
        SofaThresholds::default()
    }

    #[test]
    fn test_respiratory_cap_without_support() {
        let inputs = SofaInputs {
            po2_arterial: Some(55.0),
            fio2_set: Some(0.6),
            ..SofaInputs::default()
        };
        assert_eq!(respiratory_score(&inputs, &t(), false), Some(2));

        let ventilated = SofaInputs {
            device: Some(DeviceCategory::Imv),
            ..inputs
        };
        assert_eq!(respiratory_score(&ventilated, &t(), false), Some(4));
    }

    #[test]
    fn test_ratio_uses_worst_of_each_input() {
        // lowest PaO2 was drawn on room air, highest FiO2 came later
        let inputs = SofaInputs {
            po2_arterial: Some(80.0),
            fio2_set: Some(1.0),
            device: Some(DeviceCategory::Imv),
            ..SofaInputs::default()
        };
        assert_eq!(pf_ratio(&inputs, &t(), false), Some(80.0));
        assert_eq!(respiratory_score(&inputs, &t(), false), Some(4));
    }

    #[test]
    fn test_respiratory_defaults_to_room_air() {
        let inputs = SofaInputs {
            po2_arterial: Some(80.0),
            ..SofaInputs::default()
        };
        // 80 / 0.21 = 381
        assert_eq!(respiratory_score(&inputs, &t(), false), Some(1));

        let boundary = SofaInputs {
            po2_arterial: Some(120.0),
            fio2_set: Some(0.4),
            ..SofaInputs::default()
        };
        assert_eq!(respiratory_score(&boundary, &t(), false), Some(2));
    }

    #[test]
    fn test_spo2_imputation() {
        let inputs = SofaInputs {
            spo2: Some(92.0),
            fio2_set: Some(0.5),
            device: Some(DeviceCategory::Nippv),
            ..SofaInputs::default()
        };
        assert_eq!(respiratory_score(&inputs, &t(), false), None);
        // S/F = 184, P/F = (184 - 64) / 0.84 = 142.9
        assert_eq!(respiratory_score(&inputs, &t(), true), Some(3));

        let saturated = SofaInputs {
            spo2: Some(99.0),
            ..inputs
        };
        assert_eq!(respiratory_score(&saturated, &t(), true), None);
    }

    #[test]
    fn test_vasopressors_dominate_map() {
        let inputs = SofaInputs {
            map: Some(80.0),
            norepinephrine: Some(0.15),
            ..SofaInputs::default()
        };
        assert_eq!(cardiovascular_score(&inputs, &t()), Some(3));
        assert_eq!(cardiovascular_score(&inputs, &SofaThresholds::vincent_1996()), Some(4));
    }

    #[test]
    fn test_cardiovascular_ladder() {
        let score = |inputs: SofaInputs| cardiovascular_score(&inputs, &t());
        assert_eq!(score(SofaInputs::default()), None);
        assert_eq!(score(SofaInputs { map: Some(70.0), ..SofaInputs::default() }), Some(1));
        assert_eq!(score(SofaInputs { map: Some(71.0), ..SofaInputs::default() }), Some(0));
        assert_eq!(score(SofaInputs { dobutamine: Some(2.0), ..SofaInputs::default() }), Some(2));
        assert_eq!(score(SofaInputs { dopamine: Some(4.0), ..SofaInputs::default() }), Some(2));
        assert_eq!(score(SofaInputs { dopamine: Some(5.0), ..SofaInputs::default() }), Some(3));
        assert_eq!(score(SofaInputs { dopamine: Some(15.0), ..SofaInputs::default() }), Some(4));
        assert_eq!(score(SofaInputs { epinephrine: Some(0.2), ..SofaInputs::default() }), Some(4));
        assert_eq!(score(SofaInputs { dopamine: Some(0.0), ..SofaInputs::default() }), Some(0));
    }

    #[test]
    fn test_single_value_components() {
        let inputs = SofaInputs {
            platelet_count: Some(45.0),
            bilirubin_total: Some(2.5),
            gcs_total: Some(8.0),
            creatinine: Some(4.5),
            ..SofaInputs::default()
        };
        assert_eq!(coagulation_score(&inputs, &t()), Some(3));
        assert_eq!(liver_score(&inputs, &t()), Some(2));
        assert_eq!(cns_score(&inputs, &t()), Some(3));
        assert_eq!(renal_score(&inputs, &t()), Some(3));
        assert_eq!(renal_score(&SofaInputs::default(), &t()), None);
    }
}
