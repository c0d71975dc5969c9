//! Reduction of windowed observations to one value per feature

use chrono::NaiveDateTime;

use crate::config::Aggregation;
use crate::models::types::DeviceCategory;
use crate::models::wide::FeatureValue;

/// Value of an observation that passed all filters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observed {
    /// Numeric measurement or converted dose
    Number(f64),
    /// Recognised respiratory device
    Device(DeviceCategory),
}

impl Observed {
    fn number(self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(value),
            Self::Device(_) => None,
        }
    }

    fn device(self) -> Option<DeviceCategory> {
        match self {
            Self::Number(_) => None,
            Self::Device(device) => Some(device),
        }
    }

    fn into_feature(self) -> FeatureValue {
        match self {
            Self::Number(value) => FeatureValue::Numeric(value),
            Self::Device(device) => FeatureValue::Categorical(device.as_str().to_string()),
        }
    }
}

/// Observation inside a cohort window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Event time
    pub time: NaiveDateTime,
    /// Event value
    pub value: Observed,
}

/// Reduce observations with an aggregation
///
/// No observations give [`FeatureValue::Absent`]. `First` and `Last` keep the
/// earliest-listed observation among equal timestamps.
#[must_use]
pub fn aggregate(aggregation: Aggregation, observations: &[Observation]) -> FeatureValue {
    let numbers = || observations.iter().filter_map(|o| o.value.number());

    match aggregation {
        Aggregation::Min => numbers()
            .reduce(f64::min)
            .map_or(FeatureValue::Absent, FeatureValue::Numeric),
        Aggregation::Max => numbers()
            .reduce(f64::max)
            .map_or(FeatureValue::Absent, FeatureValue::Numeric),
        Aggregation::Mean => {
            let (sum, count) = numbers().fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
            if count == 0 {
                FeatureValue::Absent
            } else {
                FeatureValue::Numeric(sum / count as f64)
            }
        }
        Aggregation::First => observations
            .iter()
            .reduce(|best, o| if o.time < best.time { o } else { best })
            .map_or(FeatureValue::Absent, |o| o.value.into_feature()),
        Aggregation::Last => observations
            .iter()
            .reduce(|best, o| if o.time > best.time { o } else { best })
            .map_or(FeatureValue::Absent, |o| o.value.into_feature()),
        Aggregation::MostInvasive => observations
            .iter()
            .filter_map(|o| o.value.device())
            .max()
            .map_or(FeatureValue::Absent, |d| Observed::Device(d).into_feature()),
    }
}
