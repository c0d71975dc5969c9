//! Patient weight lookup for weight-based doses

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

use crate::models::events::ClinicalEvent;
use crate::models::types::Category;

/// Recorded weights per hospitalization, ordered by time
///
/// Built from every `weight_kg` vital, independent of cohort windows, so a
/// weight charted before the window still applies to doses inside it.
#[derive(Debug, Clone, Default)]
pub struct WeightIndex {
    weights: FxHashMap<String, Vec<(NaiveDateTime, f64)>>,
}

impl WeightIndex {
    /// Index the positive, timestamped `weight_kg` events
    #[must_use]
    pub fn from_events(events: &[ClinicalEvent]) -> Self {
        let mut weights: FxHashMap<String, Vec<(NaiveDateTime, f64)>> = FxHashMap::default();
        for event in events {
            if event.resolved_category() != Some(Category::WeightKg) {
                continue;
            }
            let (Some(time), Some(weight)) = (
                event.event_dttm,
                event.value.as_ref().and_then(|v| v.as_f64()),
            ) else {
                continue;
            };
            if weight.is_finite() && weight > 0.0 {
                weights
                    .entry(event.hospitalization_id.clone())
                    .or_default()
                    .push((time, weight));
            }
        }
        for series in weights.values_mut() {
            series.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Self { weights }
    }

    /// Weight to use for a dose given at `time`
    ///
    /// The latest weight at or before `time`, otherwise the earliest one after it.
    #[must_use]
    pub fn weight_at(&self, hospitalization_id: &str, time: NaiveDateTime) -> Option<f64> {
        let series = self.weights.get(hospitalization_id)?;
        let after = series.partition_point(|(recorded, _)| *recorded <= time);
        if after > 0 {
            Some(series[after - 1].1)
        } else {
            series.first().map(|(_, weight)| *weight)
        }
    }

    /// Number of hospitalizations with at least one weight
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether no weight was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
