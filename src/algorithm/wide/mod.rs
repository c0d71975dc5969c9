//! Temporal feature assembly
//!
//! Events from all source tables are routed to the cohort id they belong to,
//! filtered to that id's window and reduced to one value per configured
//! feature. Routing is a single pass over the events; the per-id reduction
//! runs in parallel.

pub mod aggregation;
pub mod weights;

use std::time::Instant;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithm::units::UnitNormalizer;
use crate::config::{FeatureSpec, WideDatasetConfig};
use crate::error::{DataQualityIssue, Error, IssueKind, QualityReport, Result};
use crate::models::cohort::{CohortKey, CohortWindow};
use crate::models::encounter::EncounterMapping;
use crate::models::events::{ClinicalEvent, EventValue, MedicationAdmin};
use crate::models::types::{Category, DeviceCategory, ValueKind};
use crate::models::wide::{WideRow, WideTable};
use crate::utils::logging::{
    create_stage_progress_bar, finish_progress_bar, log_stage_complete, log_stage_start,
};

pub use aggregation::{Observation, Observed, aggregate};
pub use weights::WeightIndex;

const STAGE: &str = "Wide dataset assembly";

/// Cohort windows together with how their ids relate to event tables
#[derive(Debug, Clone, Copy)]
pub struct CohortInput<'a> {
    /// One window per cohort id
    pub windows: &'a [CohortWindow],
    /// Meaning of the window ids
    pub key: CohortKey,
    /// Mapping used to re-key events when ids are encounter blocks
    pub mapping: Option<&'a EncounterMapping>,
}

impl<'a> CohortInput<'a> {
    /// Cohort keyed by hospitalization id
    #[must_use]
    pub const fn by_hospitalization(windows: &'a [CohortWindow]) -> Self {
        Self {
            windows,
            key: CohortKey::Hospitalization,
            mapping: None,
        }
    }

    /// Cohort keyed by encounter block
    #[must_use]
    pub const fn by_encounter_block(
        windows: &'a [CohortWindow],
        mapping: &'a EncounterMapping,
    ) -> Self {
        Self {
            windows,
            key: CohortKey::EncounterBlock,
            mapping: Some(mapping),
        }
    }

    /// Cohort id an event of `hospitalization_id` belongs to
    fn cohort_id(&self, hospitalization_id: &str) -> Option<String> {
        match self.key {
            CohortKey::Hospitalization => Some(hospitalization_id.to_string()),
            CohortKey::EncounterBlock => self
                .mapping
                .and_then(|mapping| mapping.block_of(hospitalization_id))
                .map(|block| block.to_string()),
        }
    }
}

/// Wide table and the records excluded while building it
#[derive(Debug, Clone, Default)]
pub struct WideDatasetResult {
    /// One row per valid cohort window
    pub table: WideTable,
    /// Excluded windows and events
    pub report: QualityReport,
}

/// Observations collected per cohort id, one bucket per column
type Buckets = FxHashMap<String, Vec<Vec<Observation>>>;

/// Build the wide table for a cohort
///
/// Every configured feature becomes a column, whether or not any event
/// qualifies. Medication doses go through `normalizer`; a dose that does not
/// convert is left out of the aggregate and counted by status.
pub fn assemble_wide_dataset(
    cohort: &CohortInput<'_>,
    events: &[ClinicalEvent],
    medications: &[MedicationAdmin],
    config: &WideDatasetConfig,
    normalizer: &dyn UnitNormalizer,
) -> Result<WideDatasetResult> {
    if cohort.key == CohortKey::EncounterBlock && cohort.mapping.is_none() {
        return Err(Error::configuration(
            "cohort keyed by encounter block needs an encounter mapping",
        ));
    }

    let start = Instant::now();
    log_stage_start(STAGE, cohort.windows.len());

    let mut report = QualityReport::new();
    let windows = screen_windows(cohort.windows, &mut report);
    let by_id: FxHashMap<&str, &CohortWindow> =
        windows.iter().map(|w| (w.id.as_str(), *w)).collect();

    let columns: FxHashMap<Category, usize> = config
        .features()
        .iter()
        .enumerate()
        .map(|(idx, feature)| (feature.category, idx))
        .collect();
    let width = columns.len();

    let mut router = Router {
        cohort,
        windows: &by_id,
        columns: &columns,
        config,
        buckets: FxHashMap::default(),
        report: &mut report,
        width,
    };
    for event in events {
        router.route_event(event);
    }

    let needs_medications = config.features().iter().any(|f| f.category.is_medication());
    if needs_medications {
        let weights = WeightIndex::from_events(events);
        log::debug!("Weights available for {} hospitalizations", weights.len());
        for admin in medications {
            router.route_medication(admin, &weights, normalizer);
        }
    }
    let buckets = router.buckets;

    let pb = create_stage_progress_bar(
        windows.len() as u64,
        "Aggregating features",
        config.show_progress,
    );
    let rows: Vec<WideRow> = windows
        .par_iter()
        .map(|window| {
            let row = build_row(window, buckets.get(&window.id), config.features());
            pb.inc(1);
            row
        })
        .collect();
    finish_progress_bar(&pb, Some("Aggregation complete"));

    let table = WideTable::new(config.columns(), rows);
    report.log_summary(STAGE);
    log_stage_complete(STAGE, table.len(), report.len(), start.elapsed());

    Ok(WideDatasetResult { table, report })
}

/// Keep valid windows, first occurrence of each id
fn screen_windows<'a>(
    windows: &'a [CohortWindow],
    report: &mut QualityReport,
) -> Vec<&'a CohortWindow> {
    let mut seen = FxHashSet::default();
    let mut kept = Vec::with_capacity(windows.len());
    for window in windows {
        if window.id.trim().is_empty() {
            report.record(DataQualityIssue::MissingIdentifier, "", "cohort window without id");
        } else if !window.is_valid() {
            report.record(
                DataQualityIssue::InvalidWindow,
                window.id.as_str(),
                format!("start {} after end {}", window.start_time, window.end_time),
            );
        } else if !seen.insert(window.id.as_str()) {
            report.record(
                DataQualityIssue::DuplicateIdentifier,
                window.id.as_str(),
                "cohort id listed more than once, first window kept",
            );
        } else {
            kept.push(window);
        }
    }
    kept
}

fn build_row(
    window: &CohortWindow,
    buckets: Option<&Vec<Vec<Observation>>>,
    features: &[FeatureSpec],
) -> WideRow {
    let values = features
        .iter()
        .enumerate()
        .map(|(idx, feature)| {
            let observations = buckets.and_then(|b| b.get(idx)).map_or(&[][..], Vec::as_slice);
            aggregate(feature.aggregation, observations)
        })
        .collect();
    WideRow {
        id: window.id.clone(),
        start_time: window.start_time,
        end_time: window.end_time,
        values,
    }
}

/// FiO2 recorded as a percentage is converted to a fraction
#[must_use]
pub fn fio2_fraction(value: f64) -> f64 {
    if value > 1.0 { value / 100.0 } else { value }
}

/// Routes events into per-id column buckets, reporting what it drops
struct Router<'r, 'a> {
    cohort: &'r CohortInput<'a>,
    windows: &'r FxHashMap<&'a str, &'a CohortWindow>,
    columns: &'r FxHashMap<Category, usize>,
    config: &'r WideDatasetConfig,
    buckets: Buckets,
    report: &'r mut QualityReport,
    width: usize,
}

impl Router<'_, '_> {
    /// Cohort id and column of a record, or `None` when it is not requested
    fn target(
        &mut self,
        hospitalization_id: &str,
        category: Option<Category>,
    ) -> Option<(String, usize)> {
        let column = *self.columns.get(&category?)?;
        if hospitalization_id.trim().is_empty() {
            self.report.record(
                DataQualityIssue::MissingIdentifier,
                "",
                "event without hospitalization id",
            );
            return None;
        }
        let Some(id) = self.cohort.cohort_id(hospitalization_id) else {
            self.report.record(
                DataQualityIssue::UnknownHospitalization,
                hospitalization_id,
                "hospitalization is not in the encounter mapping",
            );
            return None;
        };
        Some((id, column))
    }

    /// Window of a cohort id if the event time falls inside it
    fn in_window(
        &mut self,
        id: &str,
        record_id: &str,
        time: Option<NaiveDateTime>,
    ) -> Option<NaiveDateTime> {
        let window = self.windows.get(id)?;
        let Some(time) = time else {
            self.report.record(
                DataQualityIssue::MissingTimestamp,
                record_id,
                "event without timestamp",
            );
            return None;
        };
        window.contains(time).then_some(time)
    }

    fn plausible(&mut self, category: Category, value: f64, record_id: &str) -> bool {
        let plausible = self
            .config
            .outlier_ranges
            .as_ref()
            .is_none_or(|ranges| ranges.is_plausible(category, value));
        if !plausible {
            self.report.record(
                DataQualityIssue::Outlier,
                record_id,
                format!("{category} = {value}"),
            );
        }
        plausible
    }

    fn push(&mut self, id: String, column: usize, observation: Observation) {
        let width = self.width;
        self.buckets
            .entry(id)
            .or_insert_with(|| vec![Vec::new(); width])[column]
            .push(observation);
    }

    fn route_event(&mut self, event: &ClinicalEvent) {
        let category = event.resolved_category();
        let Some((id, column)) = self.target(&event.hospitalization_id, category) else {
            return;
        };
        let Some(category) = category else { return };
        let record_id = event.hospitalization_id.as_str();
        let Some(time) = self.in_window(&id, record_id, event.event_dttm) else {
            return;
        };

        let value = match (category.value_kind(), &event.value) {
            (ValueKind::Numeric, Some(EventValue::Numeric(v))) if v.is_finite() => {
                let v = if category == Category::Fio2Set { fio2_fraction(*v) } else { *v };
                if !self.plausible(category, v, record_id) {
                    return;
                }
                Observed::Number(v)
            }
            (ValueKind::Categorical, Some(EventValue::Categorical(label))) => {
                match DeviceCategory::parse(label) {
                    Some(device) => Observed::Device(device),
                    None => {
                        self.report.record(
                            DataQualityIssue::MissingValue,
                            record_id,
                            format!("unrecognised {category} '{label}'"),
                        );
                        return;
                    }
                }
            }
            _ => {
                self.report.record(
                    DataQualityIssue::MissingValue,
                    record_id,
                    format!("{category} without a usable value"),
                );
                return;
            }
        };

        self.push(id, column, Observation { time, value });
    }

    fn route_medication(
        &mut self,
        admin: &MedicationAdmin,
        weights: &WeightIndex,
        normalizer: &dyn UnitNormalizer,
    ) {
        let category = admin.resolved_category();
        let Some((id, column)) = self.target(&admin.hospitalization_id, category) else {
            return;
        };
        let Some(category) = category else { return };
        let record_id = admin.hospitalization_id.as_str();
        let Some(time) = self.in_window(&id, record_id, admin.admin_dttm) else {
            return;
        };
        let Some(dose) = admin.med_dose.filter(|d| d.is_finite()) else {
            self.report.record(
                DataQualityIssue::MissingValue,
                record_id,
                format!("{category} without dose"),
            );
            return;
        };
        let Some(target_unit) = self.config.features()[column].unit.as_deref() else {
            return;
        };

        let weight = weights.weight_at(record_id, time);
        let conversion = normalizer.normalize(
            category,
            dose,
            admin.med_dose_unit.as_deref(),
            target_unit,
            weight,
        );
        let Some(converted) = conversion.converted() else {
            self.report.record(
                IssueKind::UnitConversion(conversion.status),
                record_id,
                format!(
                    "{category} {dose} {} to {target_unit}",
                    admin.med_dose_unit.as_deref().unwrap_or("<no unit>")
                ),
            );
            return;
        };
        if !self.plausible(category, converted, record_id) {
            return;
        }

        self.push(
            id,
            column,
            Observation {
                time,
                value: Observed::Number(converted),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::units::StandardDoseConverter;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn config() -> WideDatasetConfig {
        WideDatasetConfig::new(vec![
            FeatureSpec::worst(Category::PlateletCount),
            FeatureSpec::worst(Category::Fio2Set),
        ])
        .unwrap()
    }

    #[test]
    fn test_window_filter_and_absent_marker() {
        let windows = vec![
            CohortWindow::new("h1", at(0), at(12)),
            CohortWindow::new("h2", at(0), at(12)),
        ];
        let events = vec![
            ClinicalEvent::numeric("h1", at(2), Category::PlateletCount, 120.0),
            ClinicalEvent::numeric("h1", at(13), Category::PlateletCount, 40.0),
            ClinicalEvent::numeric("h1", at(3), Category::Fio2Set, 40.0),
        ];
        let result = assemble_wide_dataset(
            &CohortInput::by_hospitalization(&windows),
            &events,
            &[],
            &config(),
            &StandardDoseConverter::new(),
        )
        .unwrap();

        let table = &result.table;
        let h1 = table.row("h1").unwrap();
        assert_eq!(table.numeric(h1, Category::PlateletCount), Some(120.0));
        assert_eq!(table.numeric(h1, Category::Fio2Set), Some(0.4));
        let h2 = table.row("h2").unwrap();
        assert!(h2.values.iter().all(|v| v.is_absent()));
        assert!(result.report.is_empty());
    }

    #[test]
    fn test_block_key_requires_mapping() {
        let cohort = CohortInput {
            windows: &[],
            key: CohortKey::EncounterBlock,
            mapping: None,
        };
        let result =
            assemble_wide_dataset(&cohort, &[], &[], &config(), &StandardDoseConverter::new());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_fio2_fraction() {
        assert_eq!(fio2_fraction(0.5), 0.5);
        assert_eq!(fio2_fraction(1.0), 1.0);
        assert_eq!(fio2_fraction(60.0), 0.6);
    }
}
