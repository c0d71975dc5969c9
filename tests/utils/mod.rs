//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use clif_cohort::models::{
    Category, ClinicalEvent, CohortWindow, Hospitalization, MedicationAdmin,
    RespiratorySupportRecord, VitalRecord,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Base time of every fixture: 2024-01-01 00:00
#[must_use]
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid fixture date")
}

/// Timestamp on day `day` (1-based, January 2024) at `hour`
#[must_use]
pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid fixture date")
}

/// Hospitalization with both timestamps present
#[must_use]
pub fn stay(id: &str, patient: &str, admission: NaiveDateTime, discharge: NaiveDateTime) -> Hospitalization {
    Hospitalization::new(id, patient, Some(admission), Some(discharge))
}

/// 24 hour window starting at `start`
#[must_use]
pub fn day_window(id: &str, start: NaiveDateTime) -> CohortWindow {
    CohortWindow::first_hours(id, start, 24.0)
}

/// Numeric event `hours` after the base time
#[must_use]
pub fn event(id: &str, hours: i64, category: Category, value: f64) -> ClinicalEvent {
    ClinicalEvent::numeric(id, base_time() + Duration::hours(hours), category, value)
}

/// Device event `hours` after the base time
#[must_use]
pub fn device(id: &str, hours: i64, label: &str) -> ClinicalEvent {
    ClinicalEvent::categorical(id, base_time() + Duration::hours(hours), Category::DeviceCategory, label)
}

/// Medication administration `hours` after the base time
#[must_use]
pub fn dose(id: &str, hours: i64, category: Category, value: f64, unit: &str) -> MedicationAdmin {
    MedicationAdmin::new(id, base_time() + Duration::hours(hours), category, value, unit)
}

/// Vital sign row `hours` after the base time
#[must_use]
pub fn vital(id: &str, hours: i64, category: &str, value: f64) -> VitalRecord {
    VitalRecord {
        hospitalization_id: id.to_string(),
        recorded_dttm: Some(base_time() + Duration::hours(hours)),
        vital_category: Some(category.to_string()),
        vital_value: Some(value),
    }
}

/// Respiratory support row `hours` after the base time
#[must_use]
pub fn support(id: &str, hours: i64, device: &str, fio2: f64) -> RespiratorySupportRecord {
    RespiratorySupportRecord {
        hospitalization_id: id.to_string(),
        recorded_dttm: Some(base_time() + Duration::hours(hours)),
        device_category: Some(device.to_string()),
        fio2_set: Some(fio2),
    }
}

/// Random hospitalizations for `patients` patients, reproducible from `seed`
///
/// Stays of one patient are spread over a month with gaps between 0 and 48
/// hours, and some stays overlap their predecessor.
#[must_use]
pub fn random_hospitalizations(seed: u64, patients: usize) -> Vec<Hospitalization> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut stays = Vec::new();
    for patient in 0..patients {
        let mut cursor = base_time() + Duration::hours(rng.random_range(0..240));
        for n in 0..rng.random_range(1..6) {
            let length = Duration::hours(rng.random_range(2..96));
            let admission = cursor;
            let discharge = admission + length;
            stays.push(
                Hospitalization::new(
                    format!("h{patient}_{n}"),
                    format!("p{patient}"),
                    Some(admission),
                    Some(discharge),
                )
                .with_age(rng.random_range(18..95)),
            );
            cursor = discharge + Duration::hours(rng.random_range(-4..48));
        }
    }
    stays
}
