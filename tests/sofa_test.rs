mod utils;

use clif_cohort::algorithm::units::ConversionStatus;
use clif_cohort::config::SofaConfig;
use clif_cohort::models::{Category, FeatureValue, LabRecord, SofaComponent, WideRow, WideTable};
use clif_cohort::pipeline::{ClinicalTables, run_sofa};
use clif_cohort::{CohortInput, IssueKind, score_wide_table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use utils::{base_time, day_window, dose, support, vital};

fn lab(id: &str, hours: i64, category: &str, value: f64) -> LabRecord {
    LabRecord {
        hospitalization_id: id.to_string(),
        lab_result_dttm: Some(base_time() + chrono::Duration::hours(hours)),
        lab_category: Some(category.to_string()),
        lab_value_numeric: Some(value),
        reference_unit: None,
    }
}

/// Tables with normal values for every organ of `id`
fn normal_tables(id: &str) -> ClinicalTables {
    ClinicalTables {
        labs: vec![
            lab(id, 2, "creatinine", 1.1),
            lab(id, 2, "platelet_count", 180.0),
            lab(id, 2, "bilirubin_total", 0.8),
            lab(id, 3, "po2_arterial", 112.5),
        ],
        vitals: vec![vital(id, 1, "map", 75.0), vital(id, 1, "weight_kg", 70.0)],
        assessments: vec![clif_cohort::models::AssessmentRecord {
            hospitalization_id: id.to_string(),
            recorded_dttm: Some(base_time() + chrono::Duration::hours(4)),
            assessment_category: Some("gcs_total".to_string()),
            numerical_value: Some(15.0),
            categorical_value: None,
        }],
        respiratory_support: vec![support(id, 3, "Room Air", 0.25)],
        ..ClinicalTables::default()
    }
}

#[test]
fn test_normal_values_score_zero() {
    let tables = normal_tables("h1");
    let windows = vec![day_window("h1", base_time())];
    let run = run_sofa(
        &tables,
        &CohortInput::by_hospitalization(&windows),
        &SofaConfig::default().with_fill_na_scores_with_zero(false),
    )
    .unwrap();

    let score = &run.scores[0];
    for component in SofaComponent::ALL {
        assert_eq!(score.component(component), Some(0), "{component}");
    }
    assert_eq!(score.sofa_total, Some(0));
}

#[test]
fn test_renal_and_norepinephrine_score_six() {
    let mut tables = normal_tables("h1");
    tables.labs[0] = lab("h1", 2, "creatinine", 4.5);
    tables.medications = vec![dose("h1", 5, Category::Norepinephrine, 0.15, "mcg/kg/min")];
    let windows = vec![day_window("h1", base_time())];

    let run = run_sofa(
        &tables,
        &CohortInput::by_hospitalization(&windows),
        &SofaConfig::default(),
    )
    .unwrap();

    let score = &run.scores[0];
    assert_eq!(score.sofa_renal, Some(3));
    assert_eq!(score.sofa_cardiovascular, Some(3));
    assert_eq!(score.sofa_total, Some(6));
}

#[test]
fn test_respiratory_pairs_lowest_pao2_with_highest_fio2() {
    let mut tables = normal_tables("h1");
    tables.labs.retain(|l| l.lab_category.as_deref() != Some("po2_arterial"));
    tables.labs.push(lab("h1", 2, "po2_arterial", 80.0));
    tables.labs.push(lab("h1", 8, "po2_arterial", 300.0));
    tables.respiratory_support = vec![
        support("h1", 2, "Room Air", 0.21),
        support("h1", 8, "IMV", 1.0),
    ];
    let windows = vec![day_window("h1", base_time())];

    let run = run_sofa(
        &tables,
        &CohortInput::by_hospitalization(&windows),
        &SofaConfig::default(),
    )
    .unwrap();

    let row = &run.wide.rows()[0];
    assert_eq!(run.wide.numeric(row, Category::Po2Arterial), Some(80.0));
    assert_eq!(run.wide.numeric(row, Category::Fio2Set), Some(1.0));
    assert_eq!(run.scores[0].sofa_respiratory, Some(4));
}

#[test]
fn test_unconvertible_vasopressor_falls_back_to_map() {
    let mut tables = normal_tables("h1");
    tables.vitals = vec![vital("h1", 1, "map", 65.0)];
    tables.medications = vec![dose("h1", 5, Category::Norepinephrine, 8.0, "mg/hr")];
    let windows = vec![day_window("h1", base_time())];

    let run = run_sofa(
        &tables,
        &CohortInput::by_hospitalization(&windows),
        &SofaConfig::default(),
    )
    .unwrap();

    let row = &run.wide.rows()[0];
    assert_eq!(run.wide.numeric(row, Category::Norepinephrine), None);
    assert_eq!(run.scores[0].sofa_cardiovascular, Some(1));
    assert_eq!(
        run.report
            .count(IssueKind::UnitConversion(ConversionStatus::MissingWeight)),
        1
    );
}

#[test]
fn test_one_score_per_row_in_order() {
    let mut tables = normal_tables("h1");
    let other = normal_tables("h2");
    tables.labs.extend(other.labs);
    let windows = vec![
        day_window("h2", base_time()),
        day_window("h1", base_time()),
        day_window("h3", base_time()),
    ];

    let run = run_sofa(
        &tables,
        &CohortInput::by_hospitalization(&windows),
        &SofaConfig::default(),
    )
    .unwrap();

    let ids: Vec<_> = run.scores.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["h2", "h1", "h3"]);
    assert_eq!(run.scores[2].sofa_total, Some(0));
    assert_eq!(
        run.report
            .count(IssueKind::InsufficientData(SofaComponent::Renal)),
        1
    );
}

#[test]
fn test_scores_stay_in_bounds() {
    let config = SofaConfig::default().with_fill_na_scores_with_zero(false);
    let columns = config.wide_config().unwrap().columns();
    let mut rng = StdRng::seed_from_u64(99);

    let rows: Vec<WideRow> = (0..300)
        .map(|n| {
            let values = columns
                .iter()
                .map(|column| {
                    if rng.random_bool(0.15) {
                        return FeatureValue::Absent;
                    }
                    match column.category {
                        Category::DeviceCategory => FeatureValue::Categorical(
                            ["IMV", "NIPPV", "Nasal Cannula", "Room Air"][rng.random_range(0..4)]
                                .to_string(),
                        ),
                        Category::Fio2Set => FeatureValue::Numeric(rng.random_range(0.21..1.0)),
                        Category::GcsTotal => FeatureValue::Numeric(rng.random_range(3..=15) as f64),
                        category if category.is_medication() => {
                            FeatureValue::Numeric(rng.random_range(0.0..1.0))
                        }
                        _ => FeatureValue::Numeric(rng.random_range(0.0..500.0)),
                    }
                })
                .collect();
            WideRow {
                id: format!("r{n}"),
                start_time: base_time(),
                end_time: base_time(),
                values,
            }
        })
        .collect();
    let table = WideTable::new(columns, rows);

    let result = score_wide_table(&table, &config).unwrap();
    assert_eq!(result.scores.len(), table.len());
    for score in &result.scores {
        let components: Vec<_> = SofaComponent::ALL
            .iter()
            .map(|c| score.component(*c))
            .collect();
        assert!(components.iter().flatten().all(|s| *s <= 4));
        match components.iter().copied().collect::<Option<Vec<u8>>>() {
            Some(all) => {
                let total: u8 = all.iter().sum();
                assert_eq!(score.sofa_total, Some(total));
                assert!(total <= 24);
            }
            None => assert_eq!(score.sofa_total, None),
        }
    }
}
