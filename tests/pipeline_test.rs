mod utils;

use std::path::PathBuf;

use clif_cohort::algorithm::cohort::{build_cohort_members, cohort_from_encounter_blocks};
use clif_cohort::config::SofaConfig;
use clif_cohort::models::{
    EncounterMappingRow, Hospitalization, Patient, SofaScore, StitchedHospitalization,
    StitchedTransfer, Transfer, VitalRecord,
};
use clif_cohort::pipeline::{self, ClinicalTables, output_file};
use clif_cohort::utils::io::{TableRecord, read_table, table_path, write_table};
use clif_cohort::{ClifConfig, CohortInput, Error};
use utils::{at, base_time, stay, vital};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("clif_cohort_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch directory");
    dir
}

#[test]
fn test_tables_round_trip_through_parquet() {
    let dir = scratch_dir("load");
    let stays = vec![
        stay("h1", "P", at(1, 8), at(1, 14)).with_age(71),
        stay("h2", "P", at(1, 18), at(2, 9)).with_discharge_category("Home"),
    ];
    let vitals = vec![vital("h1", 9, "map", 62.0), vital("h2", 20, "map", 58.0)];
    write_table(&table_path(&dir, Hospitalization::TABLE_NAME), &stays).unwrap();
    write_table(&table_path(&dir, VitalRecord::TABLE_NAME), &vitals).unwrap();

    let tables = ClinicalTables::load(&dir).unwrap();
    assert_eq!(tables.hospitalizations, stays);
    assert_eq!(tables.vitals, vitals);
    assert!(tables.labs.is_empty());

    let stitched = pipeline::stitch(&tables, &ClifConfig::default().stitching).unwrap();
    assert_eq!(stitched.blocks.len(), 1);
    assert_eq!(stitched.hospitalizations[0].age_at_admission, Some(71));
    assert_eq!(stitched.hospitalizations[0].discharge_category.as_deref(), Some("Home"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_hospitalization_table_is_an_error() {
    let dir = scratch_dir("missing");
    let result = ClinicalTables::load(&dir);
    assert!(matches!(result, Err(Error::MissingTable { .. })));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_block_level_run_writes_outputs() {
    let dir = scratch_dir("run");
    let tables = ClinicalTables {
        hospitalizations: vec![
            stay("h1", "P", base_time(), at(1, 6)),
            stay("h2", "P", at(1, 9), at(3, 0)),
            stay("h3", "Q", at(2, 0), at(4, 0)),
        ],
        transfers: vec![
            Transfer::new("h1", Some(base_time()), Some(at(1, 6)), "ed"),
            Transfer::new("h2", Some(at(1, 9)), Some(at(3, 0)), "icu"),
            Transfer::new("h3", Some(at(2, 0)), Some(at(4, 0)), "ward"),
        ],
        patients: vec![Patient::new("P"), Patient::new("Q")],
        vitals: vec![vital("h2", 10, "map", 64.0)],
        ..ClinicalTables::default()
    };

    let stitched = pipeline::stitch(&tables, &ClifConfig::default().stitching).unwrap();
    let windows = cohort_from_encounter_blocks(&stitched.blocks, 24.0);
    let run = pipeline::run_sofa(
        &tables,
        &CohortInput::by_encounter_block(&windows, &stitched.mapping),
        &SofaConfig::default(),
    )
    .unwrap();
    assert_eq!(run.scores.len(), 2);
    assert_eq!(run.scores[0].sofa_cardiovascular, Some(1));

    run.write(&dir).unwrap();
    pipeline::write_stitched(&dir, &stitched).unwrap();

    let scores: Vec<SofaScore> = read_table(&output_file(&dir, SofaScore::TABLE_NAME)).unwrap();
    assert_eq!(scores, run.scores);
    let mapping: Vec<EncounterMappingRow> =
        read_table(&output_file(&dir, EncounterMappingRow::TABLE_NAME)).unwrap();
    assert_eq!(mapping.len(), 3);
    let hospitalizations: Vec<StitchedHospitalization> =
        read_table(&output_file(&dir, StitchedHospitalization::TABLE_NAME)).unwrap();
    assert_eq!(hospitalizations, stitched.hospitalizations);
    let transfers: Vec<StitchedTransfer> =
        read_table(&output_file(&dir, StitchedTransfer::TABLE_NAME)).unwrap();
    assert_eq!(transfers.len(), 3);
    assert_eq!(transfers, stitched.transfers);
    let icu = transfers.iter().find(|t| t.hospitalization_id == "h2").unwrap();
    assert_eq!(icu.encounter_block, transfers[0].encounter_block);
    assert!(dir.join("wide_dataset.parquet").exists());

    let members = build_cohort_members(&stitched.hospitalizations, &tables.patients);
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].hospitalization_id, "h1");

    let _ = std::fs::remove_dir_all(&dir);
}
