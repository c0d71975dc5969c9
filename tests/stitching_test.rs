mod utils;

use std::collections::BTreeMap;

use clif_cohort::config::StitchingConfig;
use clif_cohort::models::{Hospitalization, Transfer};
use clif_cohort::{DataQualityIssue, stitch_encounters};
use utils::{at, random_hospitalizations, stay};

fn stitch(stays: &[Hospitalization], gap_hours: f64) -> clif_cohort::StitchResult {
    let config = StitchingConfig::default().with_gap_hours(gap_hours);
    stitch_encounters(stays, &[], &config).expect("valid configuration")
}

#[test]
fn test_four_hour_gap_merges() {
    let stays = vec![
        stay("h1", "P", at(1, 8), at(1, 14)),
        stay("h2", "P", at(1, 18), at(2, 9)),
    ];
    let result = stitch(&stays, 6.0);

    assert_eq!(result.blocks.len(), 1);
    assert_eq!(result.blocks[0].block_start, at(1, 8));
    assert_eq!(result.blocks[0].block_end, at(2, 9));
    assert_eq!(result.mapping.block_of("h1"), result.mapping.block_of("h2"));
    assert_eq!(result.mapping.hospitalizations_in(1), vec!["h1", "h2"]);
}

#[test]
fn test_eight_hour_gap_splits() {
    let stays = vec![
        stay("h1", "P", at(1, 8), at(1, 14)),
        stay("h2", "P", at(1, 22), at(2, 9)),
    ];
    let result = stitch(&stays, 6.0);

    assert_eq!(result.blocks.len(), 2);
    assert_eq!(result.mapping.block_of("h1"), Some(1));
    assert_eq!(result.mapping.block_of("h2"), Some(2));
}

#[test]
fn test_stitching_is_idempotent() {
    let stays = random_hospitalizations(7, 40);
    let first = stitch(&stays, 6.0);
    let second = stitch(&stays, 6.0);

    assert_eq!(first.blocks, second.blocks);
    assert_eq!(first.mapping, second.mapping);
    assert_eq!(first.hospitalizations, second.hospitalizations);
}

#[test]
fn test_block_ids_do_not_depend_on_input_order() {
    let stays = random_hospitalizations(11, 25);
    let mut reversed = stays.clone();
    reversed.reverse();

    let forward = stitch(&stays, 6.0);
    let backward = stitch(&reversed, 6.0);
    assert_eq!(forward.blocks.len(), backward.blocks.len());
    for stay in &stays {
        let id = stay.hospitalization_id.as_str();
        assert_eq!(forward.mapping.block_of(id), backward.mapping.block_of(id), "{id}");
    }
}

#[test]
fn test_blocks_partition_hospitalizations() {
    let stays = random_hospitalizations(3, 50);
    let result = stitch(&stays, 6.0);

    let mut seen: Vec<&str> = result
        .blocks
        .iter()
        .flat_map(|block| block.hospitalization_ids.iter().map(String::as_str))
        .collect();
    seen.sort_unstable();
    let mut expected: Vec<&str> = stays.iter().map(|s| s.hospitalization_id.as_str()).collect();
    expected.sort_unstable();
    assert_eq!(seen, expected);

    for block in &result.blocks {
        for id in &block.hospitalization_ids {
            let member = stays.iter().find(|s| &s.hospitalization_id == id).unwrap();
            assert_eq!(member.patient_id, block.patient_id);
            assert!(member.admission_dttm.unwrap() >= block.block_start);
            assert!(member.discharge_dttm.unwrap() <= block.block_end);
        }
    }
}

#[test]
fn test_adjacent_blocks_are_separated_by_more_than_the_gap() {
    for seed in [3, 17, 29] {
        let stays = random_hospitalizations(seed, 50);
        let result = stitch(&stays, 6.0);

        let mut by_patient: BTreeMap<&str, Vec<_>> = BTreeMap::new();
        for block in &result.blocks {
            by_patient.entry(block.patient_id.as_str()).or_default().push(block);
        }
        for (patient, mut blocks) in by_patient {
            blocks.sort_by_key(|block| block.block_start);
            for pair in blocks.windows(2) {
                let gap = pair[1].block_start - pair[0].block_end;
                assert!(
                    gap > chrono::Duration::hours(6),
                    "{patient}: blocks {} and {} are {gap} apart",
                    pair[0].encounter_block,
                    pair[1].encounter_block
                );
            }
        }
    }
}

#[test]
fn test_larger_gap_never_adds_blocks() {
    let stays = random_hospitalizations(42, 60);
    let per_patient = |gap: f64| -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for block in stitch(&stays, gap).blocks {
            *counts.entry(block.patient_id).or_insert(0) += 1;
        }
        counts
    };

    let mut previous = per_patient(0.0);
    for gap in [2.0, 6.0, 12.0, 24.0, 72.0] {
        let current = per_patient(gap);
        for (patient, count) in &current {
            assert!(count <= &previous[patient], "{patient} gained blocks at gap {gap}");
        }
        previous = current;
    }
}

#[test]
fn test_every_stitchable_hospitalization_is_mapped_once() {
    let mut stays = random_hospitalizations(5, 30);
    stays.push(Hospitalization::new("no_discharge", "p0", Some(at(3, 0)), None));
    stays.push(stay("backwards", "p1", at(5, 12), at(5, 6)));

    let result = stitch(&stays, 6.0);

    assert_eq!(result.mapping.len(), stays.len() - 2);
    for stay in &stays[..stays.len() - 2] {
        assert!(result.mapping.block_of(&stay.hospitalization_id).is_some());
    }
    assert_eq!(result.mapping.block_of("no_discharge"), None);
    assert_eq!(result.report.count(DataQualityIssue::MissingTimestamp.into()), 1);
    assert_eq!(result.report.count(DataQualityIssue::InvertedInterval.into()), 1);
}

#[test]
fn test_transfers_follow_their_block() {
    let stays = vec![
        stay("h1", "P", at(1, 8), at(1, 14)),
        stay("h2", "P", at(1, 18), at(2, 9)),
    ];
    let transfers = vec![
        Transfer::new("h2", Some(at(1, 18)), Some(at(2, 9)), "icu"),
        Transfer::new("h1", Some(at(1, 8)), Some(at(1, 14)), "ed"),
        Transfer::new("elsewhere", Some(at(1, 8)), None, "ward"),
    ];
    let result = stitch_encounters(&stays, &transfers, &StitchingConfig::default()).unwrap();

    let locations: Vec<_> = result
        .transfers
        .iter()
        .map(|t| (t.encounter_block, t.location_category.as_deref()))
        .collect();
    assert_eq!(locations, vec![(1, Some("ed")), (1, Some("icu"))]);
    assert_eq!(
        result
            .report
            .count(DataQualityIssue::UnknownHospitalization.into()),
        1
    );
}

#[test]
fn test_negative_gap_is_rejected() {
    let config = StitchingConfig::default().with_gap_hours(-1.0);
    assert!(stitch_encounters(&[], &[], &config).is_err());
}

#[test]
fn test_out_of_range_gap_is_rejected() {
    let stays = vec![
        stay("h1", "P", at(1, 8), at(1, 14)),
        stay("h2", "P", at(1, 18), at(2, 9)),
    ];
    let config = StitchingConfig::default().with_gap_hours(1e13);
    let result = stitch_encounters(&stays, &[], &config);
    assert!(matches!(result, Err(clif_cohort::Error::Configuration(_))));
}
