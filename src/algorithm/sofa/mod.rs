//! SOFA scoring
//!
//! Scores every wide row independently: six organ components from fixed
//! threshold ladders, summed to a total. A component without any qualifying
//! value is reported as insufficient data and then either scored 0 or left
//! undetermined, depending on `fill_na_scores_with_zero`.

pub mod components;
pub mod thresholds;

use std::time::Instant;

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::algorithm::units::DoseUnit;
use crate::config::SofaConfig;
use crate::config::sofa::{REQUIRED_CATEGORIES, VASOPRESSOR_UNIT};
use crate::error::{DataQualityIssue, Error, IssueKind, QualityReport, Result};
use crate::models::sofa::{SofaComponent, SofaScore, SofaSummary};
use crate::models::types::Category;
use crate::models::wide::{WideRow, WideTable};
use crate::utils::logging::{
    create_stage_progress_bar, finish_progress_bar, log_stage_complete, log_stage_start,
};

pub use components::SofaInputs;
pub use thresholds::SofaThresholds;

const STAGE: &str = "SOFA scoring";

/// Scores and the issues found while computing them
#[derive(Debug, Clone, Default)]
pub struct SofaResult {
    /// One score per wide row, in row order
    pub scores: Vec<SofaScore>,
    /// Insufficient data and rejected outliers
    pub report: QualityReport,
}

impl SofaResult {
    /// Summary of the determined totals
    #[must_use]
    pub fn summary(&self) -> SofaSummary {
        SofaSummary::from_scores(&self.scores)
    }
}

/// Check that the table carries every column the scorer reads
fn check_columns(table: &WideTable, config: &SofaConfig) -> Result<()> {
    let mut required = REQUIRED_CATEGORIES.to_vec();
    if config.impute_pf_from_spo2 {
        required.push(Category::Spo2);
    }
    for category in required {
        if table.category_index(category).is_none() {
            return Err(Error::configuration(format!(
                "wide table has no '{category}' column required for SOFA scoring"
            )));
        }
    }

    let expected = DoseUnit::parse(VASOPRESSOR_UNIT);
    for category in Category::VASOPRESSORS {
        let unit = table
            .columns()
            .iter()
            .find(|column| column.category == category)
            .and_then(|column| column.unit.as_deref());
        if unit.and_then(DoseUnit::parse) != expected {
            return Err(Error::configuration(format!(
                "wide column for '{category}' is not in {VASOPRESSOR_UNIT}"
            )));
        }
    }
    Ok(())
}

/// Component scores of one row, `None` where no input was available
#[must_use]
pub fn score_components(inputs: &SofaInputs, config: &SofaConfig) -> [Option<u8>; 6] {
    let t = &config.thresholds;
    SofaComponent::ALL.map(|component| match component {
        SofaComponent::Respiratory => {
            components::respiratory_score(inputs, t, config.impute_pf_from_spo2)
        }
        SofaComponent::Coagulation => components::coagulation_score(inputs, t),
        SofaComponent::Liver => components::liver_score(inputs, t),
        SofaComponent::Cardiovascular => components::cardiovascular_score(inputs, t),
        SofaComponent::Cns => components::cns_score(inputs, t),
        SofaComponent::Renal => components::renal_score(inputs, t),
    })
}

/// Issues found while scoring one row
type RowIssues = SmallVec<[(IssueKind, String); 6]>;

fn score_row(table: &WideTable, row: &WideRow, config: &SofaConfig) -> (SofaScore, RowIssues) {
    let ranges = config.remove_outliers.then_some(&config.outlier_ranges);
    let (inputs, rejected) = SofaInputs::from_row(table, row, ranges);

    let mut issues = RowIssues::new();
    for (category, value) in rejected {
        issues.push((
            DataQualityIssue::Outlier.into(),
            format!("{category} = {value}"),
        ));
    }

    let mut scores = score_components(&inputs, config);
    for (component, score) in SofaComponent::ALL.iter().zip(scores.iter_mut()) {
        if score.is_none() {
            issues.push((
                IssueKind::InsufficientData(*component),
                "no qualifying value in window".to_string(),
            ));
            if config.fill_na_scores_with_zero {
                *score = Some(0);
            }
        }
    }

    (SofaScore::from_components(row.id.clone(), scores), issues)
}

/// Score every row of a wide table
///
/// Output rows match input rows one to one and keep their order.
pub fn score_wide_table(table: &WideTable, config: &SofaConfig) -> Result<SofaResult> {
    config.thresholds.validate()?;
    check_columns(table, config)?;

    let start = Instant::now();
    log_stage_start(STAGE, table.len());

    let pb = create_stage_progress_bar(table.len() as u64, "Scoring rows", config.show_progress);
    let scored: Vec<(SofaScore, RowIssues)> = table
        .rows()
        .par_iter()
        .map(|row| {
            let result = score_row(table, row, config);
            pb.inc(1);
            result
        })
        .collect();
    finish_progress_bar(&pb, Some("Scoring complete"));

    let mut report = QualityReport::new();
    let mut scores = Vec::with_capacity(scored.len());
    for (score, issues) in scored {
        for (kind, detail) in issues {
            report.record(kind, score.id.as_str(), detail);
        }
        scores.push(score);
    }

    report.log_summary(STAGE);
    log_stage_complete(STAGE, scores.len(), 0, start.elapsed());

    Ok(SofaResult { scores, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WideDatasetConfig;
    use crate::models::wide::FeatureValue;
    use chrono::NaiveDate;

    fn table(values: &[(Category, FeatureValue)]) -> WideTable {
        let config = SofaConfig::default().wide_config().unwrap();
        let columns = config.columns();
        let row_values = columns
            .iter()
            .map(|column| {
                values
                    .iter()
                    .find(|(category, _)| *category == column.category)
                    .map_or(FeatureValue::Absent, |(_, value)| value.clone())
            })
            .collect();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let row = WideRow {
            id: "h1".to_string(),
            start_time: start,
            end_time: start,
            values: row_values,
        };
        WideTable::new(columns, vec![row])
    }

    #[test]
    fn test_missing_components_follow_fill_policy() {
        let wide = table(&[(Category::Creatinine, FeatureValue::Numeric(2.5))]);

        let filled = score_wide_table(&wide, &SofaConfig::default()).unwrap();
        assert_eq!(filled.scores[0].sofa_renal, Some(2));
        assert_eq!(filled.scores[0].sofa_total, Some(2));
        assert_eq!(filled.report.len(), 5);

        let config = SofaConfig::default().with_fill_na_scores_with_zero(false);
        let strict = score_wide_table(&wide, &config).unwrap();
        assert_eq!(strict.scores[0].sofa_renal, Some(2));
        assert_eq!(strict.scores[0].sofa_liver, None);
        assert_eq!(strict.scores[0].sofa_total, None);
        assert_eq!(
            strict
                .report
                .count(IssueKind::InsufficientData(SofaComponent::Liver)),
            1
        );
    }

    #[test]
    fn test_implausible_value_is_dropped() {
        let wide = table(&[(Category::Creatinine, FeatureValue::Numeric(-3.0))]);
        let result = score_wide_table(&wide, &SofaConfig::default()).unwrap();
        assert_eq!(result.scores[0].sofa_renal, Some(0));
        assert_eq!(result.report.count(DataQualityIssue::Outlier.into()), 1);

        let kept = SofaConfig::default().with_remove_outliers(false);
        let result = score_wide_table(&wide, &kept).unwrap();
        assert_eq!(result.report.count(DataQualityIssue::Outlier.into()), 0);
    }

    #[test]
    fn test_missing_column_is_a_configuration_error() {
        let config = WideDatasetConfig::new(vec![crate::config::FeatureSpec::worst(
            Category::Creatinine,
        )])
        .unwrap();
        let wide = WideTable::new(config.columns(), Vec::new());
        let result = score_wide_table(&wide, &SofaConfig::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
