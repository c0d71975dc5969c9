//! SOFA score rows

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::io::TableRecord;

/// Organ system scored by SOFA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SofaComponent {
    /// PaO2/FiO2 ratio with respiratory support
    Respiratory,
    /// Platelet count
    Coagulation,
    /// Total bilirubin
    Liver,
    /// Mean arterial pressure and vasopressors
    Cardiovascular,
    /// Glasgow Coma Scale
    Cns,
    /// Creatinine
    Renal,
}

impl SofaComponent {
    /// All six components in output order
    pub const ALL: [Self; 6] = [
        Self::Respiratory,
        Self::Coagulation,
        Self::Liver,
        Self::Cardiovascular,
        Self::Cns,
        Self::Renal,
    ];

    /// Output column name
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Respiratory => "sofa_respiratory",
            Self::Coagulation => "sofa_coagulation",
            Self::Liver => "sofa_liver",
            Self::Cardiovascular => "sofa_cardiovascular",
            Self::Cns => "sofa_cns",
            Self::Renal => "sofa_renal",
        }
    }
}

impl fmt::Display for SofaComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Scores for one cohort id
///
/// A component is `None` when it was undetermined and the run did not fill
/// missing components with zero; `sofa_total` is `None` whenever any
/// component is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SofaScore {
    /// Cohort id
    pub id: String,
    /// Respiratory component (0-4)
    pub sofa_respiratory: Option<u8>,
    /// Coagulation component (0-4)
    pub sofa_coagulation: Option<u8>,
    /// Liver component (0-4)
    pub sofa_liver: Option<u8>,
    /// Cardiovascular component (0-4)
    pub sofa_cardiovascular: Option<u8>,
    /// Central nervous system component (0-4)
    pub sofa_cns: Option<u8>,
    /// Renal component (0-4)
    pub sofa_renal: Option<u8>,
    /// Sum of the six components (0-24)
    pub sofa_total: Option<u8>,
}

impl SofaScore {
    /// Build a row from per-component scores, computing the total
    #[must_use]
    pub fn from_components(id: impl Into<String>, components: [Option<u8>; 6]) -> Self {
        let sofa_total = components
            .iter()
            .try_fold(0u8, |total, component| component.map(|score| total + score));
        let [
            sofa_respiratory,
            sofa_coagulation,
            sofa_liver,
            sofa_cardiovascular,
            sofa_cns,
            sofa_renal,
        ] = components;
        Self {
            id: id.into(),
            sofa_respiratory,
            sofa_coagulation,
            sofa_liver,
            sofa_cardiovascular,
            sofa_cns,
            sofa_renal,
            sofa_total,
        }
    }

    /// Score of one component
    #[must_use]
    pub const fn component(&self, component: SofaComponent) -> Option<u8> {
        match component {
            SofaComponent::Respiratory => self.sofa_respiratory,
            SofaComponent::Coagulation => self.sofa_coagulation,
            SofaComponent::Liver => self.sofa_liver,
            SofaComponent::Cardiovascular => self.sofa_cardiovascular,
            SofaComponent::Cns => self.sofa_cns,
            SofaComponent::Renal => self.sofa_renal,
        }
    }
}

impl TableRecord for SofaScore {
    const TABLE_NAME: &'static str = "sofa_scores";
}

/// Distribution of determined SOFA totals
#[derive(Debug, Clone, PartialEq)]
pub struct SofaSummary {
    /// Number of scored rows
    pub rows: usize,
    /// Rows with a determined total
    pub determined: usize,
    /// Mean total
    pub mean: Option<f64>,
    /// Median total
    pub median: Option<f64>,
    /// Minimum total
    pub min: Option<u8>,
    /// Maximum total
    pub max: Option<u8>,
}

impl SofaSummary {
    /// Summarise a score table
    #[must_use]
    pub fn from_scores(scores: &[SofaScore]) -> Self {
        let mut totals: Vec<u8> = scores.iter().filter_map(|s| s.sofa_total).collect();
        totals.sort_unstable();

        let determined = totals.len();
        let mean = (determined > 0)
            .then(|| totals.iter().map(|&t| f64::from(t)).sum::<f64>() / determined as f64);
        let median = match determined {
            0 => None,
            n if n % 2 == 1 => Some(f64::from(totals[n / 2])),
            n => Some((f64::from(totals[n / 2 - 1]) + f64::from(totals[n / 2])) / 2.0),
        };

        Self {
            rows: scores.len(),
            determined,
            mean,
            median,
            min: totals.first().copied(),
            max: totals.last().copied(),
        }
    }
}

impl fmt::Display for SofaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SOFA Summary:")?;
        writeln!(f, "  Rows: {}", self.rows)?;
        writeln!(f, "  Determined totals: {}", self.determined)?;
        if let (Some(mean), Some(median)) = (self.mean, self.median) {
            writeln!(f, "  Mean: {mean:.2}")?;
            writeln!(f, "  Median: {median:.2}")?;
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            writeln!(f, "  Range: {min} - {max}")?;
        }
        Ok(())
    }
}
