//! Record-level quality reporting
//!
//! Records that cannot take part in a computation are excluded and logged
//! here instead of failing the batch.

use std::collections::BTreeMap;
use std::fmt;

use crate::algorithm::units::ConversionStatus;
use crate::models::sofa::SofaComponent;

/// Data quality problems that cause a record to be excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataQualityIssue {
    /// Identifier (hospitalization, patient or cohort id) is null or empty
    MissingIdentifier,
    /// A required timestamp is null
    MissingTimestamp,
    /// Interval ends before it starts
    InvertedInterval,
    /// Record refers to a hospitalization that is unknown or could not be stitched
    UnknownHospitalization,
    /// Cohort window with `start_time > end_time`
    InvalidWindow,
    /// Identifier listed more than once in a table keyed by it
    DuplicateIdentifier,
    /// Numeric value is null or not finite
    MissingValue,
    /// Value outside the declared plausible range for its category
    Outlier,
}

impl DataQualityIssue {
    /// Get a short name for this issue
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingIdentifier => "missing_identifier",
            Self::MissingTimestamp => "missing_timestamp",
            Self::InvertedInterval => "inverted_interval",
            Self::UnknownHospitalization => "unknown_hospitalization",
            Self::InvalidWindow => "invalid_window",
            Self::DuplicateIdentifier => "duplicate_identifier",
            Self::MissingValue => "missing_value",
            Self::Outlier => "outlier",
        }
    }
}

/// Kind of a record-level issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueKind {
    /// Null or inconsistent identifiers, timestamps or values
    DataQuality(DataQualityIssue),
    /// The unit normalizer did not return `success`
    UnitConversion(ConversionStatus),
    /// No qualifying raw value for a SOFA component
    InsufficientData(SofaComponent),
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataQuality(issue) => write!(f, "data_quality:{}", issue.as_str()),
            Self::UnitConversion(status) => write!(f, "unit_conversion:{}", status.as_str()),
            Self::InsufficientData(component) => {
                write!(f, "insufficient_data:{}", component.column_name())
            }
        }
    }
}

impl From<DataQualityIssue> for IssueKind {
    fn from(issue: DataQualityIssue) -> Self {
        Self::DataQuality(issue)
    }
}

/// A single excluded record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordIssue {
    /// What went wrong
    pub kind: IssueKind,
    /// Identifier of the affected record (hospitalization id, cohort id, ...)
    pub record_id: String,
    /// Free-text detail
    pub detail: String,
}

/// Collection of record-level issues found during a stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityReport {
    issues: Vec<RecordIssue>,
}

impl QualityReport {
    /// Create an empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an excluded record
    pub fn record(
        &mut self,
        kind: impl Into<IssueKind>,
        record_id: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.issues.push(RecordIssue {
            kind: kind.into(),
            record_id: record_id.into(),
            detail: detail.into(),
        });
    }

    /// Append all issues of another report
    pub fn merge(&mut self, other: Self) {
        self.issues.extend(other.issues);
    }

    /// All recorded issues, in the order they were found
    #[must_use]
    pub fn issues(&self) -> &[RecordIssue] {
        &self.issues
    }

    /// Number of issues of one kind
    #[must_use]
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }

    /// Number of issues per kind
    #[must_use]
    pub fn counts(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Total number of issues
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether no issue was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Log one line per issue kind
    pub fn log_summary(&self, stage: &str) {
        if self.is_empty() {
            log::info!("{stage}: no records excluded");
            return;
        }
        for (kind, count) in self.counts() {
            log::warn!("{stage}: {count} records flagged as {kind}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut report = QualityReport::new();
        report.record(DataQualityIssue::MissingTimestamp, "h1", "discharge_dttm is null");
        report.record(DataQualityIssue::MissingTimestamp, "h2", "admission_dttm is null");
        report.record(
            IssueKind::UnitConversion(ConversionStatus::UnrecognizedUnit),
            "h3",
            "unit 'puffs'",
        );

        assert_eq!(report.len(), 3);
        assert_eq!(
            report.count(IssueKind::DataQuality(DataQualityIssue::MissingTimestamp)),
            2
        );
        assert_eq!(report.counts().len(), 2);
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first = QualityReport::new();
        first.record(DataQualityIssue::Outlier, "a", "");
        let mut second = QualityReport::new();
        second.record(DataQualityIssue::InvalidWindow, "b", "");

        first.merge(second);
        let ids: Vec<_> = first.issues().iter().map(|i| i.record_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
