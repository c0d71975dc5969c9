//! Interval merging
//!
//! Single sweep over intervals sorted by start. The running group keeps the
//! largest end seen so far; the next interval joins the group when its start
//! is at most `gap` after that end. Overlaps (negative gaps) always join and
//! a gap exactly equal to the threshold joins as well.

use chrono::{Duration, NaiveDateTime};
use smallvec::{SmallVec, smallvec};

use crate::error::DataQualityIssue;

/// Interval with possibly missing bounds, as read from a table
pub type RawSpan = (Option<NaiveDateTime>, Option<NaiveDateTime>);

/// Maximal group of chained intervals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalGroup {
    /// Earliest start in the group
    pub start: NaiveDateTime,
    /// Latest end in the group
    pub end: NaiveDateTime,
    /// Input positions of the members, ordered by start
    pub members: SmallVec<[usize; 4]>,
}

/// Groups and rejected inputs of one merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Groups ordered by start
    pub groups: Vec<IntervalGroup>,
    /// Input positions that could not be placed, with the reason
    pub rejected: Vec<(usize, DataQualityIssue)>,
}

/// Partition intervals into maximal groups separated by more than `gap`
///
/// Intervals with a missing bound are rejected as `MissingTimestamp`, those
/// ending before they start as `InvertedInterval`. Ties in start time are
/// ordered by end, then by input position, so the result is deterministic.
#[must_use]
pub fn merge_intervals(spans: &[RawSpan], gap: Duration) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let mut valid: Vec<(NaiveDateTime, NaiveDateTime, usize)> = Vec::with_capacity(spans.len());

    for (idx, span) in spans.iter().enumerate() {
        match *span {
            (Some(start), Some(end)) if end >= start => valid.push((start, end, idx)),
            (Some(_), Some(_)) => outcome.rejected.push((idx, DataQualityIssue::InvertedInterval)),
            _ => outcome.rejected.push((idx, DataQualityIssue::MissingTimestamp)),
        }
    }

    valid.sort_unstable();

    let mut current: Option<IntervalGroup> = None;
    for (start, end, idx) in valid {
        match current.as_mut() {
            Some(group) if start - group.end <= gap => {
                group.end = group.end.max(end);
                group.members.push(idx);
            }
            _ => {
                if let Some(done) = current.take() {
                    outcome.groups.push(done);
                }
                current = Some(IntervalGroup {
                    start,
                    end,
                    members: smallvec![idx],
                });
            }
        }
    }
    if let Some(done) = current {
        outcome.groups.push(done);
    }

    outcome
}
