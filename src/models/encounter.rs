//! Encounter blocks and the hospitalization-to-block mapping
//!
//! An encounter block groups one or more hospitalizations of a patient whose
//! spans are chained within the stitching gap. Block ids are 1-based and
//! assigned in (start, patient, first hospitalization) order, so the same input
//! always yields the same ids.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::utils::io::TableRecord;

/// Identifier of an encounter block
pub type EncounterBlockId = u64;

/// Logical continuous episode of care
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterBlock {
    /// Block identifier
    pub encounter_block: EncounterBlockId,
    /// Patient the block belongs to
    pub patient_id: String,
    /// Earliest admission across member hospitalizations
    pub block_start: NaiveDateTime,
    /// Latest discharge across member hospitalizations
    pub block_end: NaiveDateTime,
    /// Member hospitalizations, ordered by admission
    pub hospitalization_ids: Vec<String>,
}

impl EncounterBlock {
    /// Number of member hospitalizations
    #[must_use]
    pub fn len(&self) -> usize {
        self.hospitalization_ids.len()
    }

    /// Whether the block has no members (never true for stitched blocks)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hospitalization_ids.is_empty()
    }
}

/// Hospitalization table at block granularity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchedHospitalization {
    /// Block identifier
    pub encounter_block: EncounterBlockId,
    /// Patient identifier
    pub patient_id: String,
    /// First member hospitalization
    pub hospitalization_id: String,
    /// Effective admission (earliest member admission)
    pub admission_dttm: NaiveDateTime,
    /// Effective discharge (latest member discharge)
    pub discharge_dttm: NaiveDateTime,
    /// Age at the first admission
    pub age_at_admission: Option<i32>,
    /// Disposition of the last discharged member
    pub discharge_category: Option<String>,
    /// Number of hospitalizations merged into the block
    pub hospitalization_count: u32,
}

impl TableRecord for StitchedHospitalization {
    const TABLE_NAME: &'static str = "hospitalization_stitched";
}

/// ADT row re-keyed by encounter block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchedTransfer {
    /// Block identifier
    pub encounter_block: EncounterBlockId,
    /// Original hospitalization
    pub hospitalization_id: String,
    /// Facility identifier
    pub hospital_id: Option<String>,
    /// Time the patient entered the location
    pub in_dttm: Option<NaiveDateTime>,
    /// Time the patient left the location
    pub out_dttm: Option<NaiveDateTime>,
    /// Location category
    pub location_category: Option<String>,
    /// Location type
    pub location_type: Option<String>,
}

impl TableRecord for StitchedTransfer {
    const TABLE_NAME: &'static str = "adt_stitched";
}

/// One row of the encounter mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterMappingRow {
    /// Original hospitalization
    pub hospitalization_id: String,
    /// Block it was merged into
    pub encounter_block: EncounterBlockId,
}

impl TableRecord for EncounterMappingRow {
    const TABLE_NAME: &'static str = "encounter_mapping";
}

/// Many-to-one mapping from hospitalization id to encounter block
#[derive(Debug, Clone, Default)]
pub struct EncounterMapping {
    rows: Vec<EncounterMappingRow>,
    index: FxHashMap<String, EncounterBlockId>,
}

impl EncounterMapping {
    /// Build a mapping from rows, keeping the first row for a repeated id
    #[must_use]
    pub fn from_rows(rows: Vec<EncounterMappingRow>) -> Self {
        let mut index = FxHashMap::default();
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if index.contains_key(&row.hospitalization_id) {
                log::warn!(
                    "Hospitalization {} mapped more than once, keeping first block",
                    row.hospitalization_id
                );
                continue;
            }
            index.insert(row.hospitalization_id.clone(), row.encounter_block);
            kept.push(row);
        }
        Self { rows: kept, index }
    }

    /// Block of a hospitalization
    #[must_use]
    pub fn block_of(&self, hospitalization_id: &str) -> Option<EncounterBlockId> {
        self.index.get(hospitalization_id).copied()
    }

    /// Hospitalizations merged into a block
    #[must_use]
    pub fn hospitalizations_in(&self, block: EncounterBlockId) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|row| row.encounter_block == block)
            .map(|row| row.hospitalization_id.as_str())
            .collect()
    }

    /// Mapping rows, ordered by block then hospitalization admission
    #[must_use]
    pub fn rows(&self) -> &[EncounterMappingRow] {
        &self.rows
    }

    /// Number of mapped hospitalizations
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the mapping is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct blocks
    #[must_use]
    pub fn block_count(&self) -> usize {
        let mut blocks: Vec<_> = self.rows.iter().map(|row| row.encounter_block).collect();
        blocks.sort_unstable();
        blocks.dedup();
        blocks.len()
    }
}

impl PartialEq for EncounterMapping {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}
