//! Wide feature table
//!
//! One row per cohort id, one column per configured feature. Every configured
//! column is present in every row; a category without a qualifying event holds
//! [`FeatureValue::Absent`], which is distinct from a recorded zero.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::models::types::{Category, ValueKind};

/// Aggregated value of one feature for one cohort id
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeatureValue {
    /// No qualifying event in the window
    #[default]
    Absent,
    /// Aggregated numeric value
    Numeric(f64),
    /// Aggregated categorical value
    Categorical(String),
}

impl FeatureValue {
    /// Whether the value is absent
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Numeric content, if any
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            _ => None,
        }
    }

    /// Categorical content, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Categorical(label) => Some(label),
            _ => None,
        }
    }
}

/// Column of the wide table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideColumn {
    /// Column name, `{category}` or `{category}_{unit}`
    pub name: String,
    /// Category aggregated into the column
    pub category: Category,
    /// Target unit for medication columns
    pub unit: Option<String>,
}

impl WideColumn {
    /// Create a column, deriving its name from category and unit
    #[must_use]
    pub fn new(category: Category, unit: Option<String>) -> Self {
        Self {
            name: column_name(category, unit.as_deref()),
            category,
            unit,
        }
    }
}

/// Build a column name from a category and an optional unit
///
/// Unit punctuation collapses to single underscores: `mcg/kg/min` becomes
/// `mcg_kg_min`.
#[must_use]
pub fn column_name(category: Category, unit: Option<&str>) -> String {
    match unit {
        None => category.as_str().to_string(),
        Some(unit) => {
            let mut suffix = String::with_capacity(unit.len());
            for ch in unit.trim().to_lowercase().chars() {
                if ch.is_ascii_alphanumeric() {
                    suffix.push(ch);
                } else if !suffix.ends_with('_') {
                    suffix.push('_');
                }
            }
            format!("{}_{}", category.as_str(), suffix.trim_matches('_'))
        }
    }
}

/// One cohort id with its aggregated features
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    /// Cohort id
    pub id: String,
    /// Window start
    pub start_time: NaiveDateTime,
    /// Window end
    pub end_time: NaiveDateTime,
    /// Values aligned with [`WideTable::columns`]
    pub values: Vec<FeatureValue>,
}

/// Wide feature table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WideTable {
    columns: Vec<WideColumn>,
    rows: Vec<WideRow>,
}

impl WideTable {
    /// Create a table; every row must have one value per column
    #[must_use]
    pub fn new(columns: Vec<WideColumn>, rows: Vec<WideRow>) -> Self {
        debug_assert!(rows.iter().all(|row| row.values.len() == columns.len()));
        Self { columns, rows }
    }

    /// Configured columns
    #[must_use]
    pub fn columns(&self) -> &[WideColumn] {
        &self.columns
    }

    /// Rows in cohort order
    #[must_use]
    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Index of the column holding a category
    #[must_use]
    pub fn category_index(&self, category: Category) -> Option<usize> {
        self.columns.iter().position(|column| column.category == category)
    }

    /// Row for a cohort id
    #[must_use]
    pub fn row(&self, id: &str) -> Option<&WideRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Value of a named column in a row
    #[must_use]
    pub fn value<'a>(&self, row: &'a WideRow, name: &str) -> Option<&'a FeatureValue> {
        self.column_index(name).and_then(|idx| row.values.get(idx))
    }

    /// Numeric value of a category in a row
    #[must_use]
    pub fn numeric(&self, row: &WideRow, category: Category) -> Option<f64> {
        self.category_index(category)
            .and_then(|idx| row.values.get(idx))
            .and_then(FeatureValue::as_f64)
    }

    /// Categorical value of a category in a row
    #[must_use]
    pub fn categorical<'a>(&self, row: &'a WideRow, category: Category) -> Option<&'a str> {
        self.category_index(category)
            .and_then(|idx| row.values.get(idx))
            .and_then(FeatureValue::as_str)
    }

    /// Get the Arrow schema of the table
    #[must_use]
    pub fn schema(&self) -> Schema {
        let mut fields = vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "start_time",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
            Field::new(
                "end_time",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
        ];
        for column in &self.columns {
            let data_type = match column.category.value_kind() {
                ValueKind::Numeric => DataType::Float64,
                ValueKind::Categorical => DataType::Utf8,
            };
            fields.push(Field::new(&column.name, data_type, true));
        }
        Schema::new(fields)
    }

    /// Convert the table to a record batch, absent values become nulls
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len() + 3);
        arrays.push(Arc::new(StringArray::from_iter_values(
            self.rows.iter().map(|row| row.id.as_str()),
        )));
        arrays.push(Arc::new(TimestampMillisecondArray::from_iter_values(
            self.rows.iter().map(|row| row.start_time.and_utc().timestamp_millis()),
        )));
        arrays.push(Arc::new(TimestampMillisecondArray::from_iter_values(
            self.rows.iter().map(|row| row.end_time.and_utc().timestamp_millis()),
        )));

        for (idx, column) in self.columns.iter().enumerate() {
            let array: ArrayRef = match column.category.value_kind() {
                ValueKind::Numeric => Arc::new(
                    self.rows
                        .iter()
                        .map(|row| row.values[idx].as_f64())
                        .collect::<Float64Array>(),
                ),
                ValueKind::Categorical => Arc::new(
                    self.rows
                        .iter()
                        .map(|row| row.values[idx].as_str())
                        .collect::<StringArray>(),
                ),
            };
            arrays.push(array);
        }

        Ok(RecordBatch::try_new(Arc::new(self.schema()), arrays)?)
    }
}
