//! # Feature Reference Table
//!
//! Loads the per-trial feature table, derives the per-column default (median)
//! vector from the observed values, and builds the identifier lookup used by the
//! join. The table is parsed once; the defaults and the index are both derived
//! from the same in-memory [`FeatureTable`].
//!
//! - Schema: column 0 is the trial identifier, the next `feature_count` columns
//!   are numeric features. An empty cell is a missing value; any other cell must
//!   parse as a finite number.
//! - Defaults are computed from present values only, before any imputation, so
//!   imputing one row can never influence another.

use crate::error::JoinError;
use crate::io::{CsvTable, read_table};
use crate::stats::median;
use crate::types::{DefaultVector, EncodedFeature, FeatureRecord};
use ahash::AHashMap;
use indicatif::ProgressBar;
use std::path::Path;

/// Lookup from trial identifier to its imputed, encoded feature vector.
pub type FeatureIndex = AHashMap<String, EncodedFeature>;

/// The parsed feature reference table.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// Names of the feature columns, without the identifier column.
    pub columns: Vec<String>,
    pub records: Vec<FeatureRecord>,
}

impl FeatureTable {
    /// Reads and validates the feature file at `path`.
    pub fn read(path: &Path, feature_count: usize) -> Result<Self, JoinError> {
        let table = read_table(path, false)?;
        Self::from_csv(path, table, feature_count)
    }

    /// Validates an already-read CSV table against the feature schema.
    pub fn from_csv(path: &Path, table: CsvTable, feature_count: usize) -> Result<Self, JoinError> {
        if table.header.len() != feature_count + 1 {
            return Err(JoinError::FeatureWidthMismatch {
                path: path.to_path_buf(),
                expected: feature_count,
                found: table.header.len(),
            });
        }

        let columns: Vec<String> = table.header[1..].to_vec();
        let mut records = Vec::with_capacity(table.records.len());

        for row in table.records {
            let mut fields = row.fields.into_iter();
            let identifier = fields.next().unwrap_or_default();

            let values = fields
                .zip(&columns)
                .map(|(raw, column)| parse_cell(&raw, column, row.line))
                .collect::<Result<Vec<_>, _>>()?;

            records.push(FeatureRecord { identifier, values });
        }

        Ok(Self { columns, records })
    }

    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    /// Computes the median of the present values in every feature column.
    pub fn defaults(&self) -> Result<DefaultVector, JoinError> {
        let mut medians = Vec::with_capacity(self.feature_count());

        for (index, column) in self.columns.iter().enumerate() {
            let observed: Vec<f64> = self
                .records
                .iter()
                .filter_map(|record| record.values[index])
                .collect();

            let value = median(&observed).ok_or_else(|| JoinError::EmptyFeatureColumn {
                column: column.clone(),
                index,
            })?;
            log::debug!(
                "Column '{column}': median {value} from {} observed values",
                observed.len()
            );
            medians.push(value);
        }

        Ok(DefaultVector::new(medians))
    }

    /// Number of missing cells per feature column, i.e. how many values imputation fills.
    pub fn missing_counts(&self) -> Vec<usize> {
        (0..self.feature_count())
            .map(|index| {
                self.records
                    .iter()
                    .filter(|record| record.values[index].is_none())
                    .count()
            })
            .collect()
    }

    /// Builds the identifier index, imputing missing cells from `defaults`.
    /// When an identifier repeats, the last row wins.
    pub fn build_index(&self, defaults: &DefaultVector, progress: &ProgressBar) -> FeatureIndex {
        let mut index = FeatureIndex::with_capacity(self.records.len());

        for record in &self.records {
            let encoded = EncodedFeature::encode(&record.impute(defaults));
            if index.insert(record.identifier.clone(), encoded).is_some() {
                log::warn!(
                    "Trial '{}' appears more than once in the feature table; keeping the last row.",
                    record.identifier
                );
            }
            progress.inc(1);
        }

        index
    }
}

/// Reads the feature file and returns its per-column medians.
pub fn load_defaults(path: &Path, feature_count: usize) -> Result<DefaultVector, JoinError> {
    FeatureTable::read(path, feature_count)?.defaults()
}

/// Reads the feature file and builds the identifier index against `defaults`.
/// The number of feature columns is taken from `defaults`.
pub fn build_feature_index(path: &Path, defaults: &DefaultVector) -> Result<FeatureIndex, JoinError> {
    let table = FeatureTable::read(path, defaults.len())?;
    Ok(table.build_index(defaults, &ProgressBar::hidden()))
}

fn parse_cell(raw: &str, column: &str, line: u64) -> Result<Option<f64>, JoinError> {
    if raw.is_empty() {
        return Ok(None);
    }

    let value: f64 = raw.trim().parse().map_err(|_| JoinError::InvalidNumber {
        value: raw.to_string(),
        column: column.to_string(),
        line,
    })?;

    if !value.is_finite() {
        return Err(JoinError::NonFiniteValue {
            value: raw.to_string(),
            column: column.to_string(),
            line,
        });
    }

    Ok(Some(value))
}
