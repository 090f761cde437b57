//! # Error Taxonomy
//!
//! Every failure in the join pipeline is fatal. The variants below are grouped by
//! the kind of problem they report so that the binary can print one clear,
//! actionable message and exit:
//!
//! - Data errors: the feature table cannot yield a usable default vector.
//! - Lookup errors: a trial in the primary dataset has no feature row.
//! - Format errors: a numeric cell does not hold a finite number.
//! - I/O and CSV errors: a file is missing, unreadable, malformed or unwritable.
//! - Configuration errors: the TOML config or the resolved settings are invalid.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("Failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("The file '{}' is empty. A header row is required.", path.display())]
    MissingHeader { path: PathBuf },

    #[error(
        "The feature file '{}' has {found} columns, but an identifier plus {expected} feature columns were expected.",
        path.display()
    )]
    FeatureWidthMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error(
        "Feature column '{column}' (position {index}) has no non-empty values, so its median is undefined."
    )]
    EmptyFeatureColumn { column: String, index: usize },

    #[error(
        "Trial '{identifier}' on line {line} of the primary dataset has no entry in the feature table."
    )]
    MissingFeature { identifier: String, line: u64 },

    #[error("Value '{value}' in column '{column}' on line {line} is not a number.")]
    InvalidNumber {
        value: String,
        column: String,
        line: u64,
    },

    #[error(
        "Value '{value}' in column '{column}' on line {line} is not finite. All feature values must be finite numbers."
    )]
    NonFiniteValue {
        value: String,
        column: String,
        line: u64,
    },

    #[error("Failed to read config file '{}': {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config file '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl JoinError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
