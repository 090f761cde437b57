//! # Run Configuration
//!
//! A [`JoinConfig`] describes one invocation of the pipeline. Values come from
//! three layers, later layers winning: the built-in defaults (which reproduce the
//! historical `data/` layout), an optional TOML file, and command-line flags
//! applied by the binary.

use crate::error::JoinError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FEATURE_FILE: &str = "data/direct_features.csv";
pub const DEFAULT_INPUT_FILE: &str = "data/raw_data.csv";
pub const DEFAULT_FEATURE_COUNT: usize = 8;
pub const DEFAULT_COLUMN_NAME: &str = "additional_feature";

/// Suffix appended to the input file stem when no output path is given.
const OUTPUT_SUFFIX: &str = "_new.csv";

/// Record terminator used when writing the output CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    #[default]
    Crlf,
    Lf,
}

impl LineTerminator {
    pub fn to_csv(self) -> csv::Terminator {
        match self {
            Self::Crlf => csv::Terminator::CRLF,
            Self::Lf => csv::Terminator::Any(b'\n'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    /// Feature reference table: identifier column followed by the feature columns.
    pub feature_file: PathBuf,
    /// Primary trial dataset whose rows receive the feature column.
    pub input_file: PathBuf,
    /// Destination CSV. Derived from `input_file` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub feature_count: usize,
    /// Header name of the appended column.
    pub column_name: String,
    pub line_terminator: LineTerminator,
    pub progress: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            feature_file: PathBuf::from(DEFAULT_FEATURE_FILE),
            input_file: PathBuf::from(DEFAULT_INPUT_FILE),
            output_file: None,
            feature_count: DEFAULT_FEATURE_COUNT,
            column_name: DEFAULT_COLUMN_NAME.to_string(),
            line_terminator: LineTerminator::default(),
            progress: true,
        }
    }
}

impl JoinConfig {
    /// Loads a config from a TOML file. Keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self, JoinError> {
        let text = fs::read_to_string(path).map_err(|source| JoinError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| JoinError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks the settings that cannot be expressed in the types alone.
    pub fn validate(&self) -> Result<(), JoinError> {
        if self.feature_count == 0 {
            return Err(JoinError::InvalidConfig(
                "feature_count must be at least 1".to_string(),
            ));
        }
        if self.column_name.is_empty() {
            return Err(JoinError::InvalidConfig(
                "column_name must not be empty".to_string(),
            ));
        }
        let output = self.output_path()?;
        if output == self.input_file || output == self.feature_file {
            return Err(JoinError::InvalidConfig(format!(
                "output path '{}' would overwrite one of the inputs",
                output.display()
            )));
        }
        Ok(())
    }

    /// The explicit output path, or `<input dir>/<input stem>_new.csv`.
    pub fn output_path(&self) -> Result<PathBuf, JoinError> {
        match &self.output_file {
            Some(path) => Ok(path.clone()),
            None => derive_output_path(&self.input_file),
        }
    }
}

/// Derives the default output path from the primary input path, e.g.
/// `data/raw_data.csv` becomes `data/raw_data_new.csv`.
pub fn derive_output_path(input: &Path) -> Result<PathBuf, JoinError> {
    let stem = input.file_stem().ok_or_else(|| {
        JoinError::InvalidConfig(format!(
            "cannot derive an output name from input path '{}'",
            input.display()
        ))
    })?;

    let mut name = OsString::from(stem);
    name.push(OUTPUT_SUFFIX);
    Ok(input.with_file_name(name))
}
