#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod pipeline;
pub mod progress;
pub mod stats;
pub mod types;

pub use config::JoinConfig;
pub use error::JoinError;
pub use features::{FeatureIndex, FeatureTable, build_feature_index, load_defaults};
pub use pipeline::{RunSummary, join, run, write_output};
pub use types::{DefaultVector, EncodedFeature, FeatureRecord, JoinedTable, TrialRecord};
