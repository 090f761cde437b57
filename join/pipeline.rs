// ========================================================================================
//
//                          The join-and-impute pipeline
//
// ========================================================================================
//
// One linear pass per stage: load the feature table, derive the default vector,
// build the identifier index, join it onto the primary dataset, write the result.
// Every error aborts the run. The join completes in memory before the first byte
// of output is written, so a run that fails never produces an output file.

use crate::config::{JoinConfig, LineTerminator};
use crate::error::JoinError;
use crate::features::{FeatureIndex, FeatureTable};
use crate::io::{CsvTable, read_table, write_table_atomic};
use crate::progress::create_progress_bar;
use crate::types::{DefaultVector, JoinedTable};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub defaults: DefaultVector,
    /// Distinct trial identifiers in the feature index.
    pub features_indexed: usize,
    pub rows_written: usize,
    /// Number of cells filled from the defaults, per feature column.
    pub imputed_per_column: Vec<usize>,
}

/// Reads the primary dataset at `input` and appends each row's encoded features.
pub fn join(input: &Path, index: &FeatureIndex, column_name: &str) -> Result<JoinedTable, JoinError> {
    let table = read_table(input, true)?;
    join_table(table, index, column_name)
}

/// Appends each row's encoded features to an already-read primary table.
///
/// Every identifier must be present in `index`; the first one that is not aborts
/// the join with [`JoinError::MissingFeature`].
pub fn join_table(
    table: CsvTable,
    index: &FeatureIndex,
    column_name: &str,
) -> Result<JoinedTable, JoinError> {
    let CsvTable {
        mut header,
        records,
    } = table;
    header.push(column_name.to_string());

    let rows = records
        .into_iter()
        .map(|record| match index.get(record.identifier()) {
            Some(feature) => Ok(record.with_feature(feature)),
            None => Err(JoinError::MissingFeature {
                identifier: record.identifier().to_string(),
                line: record.line,
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(JoinedTable { header, rows })
}

/// Writes the joined header and rows to `output`, replacing it atomically.
pub fn write_output(
    output: &Path,
    header: &[String],
    rows: &[Vec<String>],
    terminator: LineTerminator,
) -> Result<(), JoinError> {
    write_table_atomic(output, header, rows, terminator.to_csv())
}

/// Runs the whole pipeline for one configuration.
pub fn run(config: &JoinConfig) -> Result<RunSummary, JoinError> {
    let start_time = Instant::now();
    config.validate()?;
    let output = config.output_path()?;

    // --- Stage 1: Feature table and defaults ---
    log::info!("Loading feature table from '{}'", config.feature_file.display());
    let features = FeatureTable::read(&config.feature_file, config.feature_count)?;
    let defaults = features.defaults()?;
    println!("{defaults}");

    let imputed_per_column = features.missing_counts();
    for (column, missing) in features.columns.iter().zip(&imputed_per_column) {
        if *missing > 0 {
            log::info!("Imputing {missing} missing values in column '{column}'");
        }
    }

    // --- Stage 2: Identifier index ---
    let pb = create_progress_bar(
        features.records.len() as u64,
        "indexing trial features",
        config.progress,
    );
    let index = features.build_index(&defaults, &pb);
    pb.finish_and_clear();
    log::info!(
        "Indexed {} trials from {} feature rows",
        index.len(),
        features.records.len()
    );

    // --- Stage 3: Join ---
    log::info!("Joining features onto '{}'", config.input_file.display());
    let primary = read_table(&config.input_file, true)?;
    println!("{:?}", primary.header);
    let joined = join_table(primary, &index, &config.column_name)?;

    // --- Stage 4: Output ---
    write_output(&output, &joined.header, &joined.rows, config.line_terminator)?;
    log::info!(
        "Wrote {} rows to '{}' in {:.2?}",
        joined.rows.len(),
        output.display(),
        start_time.elapsed()
    );

    Ok(RunSummary {
        output,
        defaults,
        features_indexed: index.len(),
        rows_written: joined.rows.len(),
        imputed_per_column,
    })
}
