// ========================================================================================
//
//                          The command-line driver: trialjoin
//
// ========================================================================================
//
// Resolves a run configuration from the built-in defaults, an optional TOML file,
// and the command-line flags, then hands it to the library pipeline. Any error is
// reported once on stderr and turns into a non-zero exit status.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use trialjoin::config::LineTerminator;
use trialjoin::{JoinConfig, JoinError};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LineTerminatorCli {
    Crlf,
    Lf,
}

impl From<LineTerminatorCli> for LineTerminator {
    fn from(value: LineTerminatorCli) -> Self {
        match value {
            LineTerminatorCli::Crlf => LineTerminator::Crlf,
            LineTerminatorCli::Lf => LineTerminator::Lf,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "trialjoin",
    version,
    about = "Joins median-imputed per-trial features onto a clinical trial dataset."
)]
struct Cli {
    /// TOML file with run settings; flags given on the command line take precedence
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Feature reference table (identifier column followed by the feature columns)
    #[arg(long, value_name = "PATH")]
    features: Option<PathBuf>,

    /// Primary trial dataset to extend
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output CSV (defaults to <input stem>_new.csv next to the input)
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Number of numeric feature columns in the feature table
    #[arg(long, value_name = "N")]
    feature_count: Option<usize>,

    /// Header name of the appended feature column
    #[arg(long, value_name = "NAME")]
    column_name: Option<String>,

    /// Record terminator for the output CSV
    #[arg(long, value_enum)]
    line_terminator: Option<LineTerminatorCli>,

    /// Do not draw a progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the resolved configuration as TOML and exit
    #[arg(long)]
    show_config: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<JoinConfig, JoinError> {
        let mut config = match &self.config {
            Some(path) => JoinConfig::load(path)?,
            None => JoinConfig::default(),
        };

        if let Some(path) = &self.features {
            config.feature_file = path.clone();
        }
        if let Some(path) = &self.input {
            config.input_file = path.clone();
        }
        if let Some(path) = &self.output {
            config.output_file = Some(path.clone());
        }
        if let Some(count) = self.feature_count {
            config.feature_count = count;
        }
        if let Some(name) = &self.column_name {
            config.column_name = name.clone();
        }
        if let Some(terminator) = self.line_terminator {
            config.line_terminator = terminator.into();
        }
        if self.no_progress {
            config.progress = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let config = cli.resolve_config()?;

    if cli.show_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    eprintln!(
        "> Joining features from {} onto {}",
        config.feature_file.display(),
        config.input_file.display()
    );
    let summary = trialjoin::run(&config)?;

    eprintln!(
        "> Indexed {} trials; imputed {} missing feature values.",
        summary.features_indexed,
        summary.imputed_per_column.iter().sum::<usize>()
    );
    eprintln!(
        "> Wrote {} rows to {}",
        summary.rows_written,
        summary.output.display()
    );
    eprintln!("\nSuccess! Total execution time: {:.2?}", start_time.elapsed());
    Ok(())
}
