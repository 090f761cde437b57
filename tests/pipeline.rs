use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use trialjoin::config::LineTerminator;
use trialjoin::{JoinConfig, JoinError, build_feature_index, join, load_defaults, run};

const TRIAL_HEADER: &str =
    "nctid,status,why_stop,label,phase,diseases,icdcodes,drugs,smiless,criteria";

struct Fixture {
    dir: TempDir,
    features: PathBuf,
    input: PathBuf,
}

impl Fixture {
    fn new(features: &str, input: &str) -> Self {
        let dir = tempdir().expect("temporary directory");
        let features_path = dir.path().join("direct_features.csv");
        let input_path = dir.path().join("raw_data.csv");
        fs::write(&features_path, features).expect("write feature file");
        fs::write(&input_path, input).expect("write primary dataset");
        Self {
            dir,
            features: features_path,
            input: input_path,
        }
    }

    fn config(&self, feature_count: usize) -> JoinConfig {
        JoinConfig {
            feature_file: self.features.clone(),
            input_file: self.input.clone(),
            output_file: None,
            feature_count,
            progress: false,
            ..JoinConfig::default()
        }
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("raw_data_new.csv")
    }
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .expect("open output");
    reader
        .records()
        .map(|r| r.expect("record").iter().map(str::to_owned).collect())
        .collect()
}

fn trial_fixture() -> Fixture {
    let features = "nctid,f1,f2,f3,f4,f5,f6,f7,f8\n\
NCT00000001,2,1,1,18,65,55,1,60\n\
NCT00000002,4,,3,40,,45,0,30\n\
NCT00000003,6,3,,20,75,50,,90\n\
NCT00000004,,5,2,30,70,,1,\n";
    let input = format!(
        "{TRIAL_HEADER}\n\
NCT00000003,completed,,1,phase 2,\"['lung cancer']\",\"['C34']\",\"['cisplatin']\",\"['CC']\",\"inclusion: age >= 18, ECOG 0-1\"\n\
NCT00000001,terminated,low accrual,0,phase 1,\"['melanoma']\",\"['C43']\",\"['drug a', 'drug b']\",\"['C']\",none\n\
NCT00000004,completed,,1,phase 3,\"['asthma']\",\"['J45']\",\"['placebo']\",\"['O']\",\"adults, \"\"stable\"\" disease\"\n"
    );
    Fixture::new(features, &input)
}

#[test]
fn small_example_imputes_middle_feature_from_its_median() {
    let fixture = Fixture::new(
        "nctid,a,b,c\nT1,1,,3\nT2,5,6,7\n",
        "nctid,status\nT1,statusX\n",
    );

    let defaults = load_defaults(&fixture.features, 3).unwrap();
    assert_eq!(defaults.as_slice(), &[3.0, 6.0, 5.0]);

    let index = build_feature_index(&fixture.features, &defaults).unwrap();
    let joined = join(&fixture.input, &index, "additional_feature").unwrap();
    assert_eq!(joined.header, vec!["nctid", "status", "additional_feature"]);
    assert_eq!(joined.rows, vec![vec!["T1", "statusX", "1.0_6.0_3.0"]]);

    let summary = run(&fixture.config(3)).unwrap();
    assert_eq!(summary.output, fixture.output());
    assert_eq!(summary.rows_written, 1);
    assert_eq!(summary.imputed_per_column, vec![0, 1, 0]);

    let written = fs::read_to_string(fixture.output()).unwrap();
    assert_eq!(
        written,
        "nctid,status,additional_feature\r\nT1,statusX,1.0_6.0_3.0\r\n"
    );
}

#[test]
fn every_row_gains_exactly_one_well_formed_feature_cell() {
    let fixture = trial_fixture();
    let summary = run(&fixture.config(8)).unwrap();

    let input_rows = read_rows(&fixture.input);
    let output_rows = read_rows(&summary.output);
    assert_eq!(output_rows.len(), input_rows.len());
    assert_eq!(output_rows[0].len(), input_rows[0].len() + 1);
    assert_eq!(output_rows[0].last().unwrap(), "additional_feature");

    for (input_row, output_row) in input_rows.iter().zip(&output_rows).skip(1) {
        assert_eq!(&output_row[..input_row.len()], &input_row[..]);
        let tokens: Vec<&str> = output_row.last().unwrap().split('_').collect();
        assert_eq!(tokens.len(), 8, "bad feature cell in row {output_row:?}");
        for token in tokens {
            token.parse::<f64>().expect("feature token parses as a float");
        }
    }
}

#[test]
fn missing_cells_show_column_defaults_and_rows_keep_input_order() {
    let fixture = trial_fixture();
    let summary = run(&fixture.config(8)).unwrap();
    assert_eq!(
        summary.defaults.as_slice(),
        &[4.0, 3.0, 2.0, 25.0, 70.0, 50.0, 1.0, 60.0]
    );

    let rows = read_rows(&summary.output);
    let ids: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
    assert_eq!(ids, vec!["NCT00000003", "NCT00000001", "NCT00000004"]);

    assert_eq!(
        rows[1].last().unwrap(),
        "6.0_3.0_2.0_20.0_75.0_50.0_1.0_90.0"
    );
    assert_eq!(
        rows[3].last().unwrap(),
        "4.0_5.0_2.0_30.0_70.0_50.0_1.0_60.0"
    );
    assert_eq!(rows[3][9], "adults, \"stable\" disease");
}

#[test]
fn repeated_runs_produce_identical_bytes() {
    let fixture = trial_fixture();
    let config = fixture.config(8);

    run(&config).unwrap();
    let first = fs::read(fixture.output()).unwrap();
    run(&config).unwrap();
    let second = fs::read(fixture.output()).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn unknown_trial_aborts_without_writing_output() {
    let fixture = Fixture::new(
        "nctid,a,b,c\nT1,1,,3\nT2,5,6,7\n",
        "nctid,status\nT1,statusX\nT9,orphan\n",
    );

    match run(&fixture.config(3)) {
        Err(JoinError::MissingFeature { identifier, line }) => {
            assert_eq!(identifier, "T9");
            assert_eq!(line, 3);
        }
        other => panic!("Expected MissingFeature, got {other:?}"),
    }

    assert!(!fixture.output().exists(), "output must not be written");
    let stray: Vec<_> = fs::read_dir(fixture.dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(stray.is_empty());
}

#[test]
fn empty_feature_column_aborts_the_run() {
    let fixture = Fixture::new("nctid,a,b\nT1,1,\nT2,2,\n", "nctid\nT1\n");
    assert!(matches!(
        run(&fixture.config(2)),
        Err(JoinError::EmptyFeatureColumn { index: 1, .. })
    ));
    assert!(!fixture.output().exists());
}

#[test]
fn explicit_output_path_and_line_feed_terminator_are_honoured() {
    let fixture = Fixture::new("nctid,a\nT1,2.5\n", "nctid,phase\nT1,phase 1\n");
    let output = fixture.dir.path().join("joined.csv");
    let config = JoinConfig {
        output_file: Some(output.clone()),
        line_terminator: LineTerminator::Lf,
        column_name: "hint_features".to_string(),
        ..fixture.config(1)
    };

    let summary = run(&config).unwrap();
    assert_eq!(summary.output, output);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "nctid,phase,hint_features\nT1,phase 1,2.5\n"
    );
    assert!(!fixture.output().exists());
}
