// ========================================================================================
//
//                          CSV table reading and atomic output
//
// ========================================================================================
//
// Both inputs are small, header-first CSV files that are read fully into memory.
// The output is written to a hidden temporary sibling and renamed into place only
// after every byte has been flushed and synced, so a failed run never leaves a
// truncated file at the destination.

use crate::error::JoinError;
use crate::types::TrialRecord;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Maximum number of candidate names tried when allocating the temporary output file.
const TEMP_FILE_ATTEMPTS: u32 = 32;

/// A CSV file split into its header row and its data rows.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub records: Vec<TrialRecord>,
}

/// Maps the byte offsets reported by the CSV reader to 1-based physical line numbers.
///
/// The reader reports the offset where it started looking for a record, which can sit
/// in front of blank lines it then skipped, so terminator bytes at that offset are
/// passed over before counting. Offsets must be requested in increasing order.
struct LineCounter<'a> {
    data: &'a [u8],
    scanned: usize,
    line: u64,
}

impl<'a> LineCounter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            scanned: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: u64) -> u64 {
        let mut end = usize::try_from(offset)
            .unwrap_or(self.data.len())
            .clamp(self.scanned, self.data.len());
        while end < self.data.len() && matches!(self.data[end], b'\r' | b'\n') {
            end += 1;
        }
        let newlines = self.data[self.scanned..end]
            .iter()
            .filter(|&&byte| byte == b'\n')
            .count();
        self.line += newlines as u64;
        self.scanned = end;
        self.line
    }
}

/// Reads a comma-delimited file whose first row is a header.
///
/// With `flexible` unset every row must have as many fields as the header, and a
/// ragged row is reported as a CSV error. Blank lines are skipped.
pub fn read_table(path: &Path, flexible: bool) -> Result<CsvTable, JoinError> {
    let data = fs::read(path).map_err(|e| JoinError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(flexible)
        .from_reader(data.as_slice());
    let mut lines = LineCounter::new(&data);

    let mut rows = reader.records();
    let header: Vec<String> = match rows.next() {
        Some(record) => record
            .map_err(|e| JoinError::csv(path, e))?
            .iter()
            .map(str::to_owned)
            .collect(),
        None => {
            return Err(JoinError::MissingHeader {
                path: path.to_path_buf(),
            });
        }
    };

    let mut records = Vec::new();
    for record in rows {
        let record = record.map_err(|e| JoinError::csv(path, e))?;
        let line = record
            .position()
            .map_or(0, |position| lines.line_at(position.byte()));
        records.push(TrialRecord {
            line,
            fields: record.iter().map(str::to_owned).collect(),
        });
    }

    log::debug!(
        "Read {} data rows with {} header columns from '{}'",
        records.len(),
        header.len(),
        path.display()
    );

    Ok(CsvTable { header, records })
}

/// Writes `header` followed by `rows` to `path`, replacing any existing file.
///
/// The data goes to a uniquely named temporary file in the destination directory,
/// which is synced and then renamed over `path`. On any failure the temporary file
/// is removed and the destination is left as it was.
pub fn write_table_atomic(
    path: &Path,
    header: &[String],
    rows: &[Vec<String>],
    terminator: csv::Terminator,
) -> Result<(), JoinError> {
    let (temp_path, temp_file) = create_temp_sibling(path)?;

    let write_result = (|| -> Result<(), JoinError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(terminator)
            .from_writer(temp_file);

        writer
            .write_record(header)
            .map_err(|e| JoinError::csv(&temp_path, e))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| JoinError::csv(&temp_path, e))?;
        }

        writer.flush().map_err(|e| JoinError::io(&temp_path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| JoinError::io(&temp_path, io::Error::other(e.to_string())))?;
        file.sync_all().map_err(|e| JoinError::io(&temp_path, e))?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        JoinError::io(path, e)
    })
}

fn create_temp_sibling(path: &Path) -> Result<(PathBuf, File), JoinError> {
    let output_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let output_name = path.file_name().ok_or_else(|| {
        JoinError::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"),
        )
    })?;

    let pid = std::process::id();
    let ts_nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    for attempt in 0..TEMP_FILE_ATTEMPTS {
        let candidate = output_dir.join(format!(
            ".{}.{}.{}.tmp",
            output_name.to_string_lossy(),
            pid,
            ts_nanos + u128::from(attempt)
        ));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(JoinError::io(candidate, e)),
        }
    }

    Err(JoinError::io(
        output_dir,
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "failed to allocate a unique temporary output file",
        ),
    ))
}
