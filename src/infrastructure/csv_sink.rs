//! Flat-file (CSV) sink
//!
//! The dataset is written to `<path>.tmp`, flushed, and renamed over `<path>`,
//! so a reader of `<path>` sees either the previous file or the complete new
//! one.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::dataset::Dataset;

#[derive(Error, Debug)]
pub enum CsvSinkError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode CSV row {row}: {source}")]
    Encode {
        row: usize,
        #[source]
        source: csv::Error,
    },
}

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(ToOwned::to_owned).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write the whole dataset; returns the number of data rows written
    pub fn write(&self, dataset: &Dataset) -> Result<usize, CsvSinkError> {
        let staging = self.staging_path();
        let result = self.write_staged(&staging, dataset);
        if result.is_err() {
            // never leave a half-written staging file behind
            let _ = fs::remove_file(&staging);
        }
        result
    }

    fn write_staged(&self, staging: &Path, dataset: &Dataset) -> Result<usize, CsvSinkError> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CsvSinkError::Io { path, source }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let file = File::create(staging).map_err(io_error(staging))?;
        let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(file);

        // header comes from the first record's field names
        for (row, record) in dataset.iter().enumerate() {
            writer
                .serialize(record)
                .map_err(|source| CsvSinkError::Encode { row, source })?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| CsvSinkError::Io {
                path: staging.to_path_buf(),
                source: e.into_error(),
            })?;
        file.sync_all().map_err(io_error(staging))?;
        drop(file);

        fs::rename(staging, &self.path).map_err(io_error(self.path.as_path()))?;

        debug!("Renamed {} over {}", staging.display(), self.path.display());
        info!("Wrote {} records to {}", dataset.len(), self.path.display());
        Ok(dataset.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::DedupAccumulator;
    use crate::domain::record::fixtures::sample_draft;

    fn dataset(amounts: &[&str]) -> Dataset {
        let mut acc = DedupAccumulator::new();
        for amount in amounts {
            acc.offer(sample_draft(amount));
        }
        acc.into_dataset()
    }

    #[test]
    fn test_writes_header_and_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));

        let written = sink.write(&dataset(&["$1,001 - $15,000", "$15,001 - $50,000"])).unwrap();
        assert_eq!(written, 2);

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "id,filer,date,owner,ticker,asset_name,asset_type,tx_type,amount,comment"
        );
        // embedded commas are quoted, absent comment is an empty trailing cell
        assert!(lines[1].contains(",\"Tuberville, Tommy\",2025-10-03,Spouse,MSFT,"));
        assert!(lines[1].ends_with(",\"$1,001 - $15,000\","));
    }

    #[test]
    fn test_no_staging_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));
        sink.write(&dataset(&["$1,001 - $15,000"])).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["out.csv".to_string()]);
    }

    #[test]
    fn test_unwritable_target_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        // the target path is an existing directory, so the final rename fails
        let target = dir.path().join("taken");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let sink = CsvSink::new(&target);
        assert!(sink.write(&dataset(&["$1,001 - $15,000"])).is_err());
        assert!(!dir.path().join("taken.tmp").exists());
    }
}
