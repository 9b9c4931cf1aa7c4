//! JSON scan log: append, list, statistics, retention cleanup and CSV export.
//!
//! The log is a single document rewritten in full on every mutation. Writes go
//! to a sibling temp file which is fsynced and renamed over the log, so a crash
//! never leaves a truncated log behind. A single writer is assumed.

use crate::record::{timestamp, ScanRecord};
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOGS_DIR_NAME: &str = "logs";
pub const LOG_FILE_NAME: &str = "scan_log.json";

/// Column order of CSV exports.
pub const CSV_HEADER: [&str; 4] = ["face_id", "timestamp", "filepath", "confidence"];

#[derive(Error, Debug)]
pub enum LogError {
    #[error("failed to read scan log {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("scan log {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("face id {0} is already in the scan log")]
    DuplicateId(String),
    #[error("CSV export to {path} failed: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Aggregate view over the whole log.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanStats {
    pub total_count: usize,
    pub unique_faces: usize,
    pub earliest: Option<DateTime<FixedOffset>>,
    pub latest: Option<DateTime<FixedOffset>>,
    /// Number of distinct calendar days (in each record's own offset).
    pub distinct_days: usize,
}

impl ScanStats {
    pub fn from_records(records: &[ScanRecord]) -> Self {
        let unique_faces = records
            .iter()
            .map(|r| r.face_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let distinct_days = records
            .iter()
            .map(|r| r.timestamp.date_naive())
            .collect::<HashSet<NaiveDate>>()
            .len();

        Self {
            total_count: records.len(),
            unique_faces,
            earliest: records.iter().map(|r| r.timestamp).min(),
            latest: records.iter().map(|r| r.timestamp).max(),
            distinct_days,
        }
    }
}

#[derive(Serialize)]
struct LogDocumentRef<'a> {
    scans: &'a [ScanRecord],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LogDocument {
    Wrapped { scans: Vec<ScanRecord> },
    Bare(Vec<ScanRecord>),
}

impl LogDocument {
    fn into_records(self) -> Vec<ScanRecord> {
        match self {
            LogDocument::Wrapped { scans } => scans,
            LogDocument::Bare(scans) => scans,
        }
    }
}

/// Handle to a scan log file. Holds no records in memory.
#[derive(Debug, Clone)]
pub struct ScanLog {
    path: PathBuf,
}

impl ScanLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log at `<data_dir>/logs/scan_log.json`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(LOGS_DIR_NAME).join(LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole log. `None` when the file does not exist.
    fn load(&self) -> Result<Option<Vec<ScanRecord>>, LogError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LogError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let doc: LogDocument = serde_json::from_slice(&bytes).map_err(|source| LogError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(doc.into_records()))
    }

    /// Replace the log with `records` via temp file + rename.
    fn store(&self, records: &[ScanRecord]) -> Result<(), LogError> {
        let write_err = |path: &Path, source: io::Error| LogError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(&LogDocumentRef { scans: records })
            .map_err(|e| write_err(&self.path, io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let tmp = self.path.with_extension("json.tmp");
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(&json)?;
            file.write_all(b"\n")?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(&self.path, e));
        }

        tracing::debug!(path = %self.path.display(), records = records.len(), "scan log written");
        Ok(())
    }

    /// All records in file order. Empty if the log does not exist yet.
    pub fn list(&self) -> Result<Vec<ScanRecord>, LogError> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Add one record to the end of the log.
    ///
    /// A log that exists but cannot be parsed is left untouched and reported
    /// as [`LogError::Corrupt`].
    pub fn append(&self, record: ScanRecord) -> Result<(), LogError> {
        let mut records = self.list()?;
        if records.iter().any(|r| r.face_id == record.face_id) {
            return Err(LogError::DuplicateId(record.face_id));
        }

        tracing::debug!(face_id = %record.face_id, "appending scan record");
        records.push(record);
        self.store(&records)
    }

    pub fn statistics(&self) -> Result<ScanStats, LogError> {
        Ok(ScanStats::from_records(&self.list()?))
    }

    /// Remove records older than `older_than_days` days along with their images.
    pub fn cleanup(&self, older_than_days: u32) -> Result<usize, LogError> {
        let cutoff = Local::now().fixed_offset() - Duration::days(i64::from(older_than_days));
        self.cleanup_before(cutoff)
    }

    /// Remove records with `timestamp < cutoff` along with their images.
    ///
    /// An image that is already gone counts as deleted. If an image cannot be
    /// deleted for any other reason its record is kept so the log never loses
    /// track of a file that still exists. Returns the number of records removed.
    pub fn cleanup_before(&self, cutoff: DateTime<FixedOffset>) -> Result<usize, LogError> {
        let Some(records) = self.load()? else {
            tracing::info!(path = %self.path.display(), "no scan log; nothing to clean up");
            return Ok(0);
        };

        let before = records.len();
        let kept: Vec<ScanRecord> = records
            .into_iter()
            .filter(|record| record.timestamp >= cutoff || !remove_image(record))
            .collect();
        let removed = before - kept.len();

        if removed > 0 {
            self.store(&kept)?;
        }
        tracing::info!(
            removed,
            kept = kept.len(),
            cutoff = %timestamp::format(&cutoff),
            "cleanup finished"
        );
        Ok(removed)
    }

    /// Drop records whose image file no longer exists.
    pub fn prune_missing(&self) -> Result<usize, LogError> {
        let Some(records) = self.load()? else {
            return Ok(0);
        };

        let before = records.len();
        let kept: Vec<ScanRecord> = records
            .into_iter()
            .filter(|record| {
                let exists = Path::new(&record.filepath).exists();
                if !exists {
                    tracing::debug!(
                        face_id = %record.face_id,
                        path = %record.filepath,
                        "image missing; dropping record"
                    );
                }
                exists
            })
            .collect();
        let removed = before - kept.len();

        if removed > 0 {
            self.store(&kept)?;
        }
        Ok(removed)
    }

    /// Write every record to `dest` as CSV with a header row.
    ///
    /// Returns the number of data rows written. When the log does not exist
    /// nothing is written and 0 is returned.
    pub fn export_csv(&self, dest: &Path) -> Result<usize, LogError> {
        let Some(records) = self.load()? else {
            tracing::info!(path = %self.path.display(), "no scan log; nothing to export");
            return Ok(0);
        };

        let csv_err = |source: csv::Error| LogError::Csv {
            path: dest.to_path_buf(),
            source,
        };

        let mut writer = csv::Writer::from_path(dest).map_err(csv_err)?;
        writer.write_record(CSV_HEADER).map_err(csv_err)?;
        for record in &records {
            let confidence = record.confidence.map(|c| c.to_string()).unwrap_or_default();
            writer
                .write_record([
                    record.face_id.as_str(),
                    timestamp::format(&record.timestamp).as_str(),
                    record.filepath.as_str(),
                    confidence.as_str(),
                ])
                .map_err(csv_err)?;
        }
        writer.flush().map_err(|source| LogError::Write {
            path: dest.to_path_buf(),
            source,
        })?;

        tracing::info!(dest = %dest.display(), rows = records.len(), "scan log exported");
        Ok(records.len())
    }
}

/// Delete a record's image. Returns `true` when the file is gone afterwards.
fn remove_image(record: &ScanRecord) -> bool {
    match fs::remove_file(&record.filepath) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(
                face_id = %record.face_id,
                path = %record.filepath,
                "image already absent"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                face_id = %record.face_id,
                path = %record.filepath,
                error = %e,
                "failed to delete image; keeping record"
            );
            false
        }
    }
}
