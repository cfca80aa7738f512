// Append-only feedback ledger

use super::record_format::{decode_record, encode_record, logical_lines};
use crate::error::LedgerError;
use crate::file_manager::with_file_lock;
use crate::models::FeedbackRecord;
use log::debug;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable log of confirmed choices. There is no update or delete.
pub trait FeedbackLedger: Send + Sync {
    /// All-or-nothing append; concurrent appends never interleave
    fn append(&self, record: &FeedbackRecord) -> Result<(), LedgerError>;

    /// Every record in insertion order
    fn read_all(&self) -> Result<Vec<FeedbackRecord>, LedgerError>;

    /// Location a worker process can read the ledger from, if any
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Ledger stored as a line-per-record text file
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self) -> impl FnOnce(std::io::Error) -> LedgerError + '_ {
        move |source| LedgerError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl FeedbackLedger for FileLedger {
    fn append(&self, record: &FeedbackRecord) -> Result<(), LedgerError> {
        let line = encode_record(record);

        with_file_lock(|| {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).map_err(self.write_error())?;
            }

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(self.write_error())?;

            // One write call per record keeps O_APPEND writes whole
            file.write_all(line.as_bytes()).map_err(self.write_error())?;
            file.sync_data().map_err(self.write_error())?;
            Ok::<(), LedgerError>(())
        })?;

        debug!(
            "Appended feedback for {}: {:?}",
            record.image_reference, record.chosen_caption
        );
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<FeedbackRecord>, LedgerError> {
        let contents = with_file_lock(|| {
            if !self.path.exists() {
                return Ok(String::new());
            }
            fs::read_to_string(&self.path).map_err(|source| LedgerError::Read {
                path: self.path.clone(),
                source,
            })
        })?;

        logical_lines(&contents)
            .into_iter()
            .map(|(line, text)| {
                decode_record(&text).map_err(|reason| LedgerError::Corrupt { line, reason })
            })
            .collect()
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
