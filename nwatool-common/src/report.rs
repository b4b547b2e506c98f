use std::path::PathBuf;

use crate::error::ExtractError;
use crate::kind::ArchiveKind;

/// Result of one extraction task, sent back to the dispatcher.
#[derive(Debug)]
pub enum EntryOutcome {
    Extracted { path: PathBuf, bytes: u64 },
    Failed { target: PathBuf, error: ExtractError },
    /// Not started because an earlier entry of the same archive failed.
    Cancelled { target: PathBuf },
}

#[derive(Debug)]
pub struct ArchiveReport {
    pub archive: PathBuf,
    pub kind: ArchiveKind,
    pub entries: usize,
    pub dispatched: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub bytes_written: u64,
    pub outputs: Vec<PathBuf>,
}

impl ArchiveReport {
    pub fn new(archive: impl Into<PathBuf>, kind: ArchiveKind) -> Self {
        ArchiveReport {
            archive: archive.into(),
            kind,
            entries: 0,
            dispatched: 0,
            extracted: 0,
            skipped: 0,
            failed: 0,
            cancelled: 0,
            bytes_written: 0,
            outputs: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Extracted { path, bytes } => {
                self.extracted += 1;
                self.bytes_written += bytes;
                self.outputs.push(path.clone());
            }
            EntryOutcome::Failed { .. } => self.failed += 1,
            EntryOutcome::Cancelled { .. } => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub archives_total: usize,
    pub archives_extracted: usize,
    pub archives_skipped: usize,
    pub archives_failed: usize,
    pub entries_total: usize,
    pub entries_extracted: usize,
    pub entries_skipped: usize,
    pub entries_failed: usize,
    pub bytes_written: u64,
    pub outputs: Vec<PathBuf>,
}

impl BatchReport {
    pub fn add(&mut self, report: ArchiveReport) {
        self.archives_total += 1;
        self.archives_extracted += 1;
        self.entries_total += report.entries;
        self.entries_extracted += report.extracted;
        self.entries_skipped += report.skipped;
        self.entries_failed += report.failed;
        self.bytes_written += report.bytes_written;
        self.outputs.extend(report.outputs);
    }

    pub fn add_skipped(&mut self) {
        self.archives_total += 1;
        self.archives_skipped += 1;
    }

    pub fn add_failed(&mut self, error: &ExtractError) {
        self.archives_total += 1;
        self.archives_failed += 1;
        if let ExtractError::EntriesFailed { failed, .. } = error {
            self.entries_failed += failed;
        }
    }

    pub fn is_success(&self) -> bool {
        self.archives_failed == 0
    }
}
