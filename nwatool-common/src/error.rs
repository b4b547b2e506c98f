//! Error types for archive classification, index parsing and extraction.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input path given on the command line does not exist.
    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Fewer bytes than an entry declares were left in the archive.
    #[error("couldn't read the data for {}: off {offset}, size {size}, got {found} bytes", .target.display())]
    ShortRead {
        target: PathBuf,
        offset: u64,
        size: usize,
        found: usize,
    },

    /// The file name matches none of `.nwa`, `.nwk` and `.ovk`.
    #[error("{}: only .nwa/.nwk/.ovk files are supported", .0.display())]
    UnrecognizedInput(PathBuf),

    /// The archive declares zero or a negative number of entries.
    #[error("{}: invalid {kind} archive: entry count = {count}", .path.display())]
    InvalidEntryCount {
        path: PathBuf,
        kind: &'static str,
        count: i32,
    },

    /// The index table ends before `count` records were read.
    #[error("{}: couldn't read index entry {position} of {count}", .path.display())]
    TruncatedIndex {
        path: PathBuf,
        position: usize,
        count: i32,
    },

    #[error("{} codec failed on {}: {source}", .codec, .path.display())]
    Codec {
        path: PathBuf,
        codec: &'static str,
        #[source]
        source: CodecError,
    },

    #[error("{}: {failed} of {dispatched} entries failed", .archive.display())]
    EntriesFailed {
        archive: PathBuf,
        failed: usize,
        dispatched: usize,
    },

    #[error("no input file or input directory given")]
    NoInputs,

    #[error("no .nwa/.nwk/.ovk files found in {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("extraction worker panicked while processing {}", .0.display())]
    WorkerPanicked(PathBuf),
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that skip the current input instead of stopping the batch.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ExtractError::UnrecognizedInput(_) | ExtractError::InvalidEntryCount { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_header_problems_are_skippable() {
        assert!(ExtractError::UnrecognizedInput("a.txt".into()).is_skippable());
        assert!(ExtractError::InvalidEntryCount {
            path: "a.ovk".into(),
            kind: "ovk",
            count: 0
        }
        .is_skippable());

        assert!(!ExtractError::MissingInput("a.nwa".into()).is_skippable());
        assert!(!ExtractError::io("a.nwk", io::Error::from(io::ErrorKind::UnexpectedEof)).is_skippable());
        assert!(!ExtractError::TruncatedIndex {
            path: "a.nwk".into(),
            position: 3,
            count: 9
        }
        .is_skippable());
    }

    #[test]
    fn messages_name_the_file() {
        let err = ExtractError::ShortRead {
            target: "out/koe-7.wav".into(),
            offset: 40,
            size: 100,
            found: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("koe-7.wav"));
        assert!(msg.contains("off 40"));
        assert!(msg.contains("size 100"));
    }
}
