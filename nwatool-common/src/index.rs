// index.rs - index table of .nwk/.ovk archives

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{ExtractError, Result};
use crate::kind::ArchiveKind;

/// One record of the index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub size: i32,
    pub offset: i32,
    /// Names the output file: `<base>-<sequence>.<ext>`.
    pub sequence: i32,
    /// Decoded size hint. Only `.ovk` records carry it; 0 for `.nwk`.
    pub original_size: i32,
}

impl IndexEntry {
    pub fn is_valid(&self) -> bool {
        self.offset > 0 && self.size > 0
    }

    fn from_record(record: &[u8]) -> Self {
        let field = |i: usize| {
            record
                .get(i * 4..i * 4 + 4)
                .map_or(0, |b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        };
        IndexEntry {
            size: field(0),
            offset: field(1),
            sequence: field(2),
            original_size: field(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTable {
    pub kind: ArchiveKind,
    pub entries: Vec<IndexEntry>,
}

impl IndexTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sizes(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|e| e.size)
    }

    pub fn offsets(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|e| e.offset)
    }

    pub fn sequences(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|e| e.sequence)
    }

    pub fn original_sizes(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|e| e.original_size)
    }

    /// Splits the table into entries worth extracting and those that are skipped.
    /// Each item keeps its table position for diagnostics.
    pub fn partition(&self, archive: &Path) -> (Vec<(usize, IndexEntry)>, Vec<(usize, IndexEntry)>) {
        let mut valid = Vec::with_capacity(self.entries.len());
        let mut skipped = Vec::new();
        for (i, entry) in self.entries.iter().copied().enumerate() {
            if entry.is_valid() {
                valid.push((i, entry));
            } else {
                log::warn!(
                    "Skipping {}: invalid table[{}]: cnt {}, off {}, size {}",
                    archive.display(),
                    i,
                    entry.sequence,
                    entry.offset,
                    entry.size
                );
                skipped.push((i, entry));
            }
        }
        (valid, skipped)
    }
}

/// Reads the entry count and the records that follow it.
///
/// `archive` only names the file in errors. A count of zero or less is
/// [`ExtractError::InvalidEntryCount`], and so is a file too short to hold
/// the count. A record table that comes up short is fatal for the archive.
pub fn read_index_table<R: Read>(reader: &mut R, kind: ArchiveKind, archive: &Path) -> Result<IndexTable> {
    let record_size = kind.header_block_size();
    debug_assert!(record_size > 0, "{kind} has no index table");

    let mut count_buf = [0u8; 4];
    let count = match reader.read_exact(&mut count_buf) {
        Ok(()) => i32::from_le_bytes(count_buf),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
        Err(e) => return Err(ExtractError::io(archive, e)),
    };
    if count <= 0 {
        return Err(ExtractError::InvalidEntryCount {
            path: archive.to_path_buf(),
            kind: kind.extension(),
            count,
        });
    }

    // The count comes straight from the file; don't trust it for the allocation.
    let mut entries = Vec::with_capacity((count as usize).min(4096));
    let mut record = [0u8; 16];
    for position in 0..count as usize {
        match reader.read_exact(&mut record[..record_size]) {
            Ok(()) => entries.push(IndexEntry::from_record(&record[..record_size])),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(ExtractError::TruncatedIndex {
                    path: archive.to_path_buf(),
                    position,
                    count,
                })
            }
            Err(e) => return Err(ExtractError::io(archive, e)),
        }
    }

    Ok(IndexTable { kind, entries })
}

pub fn read_index_file(path: &Path, kind: ArchiveKind) -> Result<IndexTable> {
    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    read_index_table(&mut BufReader::new(file), kind, path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub position: usize,
    pub entry: IndexEntry,
    pub valid: bool,
}

/// Index table of a multi-stream archive with validity per entry, for listing.
pub fn list_archive(path: &Path, kind: ArchiveKind) -> Result<Vec<ListedEntry>> {
    let table = read_index_file(path, kind)?;
    Ok(table
        .entries
        .iter()
        .enumerate()
        .map(|(position, entry)| ListedEntry {
            position,
            entry: *entry,
            valid: entry.is_valid(),
        })
        .collect())
}
