use std::fmt;
use std::path::Path;

use crate::common_config::MatchMode;

/// The three container kinds the tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// A single compressed stream (`.nwa`).
    Nwa,
    /// A voice archive of compressed streams, 12-byte index records (`.nwk`).
    Nwk,
    /// An archive of Ogg Vorbis streams, 16-byte index records (`.ovk`).
    Ovk,
}

/// Checked in this order, so a path containing several of them resolves to the first.
pub const KNOWN_KINDS: [ArchiveKind; 3] = [ArchiveKind::Nwa, ArchiveKind::Nwk, ArchiveKind::Ovk];

impl ArchiveKind {
    pub const fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Nwa => "nwa",
            ArchiveKind::Nwk => "nwk",
            ArchiveKind::Ovk => "ovk",
        }
    }

    /// Size in bytes of one index record; 0 for the single-stream kind.
    pub const fn header_block_size(self) -> usize {
        match self {
            ArchiveKind::Nwa => 0,
            ArchiveKind::Nwk => 12,
            ArchiveKind::Ovk => 16,
        }
    }

    pub const fn output_extension(self) -> &'static str {
        match self {
            ArchiveKind::Nwa | ArchiveKind::Nwk => "wav",
            ArchiveKind::Ovk => "ogg",
        }
    }

    pub const fn is_multi_stream(self) -> bool {
        !matches!(self, ArchiveKind::Nwa)
    }

    /// Whether the payload has to go through the codec before it is written.
    pub const fn needs_codec(self) -> bool {
        matches!(self, ArchiveKind::Nwa | ArchiveKind::Nwk)
    }

    pub fn classify(path: &Path, mode: MatchMode) -> Option<ArchiveKind> {
        match mode {
            MatchMode::Suffix => {
                let name = path.file_name()?.to_str()?;
                KNOWN_KINDS.into_iter().find(|kind| {
                    name.strip_suffix(kind.extension())
                        .is_some_and(|stem| stem.ends_with('.') && stem.len() > 1)
                })
            }
            MatchMode::Substring => {
                let full = path.to_string_lossy();
                KNOWN_KINDS
                    .into_iter()
                    .find(|kind| full.contains(&format!(".{}", kind.extension())))
            }
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// File name up to its first `.`; `voice.ovk` and `voice.v2.ovk` both give `voice`.
pub fn base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}
