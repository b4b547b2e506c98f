// nwatool-common/src/lib.rs

pub mod batch;
pub mod codec;
pub mod common_config;
pub mod error;
pub mod extract;
pub mod index;
pub mod kind;
pub mod report;

pub use batch::{collect_inputs, process_archive, run_batch, scan_directory};
pub use codec::{Codec, CodecError, PassthroughCodec};
pub use common_config::{ExtractConfig, FailurePolicy, MatchMode, StrategicConfig};
pub use error::{ExtractError, Result};
pub use extract::{
    dispatch, entry_output_path, extract_archive, extract_single_stream, extract_stream, single_output_path,
    ExtractionTask,
};
pub use index::{list_archive, read_index_file, read_index_table, IndexEntry, IndexTable, ListedEntry};
pub use kind::{base_name, ArchiveKind, KNOWN_KINDS};
pub use report::{ArchiveReport, BatchReport, EntryOutcome};
