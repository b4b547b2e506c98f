use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::codec::Codec;
use crate::common_config::{ExtractConfig, FailurePolicy};
use crate::error::{ExtractError, Result};
use crate::index::read_index_file;
use crate::kind::{base_name, ArchiveKind};
use crate::report::{ArchiveReport, EntryOutcome};

// Entry sizes come from the archive, so cap what gets reserved up front.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// One entry to copy out of an archive. Owned by the worker that runs it.
#[derive(Debug, Clone)]
pub struct ExtractionTask {
    pub archive: PathBuf,
    pub position: usize,
    pub offset: u64,
    pub size: usize,
    pub kind: ArchiveKind,
    pub target: PathBuf,
}

/// `<dir>/<base>-<sequence>.<ext>`
pub fn entry_output_path(dir: &Path, base: &str, sequence: i32, kind: ArchiveKind) -> PathBuf {
    dir.join(format!("{}-{}.{}", base, sequence, kind.output_extension()))
}

/// `<dir>/<base>.<ext>`
pub fn single_output_path(dir: &Path, base: &str, kind: ArchiveKind) -> PathBuf {
    dir.join(format!("{}.{}", base, kind.output_extension()))
}

/// Reads `[offset, offset + size)` of the archive through a handle of its
/// own, decodes it when the kind needs it, and writes the target file.
pub fn extract_stream(task: &ExtractionTask, codec: &dyn Codec) -> Result<u64> {
    let mut file = File::open(&task.archive).map_err(|e| ExtractError::io(&task.archive, e))?;
    file.seek(SeekFrom::Start(task.offset))
        .map_err(|e| ExtractError::io(&task.archive, e))?;

    let mut buffer = Vec::with_capacity(task.size.min(MAX_PREALLOC));
    let found = (&mut file)
        .take(task.size as u64)
        .read_to_end(&mut buffer)
        .map_err(|e| ExtractError::io(&task.archive, e))?;
    if found != task.size {
        return Err(ExtractError::ShortRead {
            target: task.target.clone(),
            offset: task.offset,
            size: task.size,
            found,
        });
    }

    let payload = if task.kind.needs_codec() {
        decode_buffer(codec, &buffer, &task.target)?
    } else {
        buffer
    };
    write_output(&task.target, &payload)
}

fn decode_buffer(codec: &dyn Codec, input: &[u8], target: &Path) -> Result<Vec<u8>> {
    let mut decoded = Vec::new();
    let mut reader = input;
    codec
        .decode(&mut reader, &mut decoded)
        .map_err(|source| ExtractError::Codec {
            path: target.to_path_buf(),
            codec: codec.id(),
            source,
        })?;
    Ok(decoded)
}

fn write_output(target: &Path, payload: &[u8]) -> Result<u64> {
    let file = File::create(target).map_err(|e| ExtractError::io(target, e))?;
    let mut out = BufWriter::new(file);
    out.write_all(payload).map_err(|e| ExtractError::io(target, e))?;
    out.flush().map_err(|e| ExtractError::io(target, e))?;
    Ok(payload.len() as u64)
}

/// Decodes a whole `.nwa` file into `<output_dir>/<base>.wav`.
pub fn extract_single_stream(path: &Path, output_dir: &Path, codec: &dyn Codec) -> Result<ArchiveReport> {
    let kind = ArchiveKind::Nwa;
    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let target = single_output_path(output_dir, &base_name(path), kind);

    let mut decoded = Vec::new();
    codec
        .decode(&mut BufReader::new(file), &mut decoded)
        .map_err(|source| ExtractError::Codec {
            path: path.to_path_buf(),
            codec: codec.id(),
            source,
        })?;
    let bytes = write_output(&target, &decoded)?;
    debug!("{} -> {} ({} bytes)", path.display(), target.display(), bytes);

    let mut report = ArchiveReport::new(path, kind);
    report.entries = 1;
    report.dispatched = 1;
    report.record(&EntryOutcome::Extracted { path: target, bytes });
    Ok(report)
}

/// Reads the index of a `.nwk`/`.ovk` archive and extracts every valid entry.
pub fn extract_archive(
    path: &Path,
    kind: ArchiveKind,
    output_dir: &Path,
    config: &ExtractConfig,
    codec: &dyn Codec,
) -> Result<ArchiveReport> {
    let table = read_index_file(path, kind)?;
    let (valid, skipped) = table.partition(path);
    info!(
        "{}: {} entries, {} to extract, {} skipped",
        path.display(),
        table.len(),
        valid.len(),
        skipped.len()
    );

    let base = base_name(path);
    let mut seen = HashSet::with_capacity(valid.len());
    let tasks: Vec<ExtractionTask> = valid
        .into_iter()
        .map(|(position, entry)| {
            if !seen.insert(entry.sequence) {
                warn!(
                    "{}: table[{}] reuses sequence {}, its output overwrites an earlier entry",
                    path.display(),
                    position,
                    entry.sequence
                );
            }
            ExtractionTask {
                archive: path.to_path_buf(),
                position,
                offset: entry.offset as u64,
                size: entry.size as usize,
                kind,
                target: entry_output_path(output_dir, &base, entry.sequence, kind),
            }
        })
        .collect();

    let mut report = ArchiveReport::new(path, kind);
    report.entries = table.len();
    report.skipped = skipped.len();
    report.dispatched = tasks.len();

    for outcome in dispatch(tasks, config, codec)? {
        match &outcome {
            EntryOutcome::Extracted { path, bytes } => debug!("wrote {} ({} bytes)", path.display(), bytes),
            EntryOutcome::Failed { target, error } => error!("{}: {}", target.display(), error),
            EntryOutcome::Cancelled { target } => debug!("cancelled {}", target.display()),
        }
        report.record(&outcome);
    }

    if report.failed > 0 {
        return Err(ExtractError::EntriesFailed {
            archive: path.to_path_buf(),
            failed: report.failed,
            dispatched: report.dispatched,
        });
    }
    Ok(report)
}

/// Runs every task on a pool of `config.workers` threads and returns exactly
/// one outcome per task, in completion order.
pub fn dispatch(tasks: Vec<ExtractionTask>, config: &ExtractConfig, codec: &dyn Codec) -> Result<Vec<EntryOutcome>> {
    let dispatched = tasks.len();
    let Some(archive) = tasks.first().map(|t| t.archive.clone()) else {
        return Ok(Vec::new());
    };

    let workers = config.workers.clamp(1, dispatched);
    let fail_fast = config.failure_policy == FailurePolicy::FailFast;
    let (task_tx, task_rx): (Sender<ExtractionTask>, Receiver<ExtractionTask>) = bounded(config.queue_depth.max(1));
    let (done_tx, done_rx): (Sender<EntryOutcome>, Receiver<EntryOutcome>) = unbounded();
    let abort = AtomicBool::new(false);

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let rx = task_rx.clone();
            let tx = done_tx.clone();
            let abort = &abort;
            let handle = thread::Builder::new()
                .name(format!("nwatool-extract-{n}"))
                .spawn_scoped(s, move || {
                    while let Ok(task) = rx.recv() {
                        let outcome = if abort.load(Ordering::Acquire) {
                            EntryOutcome::Cancelled { target: task.target }
                        } else {
                            debug!("[worker {n}] table[{}] off {} size {}", task.position, task.offset, task.size);
                            match extract_stream(&task, codec) {
                                Ok(bytes) => EntryOutcome::Extracted { path: task.target, bytes },
                                Err(error) => {
                                    if fail_fast {
                                        abort.store(true, Ordering::Release);
                                    }
                                    EntryOutcome::Failed { target: task.target, error }
                                }
                            }
                        };
                        if tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| ExtractError::io(&archive, e))?;
            handles.push(handle);
        }
        drop(task_rx);
        drop(done_tx);

        // READER side: feed the pool, then collect one outcome per task.
        for task in tasks {
            if task_tx.send(task).is_err() {
                break;
            }
        }
        drop(task_tx);

        let outcomes: Vec<EntryOutcome> = done_rx.iter().collect();

        let mut panicked = false;
        for handle in handles {
            panicked |= handle.join().is_err();
        }
        if panicked || outcomes.len() != dispatched {
            return Err(ExtractError::WorkerPanicked(archive.clone()));
        }
        Ok(outcomes)
    })
}
