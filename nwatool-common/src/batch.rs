use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use walkdir::WalkDir;

use crate::codec::Codec;
use crate::common_config::{ExtractConfig, MatchMode};
use crate::error::{ExtractError, Result};
use crate::extract::{extract_archive, extract_single_stream};
use crate::kind::ArchiveKind;
use crate::report::{ArchiveReport, BatchReport};

/// Files directly inside `dir` whose name is a known archive kind, sorted by name.
pub fn scan_directory(dir: &Path, mode: MatchMode) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ExtractError::io(path, io::Error::from(e))
        })?;
        if !entry.path().is_file() {
            continue;
        }
        // Match on the name only, a directory called `voice.nwa` must not pull in everything below it.
        if ArchiveKind::classify(Path::new(entry.file_name()), mode).is_some() {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Input file first, then the contents of the input directory.
pub fn collect_inputs(config: &ExtractConfig) -> Result<Vec<PathBuf>> {
    if config.input_file.is_none() && config.input_dir.is_none() {
        return Err(ExtractError::NoInputs);
    }

    let mut inputs = Vec::new();
    if let Some(file) = &config.input_file {
        if !file.exists() {
            return Err(ExtractError::MissingInput(file.clone()));
        }
        inputs.push(file.clone());
    }
    if let Some(dir) = &config.input_dir {
        if !dir.exists() {
            return Err(ExtractError::MissingInput(dir.clone()));
        }
        let found = scan_directory(dir, config.match_mode)?;
        if found.is_empty() {
            return Err(ExtractError::EmptyDirectory(dir.clone()));
        }
        inputs.extend(found);
    }
    Ok(inputs)
}

/// Classifies one input and extracts it.
pub fn process_archive(path: &Path, config: &ExtractConfig, codec: &dyn Codec) -> Result<ArchiveReport> {
    let kind = ArchiveKind::classify(path, config.match_mode)
        .ok_or_else(|| ExtractError::UnrecognizedInput(path.to_path_buf()))?;

    let output_dir = config.output_dir_for(path);
    if config.output_dir.is_some() {
        fs::create_dir_all(&output_dir).map_err(|e| ExtractError::io(&output_dir, e))?;
    }

    info!("Processing {} as .{}", path.display(), kind);
    if kind.is_multi_stream() {
        extract_archive(path, kind, &output_dir, config, codec)
    } else {
        extract_single_stream(path, &output_dir, codec)
    }
}

/// Processes every input one archive at a time.
///
/// Unrecognized inputs and archives with an invalid entry count are skipped.
/// Any other error ends the batch, unless `keep_going` is set, in which case
/// it is logged and counted in the report.
pub fn run_batch(config: &ExtractConfig, codec: &dyn Codec) -> Result<BatchReport> {
    let inputs = collect_inputs(config)?;
    let mut batch = BatchReport::default();

    for path in &inputs {
        match process_archive(path, config, codec) {
            Ok(report) => {
                info!(
                    "{}: extracted {} of {} .{} entries ({} bytes)",
                    path.display(),
                    report.extracted,
                    report.entries,
                    report.kind,
                    report.bytes_written
                );
                batch.add(report);
            }
            Err(e) if e.is_skippable() => {
                warn!("Skipping {}", e);
                batch.add_skipped();
            }
            Err(e) if config.keep_going => {
                error!("{}", e);
                batch.add_failed(&e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_config::StrategicConfig;

    fn config() -> ExtractConfig {
        ExtractConfig::new(&StrategicConfig::with_workers(2))
    }

    #[test]
    fn scan_is_flat_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.nwk", "a.nwa", "c.ovk", "notes.txt", "d.nwa.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("e.nwa"), b"x").unwrap();

        let found = scan_directory(dir.path(), MatchMode::Suffix).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.nwa", "b.nwk", "c.ovk"]);

        let loose = scan_directory(dir.path(), MatchMode::Substring).unwrap();
        assert_eq!(loose.len(), 4);
    }

    #[test]
    fn nothing_to_do_is_an_error() {
        assert!(matches!(collect_inputs(&config()), Err(ExtractError::NoInputs)));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.nwa");
        let err = collect_inputs(&config().with_input_file(&missing)).unwrap_err();
        assert!(matches!(&err, ExtractError::MissingInput(p) if p == &missing));
        assert!(err.to_string().contains("nope.nwa"));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        let err = collect_inputs(&config().with_input_dir(dir.path())).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDirectory(_)));
    }

    #[test]
    fn file_comes_before_directory() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single.ovk");
        fs::write(&single, b"x").unwrap();
        let sub = dir.path().join("batch");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("a.ovk"), b"x").unwrap();

        let inputs = collect_inputs(&config().with_input_file(&single).with_input_dir(&sub)).unwrap();
        assert_eq!(inputs, vec![single, sub.join("a.ovk")]);
    }

    #[test]
    fn unrecognized_input_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("track.mp3");
        fs::write(&odd, b"x").unwrap();

        let batch = run_batch(&config().with_input_file(&odd), &crate::codec::PassthroughCodec).unwrap();
        assert_eq!(batch.archives_total, 1);
        assert_eq!(batch.archives_skipped, 1);
        assert!(batch.is_success());
    }
}
