use std::cmp::max;
use std::path::{Path, PathBuf};

use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Machine-derived defaults for the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategicConfig {
    pub cores: usize,
    pub workers: usize,
    pub queue_depth: usize,
}

impl StrategicConfig {
    pub fn detect() -> Self {
        let sys = System::new_with_specifics(RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing()));
        let cores = System::physical_core_count()
            .filter(|&n| n > 0)
            .unwrap_or_else(|| max(sys.cpus().len(), num_cpus::get()));

        let config = Self::with_workers(cores);
        log::debug!("[strategic_config] detected {} cores", cores);
        log::debug!("[strategic_config] workers: {}", config.workers);
        log::debug!("[strategic_config] queue_depth: {}", config.queue_depth);
        StrategicConfig { cores, ..config }
    }

    pub fn with_workers(workers: usize) -> Self {
        let workers = max(workers, 1);
        StrategicConfig {
            cores: workers,
            workers,
            queue_depth: workers * 2,
        }
    }
}

/// How an input path is matched against the known archive extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The file name must end with the extension.
    #[default]
    Suffix,
    /// The extension may appear anywhere in the path (`voice.nwa.bak` is an NWA).
    Substring,
}

/// What the dispatcher does once one entry of an archive has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Entries not yet started are cancelled; running ones finish.
    #[default]
    FailFast,
    /// Every entry runs; failures are reported together at the end.
    CollectAll,
}

/// Run configuration, built once at startup and handed to [`crate::run_batch`].
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub input_file: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub workers: usize,
    pub queue_depth: usize,
    pub match_mode: MatchMode,
    pub failure_policy: FailurePolicy,
    pub keep_going: bool,
}

impl ExtractConfig {
    pub fn new(strategic: &StrategicConfig) -> Self {
        ExtractConfig {
            input_file: None,
            input_dir: None,
            output_dir: None,
            workers: strategic.workers,
            queue_depth: strategic.queue_depth,
            match_mode: MatchMode::default(),
            failure_policy: FailurePolicy::default(),
            keep_going: false,
        }
    }

    pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    pub fn with_input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        let sized = StrategicConfig::with_workers(workers);
        self.workers = sized.workers;
        self.queue_depth = sized.queue_depth;
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// Directory the outputs of `archive` are written to.
    pub fn output_dir_for(&self, archive: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => archive
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_never_drops_to_zero() {
        let config = StrategicConfig::with_workers(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_depth, 2);
    }

    #[test]
    fn detected_config_is_usable() {
        let config = StrategicConfig::detect();
        assert!(config.workers >= 1);
        assert_eq!(config.queue_depth, config.workers * 2);
    }

    #[test]
    fn output_dir_defaults_to_archive_parent() {
        let config = ExtractConfig::new(&StrategicConfig::with_workers(2));
        assert_eq!(config.output_dir_for(Path::new("voice/koe.ovk")), PathBuf::from("voice"));

        let config = config.with_output_dir("out");
        assert_eq!(config.output_dir_for(Path::new("voice/koe.ovk")), PathBuf::from("out"));
    }

    #[test]
    fn bare_file_name_writes_next_to_itself() {
        let config = ExtractConfig::new(&StrategicConfig::with_workers(1));
        assert_eq!(config.output_dir_for(Path::new("koe.ovk")), PathBuf::from("."));
    }
}
