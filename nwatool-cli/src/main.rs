// nwatool-cli/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

use nwatool_common::{
    list_archive, run_batch, ArchiveKind, BatchReport, ExtractConfig, FailurePolicy, MatchMode, StrategicConfig,
};
use nwatool_nwa::NwaCodec;

#[derive(Parser)]
#[command(name = "nwatool")]
#[command(about = "nwatool: extract and decode NWA/NWK/OVK audio archives", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Without a subcommand the arguments are those of `extract`
    #[command(flatten)]
    extract: ExtractArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every stream of the given archives
    Extract(ExtractArgs),

    /// Print the index table of a .nwk/.ovk archive
    List {
        input: PathBuf,

        #[arg(long)]
        loose_match: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ExtractArgs {
    /// Archive file or directory of archives
    input: Option<PathBuf>,

    #[arg(long = "input-file", alias = "inputfile", value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// Every .nwa/.nwk/.ovk directly inside DIR
    #[arg(long = "input-dir", alias = "inputdir", value_name = "DIR")]
    input_dir: Option<PathBuf>,

    /// Defaults to the directory of each archive
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Worker threads per archive
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Match the extension anywhere in the path instead of as a suffix
    #[arg(long)]
    loose_match: bool,

    /// Keep extracting the rest of an archive after an entry fails
    #[arg(long)]
    collect_failures: bool,

    /// Continue with the next archive after one fails
    #[arg(long)]
    keep_going: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn match_mode(loose: bool) -> MatchMode {
    if loose {
        MatchMode::Substring
    } else {
        MatchMode::Suffix
    }
}

impl ExtractArgs {
    fn into_config(self) -> Result<ExtractConfig> {
        let mut input_file = self.input_file;
        let mut input_dir = self.input_dir;
        if let Some(input) = self.input {
            let slot = if input.is_dir() { &mut input_dir } else { &mut input_file };
            if let Some(existing) = slot {
                bail!("{} given twice (also as {})", input.display(), existing.display());
            }
            *slot = Some(input);
        }

        let strategic = match self.jobs {
            Some(0) => bail!("--jobs must be at least 1"),
            Some(n) => StrategicConfig::with_workers(n),
            None => StrategicConfig::detect(),
        };

        let mut config = ExtractConfig::new(&strategic)
            .with_match_mode(match_mode(self.loose_match))
            .with_keep_going(self.keep_going);
        if self.collect_failures {
            config = config.with_failure_policy(FailurePolicy::CollectAll);
        }
        if let Some(file) = input_file {
            config = config.with_input_file(file);
        }
        if let Some(dir) = input_dir {
            config = config.with_input_dir(dir);
        }
        if let Some(dir) = self.output_dir {
            config = config.with_output_dir(dir);
        }
        Ok(config)
    }
}

const LEGACY_FLAGS: [&str; 2] = ["inputfile", "inputdir"];

/// Rewrites the single-dash `-inputfile`/`-inputdir` of the old tool
/// (also in `-flag=value` form) to their long spelling.
fn normalize_legacy_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-').filter(|r| !r.starts_with('-')) else {
                return arg;
            };
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            if LEGACY_FLAGS.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn summary_lines(report: &BatchReport, list_outputs: bool) -> Vec<String> {
    let mut lines = vec![
        "\n✅ Extraction finished:".to_string(),
        format!("📁 Archives:            {}", report.archives_total),
        format!("📦 Archives extracted:  {}", report.archives_extracted),
        format!("⏭️  Archives skipped:    {}", report.archives_skipped),
        format!("❌ Archives failed:     {}", report.archives_failed),
        format!("🎵 Streams extracted:   {} of {}", report.entries_extracted, report.entries_total),
        format!("⚠️  Streams skipped:     {}", report.entries_skipped),
        format!("💥 Streams failed:      {}", report.entries_failed),
        format!("📤 Bytes written:       {}", report.bytes_written),
    ];
    if list_outputs {
        lines.extend(report.outputs.iter().map(|path| format!("   {}", path.display())));
    }
    lines
}

fn extract(args: ExtractArgs) -> Result<()> {
    let verbose = args.verbose;
    let config = args.into_config()?;
    let report = run_batch(&config, &NwaCodec).context("extraction aborted")?;
    for line in summary_lines(&report, verbose) {
        println!("{line}");
    }
    if !report.is_success() {
        bail!("{} of {} archives failed", report.archives_failed, report.archives_total);
    }
    Ok(())
}

fn list(input: PathBuf, loose_match: bool) -> Result<()> {
    let kind = ArchiveKind::classify(&input, match_mode(loose_match))
        .with_context(|| format!("{} is not a .nwa, .nwk or .ovk file", input.display()))?;
    if !kind.is_multi_stream() {
        println!("{}: single .{} stream, no index table", input.display(), kind);
        return Ok(());
    }

    let entries = list_archive(&input, kind)?;
    println!("📦 {} ({} entries)", input.display(), entries.len());
    println!("{:>5}  {:>8}  {:>10}  {:>10}  {:>10}  status", "#", "seq", "offset", "size", "orig");
    for listed in &entries {
        let e = listed.entry;
        let orig = if kind == ArchiveKind::Ovk { e.original_size.to_string() } else { "-".into() };
        let status = if listed.valid { "ok" } else { "skipped" };
        println!(
            "{:>5}  {:>8}  {:>10}  {:>10}  {:>10}  {}",
            listed.position, e.sequence, e.offset, e.size, orig, status
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_legacy_args(std::env::args_os()));

    match cli.command {
        Some(Commands::Extract(args)) => {
            init_logging(args.verbose);
            extract(args)
        }
        Some(Commands::List { input, loose_match }) => {
            init_logging(false);
            list(input, loose_match)
        }
        None => {
            init_logging(cli.extract.verbose);
            extract(cli.extract)
        }
    }
}
