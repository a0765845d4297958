//! regpack - Compress register-initialization tables in C headers
//!
//! This tool reads headers holding register tables, collapses zero-runs
//! and packs sequential writes into bursts, and writes the compressed
//! header next to the original.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use regpack_core::{header, BlockPolicy, Codec, CodecConfig, SequenceCodec};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Compress register-initialization tables in C headers
#[derive(Parser, Debug)]
#[command(name = "regpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory for compressed headers (default: next to each input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only headers whose file name starts with this are processed in directory mode
    #[arg(long, env = "REGPACK_PREFIX", default_value = "eco_58")]
    prefix: String,

    /// Suffix appended to the file stem of compressed headers
    #[arg(long, env = "REGPACK_SUFFIX", default_value = "_cmpr")]
    suffix: String,

    /// Descend into subdirectories in directory mode
    #[arg(short, long)]
    recursive: bool,

    /// What to do with a table that cannot be encoded
    #[arg(long, value_enum, default_value = "abort")]
    on_error: OnError,

    /// Zero-runs must be longer than this to be collapsed
    #[arg(long, default_value_t = regpack_core::codec::MIN_ZEROS)]
    min_zeros: usize,

    /// Sequential runs must be longer than this to be packed as bursts
    #[arg(long, default_value_t = regpack_core::codec::MIN_SEQ)]
    min_seq: usize,

    /// Largest count a zero-run marker may carry
    #[arg(long)]
    max_switch: Option<u32>,

    /// Largest count a burst marker may carry
    #[arg(long)]
    max_burst: Option<u32>,

    /// Decode every compressed table and compare it with the original
    #[arg(long)]
    check: bool,

    /// Dry run - don't write files, just show what would be written
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single header file to compress
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of headers to compress
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Policy for tables that fail to encode
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnError {
    /// Fail the whole header
    Abort,
    /// Keep the failing table as written
    Retain,
}

impl From<OnError> for BlockPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => BlockPolicy::Abort,
            OnError::Retain => BlockPolicy::Retain,
        }
    }
}

/// What happened to one output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Written,
    Unchanged,
    DryRun,
}

#[derive(Default)]
struct RunStats {
    files: usize,
    written: usize,
    unchanged: usize,
    blocks: usize,
    retained: usize,
    entries_saved: usize,
}

impl RunStats {
    fn print_summary(&self) {
        info!(
            "Summary: {} files, {} tables ({} kept as written), {} entries saved, {} written, {} unchanged",
            self.files, self.blocks, self.retained, self.entries_saved, self.written, self.unchanged
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let codec = Codec::with_config(codec_config(&cli));
    let mut stats = RunStats::default();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, &codec, file, &mut stats)?;
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, &codec, directory, &mut stats)?;
    } else {
        bail!("Either --file or --directory must be specified")
    }

    if !cli.dry_run {
        stats.print_summary();
    }
    Ok(())
}

fn codec_config(cli: &Cli) -> CodecConfig {
    let mut config = CodecConfig::new()
        .min_zeros(cli.min_zeros)
        .min_seq(cli.min_seq);
    if let Some(max) = cli.max_switch {
        config = config.max_switch_count(max);
    }
    if let Some(max) = cli.max_burst {
        config = config.max_burst_count(max);
    }
    config
}

/// Process a single header file
fn process_single_file(
    cli: &Cli,
    codec: &dyn SequenceCodec,
    file: &Path,
    stats: &mut RunStats,
) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    process_header(cli, codec, file, stats)
}

/// Process every matching header in a directory
fn process_directory(
    cli: &Cli,
    codec: &dyn SequenceCodec,
    directory: &Path,
    stats: &mut RunStats,
) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let max_depth = if cli.recursive { usize::MAX } else { 1 };
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        if !is_candidate(path, &cli.prefix, &cli.suffix) {
            trace!("Skipping: {}", path.display());
            continue;
        }

        debug!("Processing header: {}", path.display());
        if let Err(e) = process_header(cli, codec, path, stats) {
            // Log error but continue with other files
            warn!("Error processing {}: {:#}", path.display(), e);
        }
    }

    Ok(())
}

/// Returns true for `<prefix>*.h` files that are not themselves compressed output
fn is_candidate(path: &Path, prefix: &str, suffix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(prefix) && name.ends_with(".h") && !name.contains(suffix)
}

/// Returns where the compressed form of `input` goes
fn output_path(input: &Path, output_dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("header");
    let name = format!("{}{}.h", stem, suffix);
    match output_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

/// Compress the tables of one header and write the result
fn process_header(
    cli: &Cli,
    codec: &dyn SequenceCodec,
    input: &Path,
    stats: &mut RunStats,
) -> Result<()> {
    trace!("Reading {}", input.display());
    let header = header::parse_file(input)
        .with_context(|| format!("Failed to parse header: {}", input.display()))?;

    let (encoded, report) = header
        .transform(codec, cli.on_error.into())
        .with_context(|| format!("Failed to compress header: {}", input.display()))?;

    for failure in &report.retained {
        warn!("{}: {}", input.display(), failure);
    }

    if cli.check {
        header
            .verify(&encoded, codec)
            .with_context(|| format!("Round-trip check failed: {}", input.display()))?;
        debug!("Round-trip check passed for {}", input.display());
    }

    stats.files += 1;
    stats.blocks += report.blocks;
    stats.retained += report.retained.len();
    stats.entries_saved += report.entries_saved();

    let output = output_path(input, cli.output.as_deref(), &cli.suffix);
    let content = encoded.render();
    match write_header(&output, &content, cli.force, cli.dry_run)? {
        WriteOutcome::Written => {
            println!("Wrote {}", output.display());
            stats.written += 1;
        }
        WriteOutcome::Unchanged => {
            info!("Unchanged: {}", output.display());
            stats.unchanged += 1;
        }
        WriteOutcome::DryRun => {
            println!("Would write: {}", output.display());
            if cli.verbose > 0 {
                println!("---");
                println!("{}", content);
                println!("---");
            }
        }
    }

    Ok(())
}

/// Compute a short hash of the content (first 8 chars of blake3)
fn content_hash(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    hash.to_hex()[..8].to_string()
}

/// Write a compressed header, leaving identical existing output alone
fn write_header(output: &Path, content: &str, force: bool, dry_run: bool) -> Result<WriteOutcome> {
    if output.exists() {
        let existing = fs::read(output)
            .with_context(|| format!("Failed to read existing output: {}", output.display()))?;
        if content_hash(&existing) == content_hash(content.as_bytes()) {
            return Ok(WriteOutcome::Unchanged);
        }
        if !force && !dry_run {
            bail!(
                "File already exists: {} (use --force to overwrite)",
                output.display()
            );
        }
    }

    if dry_run {
        return Ok(WriteOutcome::DryRun);
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(output, content)
        .with_context(|| format!("Failed to write file: {}", output.display()))?;

    Ok(WriteOutcome::Written)
}
