use clap::{Parser, Subcommand};
use fitsize::batch::{BatchEvent, BatchRunner, CancelToken};
use fitsize::config::{self, Settings};
use fitsize::imaging::{ImageBackend, supported_input_extensions};
use fitsize::{CompressError, CompressionResult, Totals, output};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fitsize")]
#[command(version)]
#[command(about = "Re-encode images to fit a byte budget")]
#[command(long_about = "\
Re-encode images to fit a byte budget

Each image is scaled down to fit the pixel bounds (never up), then encoded
as JPEG at the highest quality whose output fits the byte budget.

Defaults: 1920x1080 bounds, 100 KiB budget, 10 search steps.

Run 'fitsize gen-config' to generate a documented config file.")]
struct Cli {
    /// Log search and pipeline detail (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct CompressArgs {
    /// Image files or directories (searched recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for compressed images and manifest.json
    #[arg(long, default_value = "compressed")]
    out_dir: PathBuf,

    /// TOML config file (see gen-config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum output width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum output height in pixels
    #[arg(long)]
    max_height: Option<u32>,

    /// Byte budget per output image
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Quality search steps per image
    #[arg(long)]
    iterations: Option<u32>,

    /// Stop starting new images after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Compress and report without writing any files
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compress images to fit the configured bounds and budget
    Compress(CompressArgs),
    /// Print a stock config file with all options documented
    GenConfig,
}

/// Written to `<out-dir>/manifest.json` after a run.
#[derive(Serialize)]
struct RunManifest<'a> {
    results: Vec<ManifestEntry<'a>>,
    failures: Vec<ManifestFailure>,
    totals: Totals,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    output: String,
    #[serde(flatten)]
    result: &'a CompressionResult,
}

#[derive(Serialize)]
struct ManifestFailure {
    name: String,
    error: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Command::Compress(args) => run_compress(args)?,
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(())
}

fn run_compress(args: CompressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = resolve_settings(&args)?;
    init_thread_pool(&settings.processing);

    let paths = collect_inputs(&args.inputs);
    if paths.is_empty() {
        return Err("no supported images found in the given inputs".into());
    }

    let runner = BatchRunner::new();
    let cancel = CancelToken::new();
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = {
        let cancel = cancel.clone();
        let fail_fast = args.fail_fast;
        std::thread::spawn(move || {
            for event in rx {
                if fail_fast && matches!(event, BatchEvent::Failed { .. }) {
                    cancel.cancel();
                }
                for line in output::format_batch_event(&event) {
                    println!("{}", line);
                }
            }
        })
    };

    let outcomes = runner.compress_paths(&paths, &settings.compression, &cancel, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;

    let failures: Vec<&CompressError> =
        outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    let totals = runner.totals();

    if !args.dry_run {
        write_outputs(&args.out_dir, runner.backend(), &outcomes, totals)?;
    }

    println!();
    println!("{}", output::format_totals(&totals));

    if !failures.is_empty() {
        return Err(format!("{} of {} images failed", failures.len(), paths.len()).into());
    }
    Ok(())
}

/// Stock defaults, then the config file, then CLI flags.
fn resolve_settings(args: &CompressArgs) -> Result<Settings, config::ConfigError> {
    let mut settings = match &args.config {
        Some(path) => config::load_settings(path)?,
        None => Settings::default(),
    };
    let c = &mut settings.compression;
    if let Some(w) = args.max_width {
        c.max_width = w;
    }
    if let Some(h) = args.max_height {
        c.max_height = h;
    }
    if let Some(b) = args.max_bytes {
        c.max_bytes = b;
    }
    if let Some(n) = args.iterations {
        c.quality_search_iterations = n;
    }
    settings.validate()?;
    Ok(settings)
}

/// Expand directories into the supported image files beneath them.
///
/// Explicit file arguments are kept as given, so an unsupported file is
/// reported as a per-image failure rather than silently skipped.
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let exts = supported_input_extensions();
    let mut paths = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = walkdir::WalkDir::new(input)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
            })
            .collect();
        found.sort();
        paths.extend(found);
    }
    paths
}

/// Write each compressed image plus `manifest.json` into `out_dir`.
fn write_outputs(
    out_dir: &Path,
    backend: &impl ImageBackend,
    outcomes: &[Result<CompressionResult, CompressError>],
    totals: Totals,
) -> std::io::Result<()> {
    std::fs::create_dir_all(out_dir)?;

    let mut used = HashSet::new();
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) => {
                let file_name =
                    output::output_file_name(result.name(), backend.output_extension(), &mut used);
                std::fs::write(out_dir.join(&file_name), result.compressed())?;
                results.push(ManifestEntry {
                    output: file_name,
                    result,
                });
            }
            Err(e) => failures.push(ManifestFailure {
                name: e.name().to_string(),
                error: e.to_string(),
            }),
        }
    }

    let manifest = RunManifest {
        results,
        failures,
        totals,
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(out_dir.join("manifest.json"), json)
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if verbose { "fitsize=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("failed to install tracing subscriber: {e}").into())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. The user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
