use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use ramanmatch::MatchEngine;
use ramanmatch::config::{EmptyPeakPolicy, MatchConfig, Prominence, Tolerance};
use ramanmatch::library::{load_library, load_spectrum};
use ramanmatch::output::{OutputFormat, create_formatter};

#[derive(Parser, Debug)]
#[command(name = "ramanmatch")]
#[command(about = "Identify reference compounds in a Raman spectrum by peak matching")]
#[command(long_about = None)]
struct Args {
    /// Unknown spectrum (.json or .csv)
    unknown: PathBuf,

    /// Reference library files (.json or .csv)
    #[arg(short = 'l', long = "library", required = true, num_args = 1..)]
    library: Vec<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Minimum peak height after baseline correction
    #[arg(long)]
    height: Option<f64>,

    /// Minimum separation between peaks, in samples
    #[arg(long)]
    distance: Option<usize>,

    /// Minimum peak prominence ("auto" or a number)
    #[arg(long)]
    prominence: Option<Prominence>,

    /// Relative tolerance for matching peak positions (e.g. 0.03)
    #[arg(long, conflicts_with = "abs_tolerance")]
    precision: Option<f64>,

    /// Absolute tolerance for matching peak positions, in cm-1
    #[arg(long)]
    abs_tolerance: Option<f64>,

    /// Worker threads (capped to available cores)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Handling of reference compounds with no detected peaks
    #[arg(long, value_enum)]
    empty_peaks: Option<EmptyPeakPolicy>,

    /// Confidence fraction (0-1) at which a compound is reported present
    #[arg(long)]
    criterion: Option<f64>,

    /// Skip baseline removal
    #[arg(long)]
    no_baseline: bool,

    /// Also report pseudo-Voigt profile fits of every detected peak
    #[arg(long)]
    fit: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = build_config(&args)?;

    let unknown = load_spectrum(&args.unknown)
        .with_context(|| format!("loading unknown spectrum {}", args.unknown.display()))?;
    let library = load_library(&args.library).context("loading reference library")?;
    log::info!(
        "Loaded unknown spectrum ({} points) and {} reference compounds",
        unknown.len(),
        library.len()
    );

    let engine = MatchEngine::new(&config)?;
    let report = engine
        .assign_and_score(&unknown, &library)
        .context("matching failed")?;

    let formatter = create_formatter(
        args.format,
        args.verbose > 0,
        config.scoring.presence_criterion,
    );
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }
    println!("{}", formatter.format(&report));

    if args.fit {
        let unknown_fit = engine
            .fit_report(&unknown)
            .context("fitting unknown peaks")?;
        let library_fits = engine
            .compound_reports(&library)
            .context("fitting reference peaks")?;

        let mut fits = vec![("unknown", &unknown_fit)];
        fits.extend(
            library
                .iter()
                .map(|c| c.title())
                .zip(library_fits.iter()),
        );
        println!();
        println!("{}", formatter.format_fits(&fits));
    }

    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<MatchConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            MatchConfig::from_toml_str(&content)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => MatchConfig::default(),
    };

    if let Some(height) = args.height {
        config.detection.height = height;
    }
    if let Some(distance) = args.distance {
        config.detection.distance = distance;
    }
    if let Some(prominence) = args.prominence {
        config.detection.prominence = prominence;
    }
    if let Some(precision) = args.precision {
        config.comparison.tolerance = Tolerance::Relative(precision);
    }
    if let Some(abs_tolerance) = args.abs_tolerance {
        config.comparison.tolerance = Tolerance::Absolute(abs_tolerance);
    }
    if let Some(workers) = args.workers {
        config.dispatch.max_workers = workers;
    }
    if let Some(policy) = args.empty_peaks {
        config.scoring.empty_peaks = policy;
    }
    if let Some(criterion) = args.criterion {
        config.scoring.presence_criterion = criterion;
    }
    if args.no_baseline {
        config.baseline.enabled = false;
    }

    config.validate()?;
    Ok(config)
}
