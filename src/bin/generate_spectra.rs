use anyhow::{Context, Result};
use clap::Parser;
use ramanmatch::KnownCompound;
use ramanmatch::config::BaselineConfig;
use ramanmatch::library::write_json;
use ramanmatch::mixture::combine_spectra;
use ramanmatch::signal_processing::BaselineCorrector;
use ramanmatch::simulation::{
    AdditiveNoiseConfig, NoiseConfig, RamanLine, WavenumberGrid, apply_noise, generate_spectrum,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_spectra")]
#[command(about = "Generate synthetic Raman reference libraries and mixtures for matching tests")]
struct Args {
    /// TOML configuration file (grid, noise, compounds)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Compounds mixed into the unknown: comma-separated titles
    #[arg(short, long, default_value = "ETHANOL,TOLUENE")]
    mix: String,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// AWGN SNR in dB (CLI override)
    #[arg(long)]
    snr: Option<f64>,

    /// Output filename prefix
    #[arg(long, default_value = "synth")]
    prefix: String,
}

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    grid: Option<WavenumberGrid>,
    noise: Option<NoiseConfig>,
    #[serde(default, rename = "compound")]
    compounds: Vec<CompoundSection>,
}

#[derive(Debug, Deserialize)]
struct CompoundSection {
    title: String,
    lines: Vec<RamanLine>,
}

/// Approximate band positions of common solvents
fn builtin_compounds() -> Vec<CompoundSection> {
    let section = |title: &str, bands: &[(f64, f64, f64)]| CompoundSection {
        title: title.to_string(),
        lines: bands
            .iter()
            .map(|&(center, fwhm, height)| RamanLine::new(center, fwhm, height))
            .collect(),
    };
    vec![
        section("WATER", &[(1640.0, 60.0, 0.4), (3250.0, 120.0, 1.0)]),
        section(
            "ETHANOL",
            &[
                (882.0, 12.0, 1.0),
                (1050.0, 14.0, 0.5),
                (1455.0, 16.0, 0.6),
                (2930.0, 20.0, 1.4),
            ],
        ),
        section(
            "TOLUENE",
            &[
                (786.0, 8.0, 0.7),
                (1003.0, 6.0, 1.5),
                (1210.0, 10.0, 0.5),
                (1604.0, 10.0, 0.4),
                (3057.0, 14.0, 0.9),
            ],
        ),
        section(
            "CYCLOHEXANE",
            &[
                (802.0, 8.0, 1.6),
                (1028.0, 8.0, 0.6),
                (1266.0, 10.0, 0.5),
                (1444.0, 12.0, 0.7),
                (2853.0, 16.0, 1.2),
            ],
        ),
    ]
}

fn parse_titles(s: &str) -> Result<Vec<String>> {
    let titles: Vec<String> = s
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if titles.is_empty() {
        anyhow::bail!("No compound titles given in '{}'", s);
    }
    Ok(titles)
}

fn load_toml_config(path: &PathBuf) -> Result<TomlConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn build_noise_config(toml: &TomlConfig, args: &Args, seed: u64) -> NoiseConfig {
    let mut config = toml.noise.clone().unwrap_or_default().with_seed(seed);
    if let Some(snr) = args.snr {
        config.additive = Some(AdditiveNoiseConfig { snr_db: snr });
    }
    config
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init();

    fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let mut toml_config = if let Some(ref config_path) = args.config {
        load_toml_config(config_path)?
    } else {
        TomlConfig::default()
    };
    if toml_config.compounds.is_empty() {
        toml_config.compounds = builtin_compounds();
    }

    let grid = toml_config.grid.unwrap_or_default();
    let base_seed = args.seed.or(toml_config.noise.as_ref().and_then(|n| n.seed)).unwrap_or(0);
    let mix = parse_titles(&args.mix)?;

    let mut library = Vec::with_capacity(toml_config.compounds.len());
    for (i, section) in toml_config.compounds.iter().enumerate() {
        let clean = generate_spectrum(&grid, &section.lines)
            .with_context(|| format!("Failed to generate '{}'", section.title))?;
        let noise = build_noise_config(&toml_config, &args, base_seed + i as u64);
        let noisy = apply_noise(&clean, &noise)?;
        library.push(KnownCompound::new(section.title.clone(), noisy)?);
    }

    let corrector = BaselineCorrector::new(&BaselineConfig::default())?;
    let mut components = mix.iter().map(|title| {
        toml_config
            .compounds
            .iter()
            .find(|c| &c.title == title)
            .with_context(|| format!("Unknown compound '{}' in mixture", title))
            .and_then(|c| generate_spectrum(&grid, &c.lines).map_err(Into::into))
    });
    let mut unknown = components
        .next()
        .context("Mixture needs at least one compound")??;
    for component in components {
        unknown = combine_spectra(&unknown, &component?, &corrector)?;
    }
    let noise = build_noise_config(&toml_config, &args, base_seed + 1000);
    let unknown = KnownCompound::new(mix.join("+"), apply_noise(&unknown, &noise)?)?;

    let library_path = args.output_dir.join(format!("{}_library.json", args.prefix));
    write_json(&library_path, &library).context("Failed to write library")?;
    let unknown_path = args.output_dir.join(format!("{}_unknown.json", args.prefix));
    write_json(&unknown_path, std::slice::from_ref(&unknown)).context("Failed to write unknown")?;

    eprintln!(
        "Wrote {} reference spectra to {} and the {} mixture to {}",
        library.len(),
        library_path.display(),
        unknown.title(),
        unknown_path.display()
    );
    Ok(())
}
