use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{MatchError, Result};
use crate::spectrum::Spectrum;

use super::signal::{RamanLine, WavenumberGrid, generate_spectrum};

/// Degradations applied to a clean synthetic spectrum, in the order
/// drift, cosmic rays, additive noise.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub additive: Option<AdditiveNoiseConfig>,
    pub drift: Option<DriftConfig>,
    pub cosmic_rays: Option<CosmicRayConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_awgn(mut self, snr_db: f64) -> Self {
        self.additive = Some(AdditiveNoiseConfig { snr_db });
        self
    }

    pub fn with_drift(mut self, coefficients: Vec<f64>) -> Self {
        self.drift = Some(DriftConfig { coefficients });
        self
    }

    pub fn with_cosmic_rays(mut self, count: usize, amplitude: f64) -> Self {
        self.cosmic_rays = Some(CosmicRayConfig { count, amplitude });
        self
    }
}

/// White Gaussian noise at a signal-to-noise ratio
#[derive(Clone, Debug, serde::Deserialize)]
pub struct AdditiveNoiseConfig {
    pub snr_db: f64,
}

/// Fluorescence-like background: a polynomial in wavenumber normalised to
/// `[0, 1]` over the spectrum, lowest order first
#[derive(Clone, Debug, serde::Deserialize)]
pub struct DriftConfig {
    pub coefficients: Vec<f64>,
}

/// Single-sample spikes at random positions
#[derive(Clone, Debug, serde::Deserialize)]
pub struct CosmicRayConfig {
    pub count: usize,
    pub amplitude: f64,
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

pub fn signal_power(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&v| v * v).sum::<f64>() / signal.len() as f64
}

fn apply_additive_noise(
    signal: &mut [f64],
    config: &AdditiveNoiseConfig,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let sig_power = signal_power(signal);
    if sig_power == 0.0 {
        return Ok(());
    }

    let snr_linear = 10.0_f64.powf(config.snr_db / 10.0);
    let noise_std = (sig_power / snr_linear).sqrt();
    let normal = Normal::new(0.0, noise_std)
        .map_err(|e| MatchError::Config(format!("noise at {} dB SNR: {}", config.snr_db, e)))?;

    for sample in signal.iter_mut() {
        *sample += normal.sample(rng);
    }
    Ok(())
}

fn apply_drift(signal: &mut [f64], x: &[f64], config: &DriftConfig) {
    let (lo, hi) = match (x.first(), x.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        _ => return,
    };

    for (sample, &w) in signal.iter_mut().zip(x) {
        let t = (w - lo) / (hi - lo);
        // Horner
        *sample += config
            .coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c);
    }
}

fn apply_cosmic_rays(signal: &mut [f64], config: &CosmicRayConfig, rng: &mut ChaCha8Rng) {
    if signal.is_empty() {
        return;
    }
    for _ in 0..config.count {
        let pos = rng.random_range(0..signal.len());
        signal[pos] += config.amplitude;
    }
}

pub fn apply_noise(clean: &Spectrum, config: &NoiseConfig) -> Result<Spectrum> {
    let mut signal = clean.y().to_vec();
    let mut rng = create_rng(config.seed);

    if let Some(ref drift_config) = config.drift {
        apply_drift(&mut signal, clean.x(), drift_config);
    }

    if let Some(ref cosmic_config) = config.cosmic_rays {
        apply_cosmic_rays(&mut signal, cosmic_config, &mut rng);
    }

    if let Some(ref additive_config) = config.additive {
        apply_additive_noise(&mut signal, additive_config, &mut rng)?;
    }

    Spectrum::new(clean.x().to_vec(), signal)
}

pub fn generate_noisy_spectrum(
    grid: &WavenumberGrid,
    lines: &[RamanLine],
    noise_config: &NoiseConfig,
) -> Result<Spectrum> {
    let clean = generate_spectrum(grid, lines)?;
    apply_noise(&clean, noise_config)
}
