mod measure;
mod noise;
mod signal;

pub use measure::{PeakRecovery, measure_peak_recovery};
pub use noise::{
    AdditiveNoiseConfig, CosmicRayConfig, DriftConfig, NoiseConfig, apply_noise,
    generate_noisy_spectrum, signal_power,
};
pub use signal::{RamanLine, WavenumberGrid, generate_compound, generate_spectrum, lorentzian};
