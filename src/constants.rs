//! Numeric constants and defaults shared across the matching pipeline
//!
//! Defaults mirror the parameters reference libraries were tuned against;
//! epsilons guard the numeric routines against degenerate inputs.

/// Default minimum peak height after baseline correction.
pub const DEFAULT_HEIGHT: f64 = 0.1;

/// Default minimum separation between retained peaks, in samples.
pub const DEFAULT_DISTANCE: usize = 10;

/// Default relative tolerance for peak position comparison (3%).
pub const DEFAULT_PRECISION: f64 = 0.03;

/// Default polynomial degree of the baseline estimate.
pub const DEFAULT_BASELINE_DEGREE: usize = 3;

/// Highest accepted baseline degree; higher orders start fitting peaks.
pub const MAX_BASELINE_DEGREE: usize = 20;

/// Default iteration cap for the baseline fit.
pub const DEFAULT_BASELINE_MAX_ITERATIONS: usize = 200;

/// Relative coefficient change below which the baseline fit is converged.
pub const DEFAULT_BASELINE_TOLERANCE: f64 = 1e-3;

/// Iteration cap for the pseudo-Voigt least-squares fit.
pub const DEFAULT_FIT_MAX_ITERATIONS: usize = 200;

/// Upper bound on a fitted profile's half width; broader fits are not Raman bands.
pub const DEFAULT_FIT_SIGMA_MAX: f64 = 500.0;

/// Lower bound on a fitted profile's half width.
pub const FIT_SIGMA_MIN: f64 = 1e-3;

/// Relative cost decrease below which the profile fit is converged.
pub const FIT_TOLERANCE: f64 = 1e-10;

/// Default presence criterion applied to confidence fractions.
pub const DEFAULT_PRESENCE_CRITERION: f64 = 0.99;

/// Label given to unknown peaks that no known compound explains.
pub const UNASSIGNED_LABEL: &str = "Unassigned";

/// Singular values below this are treated as zero in the pseudo-inverse.
pub const PSEUDO_INVERSE_EPSILON: f64 = 1e-12;

/// Norm below which a coefficient vector is treated as zero.
pub const COEFFICIENT_NORM_EPSILON: f64 = 1e-15;

/// Pairs further apart than this (in wavenumbers) are never scored by the
/// reciprocal-distance similarity.
pub const SIMILARITY_MAX_SEPARATION: f64 = 50.0;

/// Reciprocal-distance scores at or below this are discarded.
pub const SIMILARITY_MIN_SCORE: f64 = 0.02;
