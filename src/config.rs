//! Configuration for the Raman peak matching engine.
//!
//! ## Loading from TOML
//!
//! Every section implements `Default` and deserializes with
//! `#[serde(default)]`, so a TOML file only needs the fields it changes:
//!
//! ```toml
//! [detection]
//! height = 0.2
//! prominence = "auto"
//!
//! [comparison]
//! tolerance = { relative = 0.02 }
//!
//! [scoring]
//! empty_peaks = "zero"
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::constants::{
    DEFAULT_BASELINE_DEGREE, DEFAULT_BASELINE_MAX_ITERATIONS, DEFAULT_BASELINE_TOLERANCE,
    DEFAULT_DISTANCE, DEFAULT_FIT_MAX_ITERATIONS, DEFAULT_FIT_SIGMA_MAX, DEFAULT_HEIGHT,
    DEFAULT_PRECISION, DEFAULT_PRESENCE_CRITERION, FIT_SIGMA_MIN, MAX_BASELINE_DEGREE,
};
use crate::error::{MatchError, Result};

/// Minimum prominence for peak detection
///
/// `Auto` uses the mean of the trace being searched, a data-adaptive floor:
/// flatter or noisier spectra get a higher implicit bar.
///
/// # Parsing formats
/// - `auto` - mean of the intensity trace
/// - `12.5` - fixed prominence in intensity units
///
/// # Example
/// ```
/// use ramanmatch::config::Prominence;
///
/// let p: Prominence = "auto".parse().unwrap();
/// assert_eq!(p, Prominence::Auto);
/// assert_eq!(p.resolve(&[1.0, 2.0, 3.0]), 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Prominence {
    #[default]
    Auto,
    Fixed(f64),
}

impl Prominence {
    /// Resolve to a concrete threshold for the given trace.
    pub fn resolve(&self, y: &[f64]) -> f64 {
        match *self {
            Prominence::Auto => crate::signal_processing::math::mean(y),
            Prominence::Fixed(value) => value,
        }
    }
}

impl fmt::Display for Prominence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prominence::Auto => write!(f, "auto"),
            Prominence::Fixed(v) => write!(f, "{}", v),
        }
    }
}

impl FromStr for Prominence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Prominence::Auto);
        }
        let value: f64 = s
            .parse()
            .map_err(|_| format!("invalid prominence: {}", s))?;
        if !value.is_finite() || value < 0.0 {
            return Err("prominence must be a non-negative number".to_string());
        }
        Ok(Prominence::Fixed(value))
    }
}

impl<'de> Deserialize<'de> for Prominence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(Prominence::Fixed(v)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// How close two peak positions must be to count as the same peak
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    /// `|a - b| <= precision * max(|a|, |b|)`
    Relative(f64),
    /// `|a - b| <= tolerance`, in wavenumber units
    Absolute(f64),
}

impl Tolerance {
    pub fn validate(&self) -> Result<()> {
        let value = match *self {
            Tolerance::Relative(v) | Tolerance::Absolute(v) => v,
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(MatchError::InvalidInput(format!(
                "tolerance must be a positive number, got {}",
                value
            )));
        }
        Ok(())
    }

    /// Whether `a` and `b` coincide under this tolerance.
    pub fn is_close(&self, a: f64, b: f64) -> bool {
        let diff = (a - b).abs();
        match *self {
            Tolerance::Relative(precision) => diff <= precision * a.abs().max(b.abs()),
            Tolerance::Absolute(tolerance) => diff <= tolerance,
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Relative(DEFAULT_PRECISION)
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tolerance::Relative(p) => write!(f, "{:.1}%", p * 100.0),
            Tolerance::Absolute(t) => write!(f, "±{} cm⁻¹", t),
        }
    }
}

/// What to do with a compound whose own peak list is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPeakPolicy {
    /// Fail the whole run with `DivisionUndefined`
    #[default]
    Fail,
    /// Report the compound at 0% confidence
    Zero,
    /// Leave the compound out of the confidence scores
    Skip,
}

/// System-wide matching configuration
///
/// Use `MatchConfig::default()` for the reference defaults
/// (height 0.1, distance 10, 3% relative precision).
///
/// # Example
/// ```
/// use ramanmatch::config::MatchConfig;
///
/// let mut config = MatchConfig::default();
/// config.detection.height = 0.5;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Baseline removal applied before peak search
    pub baseline: BaselineConfig,
    /// Peak search constraints
    pub detection: DetectionConfig,
    /// Peak position comparison
    pub comparison: ComparisonConfig,
    /// Confidence scoring
    pub scoring: ScoringConfig,
    /// Worker pool sizing
    pub dispatch: DispatchConfig,
    /// Peak profile fitting for fit reports
    pub fit: FitConfig,
}

impl MatchConfig {
    /// Load a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MatchConfig =
            toml::from_str(content).map_err(|e| MatchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.baseline.validate()?;
        self.detection.validate()?;
        self.comparison.tolerance.validate()?;
        self.scoring.validate()?;
        self.dispatch.validate()?;
        self.fit.validate()
    }
}

/// Iterative polynomial baseline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Subtract a baseline before searching for peaks
    pub enabled: bool,
    /// Polynomial degree of the baseline
    pub degree: usize,
    /// Iteration cap for the envelope fit
    pub max_iterations: usize,
    /// Relative coefficient change that counts as converged
    pub tolerance: f64,
}

impl BaselineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.degree > MAX_BASELINE_DEGREE {
            return Err(MatchError::Config(format!(
                "baseline degree {} exceeds the maximum of {}",
                self.degree, MAX_BASELINE_DEGREE
            )));
        }
        if self.max_iterations == 0 {
            return Err(MatchError::Config(
                "baseline max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(MatchError::Config(
                "baseline tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            degree: DEFAULT_BASELINE_DEGREE,
            max_iterations: DEFAULT_BASELINE_MAX_ITERATIONS,
            tolerance: DEFAULT_BASELINE_TOLERANCE,
        }
    }
}

/// Peak search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum peak height
    pub height: f64,
    /// Minimum index separation between retained peaks
    pub distance: usize,
    /// Minimum topographic prominence
    pub prominence: Prominence,
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.height.is_finite() {
            return Err(MatchError::InvalidInput(
                "peak height must be a finite number".to_string(),
            ));
        }
        if self.distance == 0 {
            return Err(MatchError::InvalidInput(
                "peak distance must be at least 1".to_string(),
            ));
        }
        match self.prominence {
            Prominence::Fixed(p) if !p.is_finite() || p < 0.0 => Err(MatchError::InvalidInput(
                "prominence must be a non-negative number".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            distance: DEFAULT_DISTANCE,
            prominence: Prominence::Auto,
        }
    }
}

/// Peak comparison configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub tolerance: Tolerance,
}

/// Confidence scoring configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Handling of compounds with no detected peaks
    pub empty_peaks: EmptyPeakPolicy,
    /// Minimum confidence fraction (0-1) for a compound to be reported present
    pub presence_criterion: f64,
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.presence_criterion) {
            return Err(MatchError::Config(format!(
                "presence criterion must be within 0-1, got {}",
                self.presence_criterion
            )));
        }
        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            empty_peaks: EmptyPeakPolicy::Fail,
            presence_criterion: DEFAULT_PRESENCE_CRITERION,
        }
    }
}

/// Pseudo-Voigt profile fit configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Levenberg-Marquardt iteration cap
    pub max_iterations: usize,
    /// Upper bound on each profile's half width
    pub sigma_max: f64,
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(MatchError::Config(
                "fit max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.sigma_max.is_finite() || self.sigma_max <= FIT_SIGMA_MIN {
            return Err(MatchError::Config(format!(
                "fit sigma_max must exceed {}, got {}",
                FIT_SIGMA_MIN, self.sigma_max
            )));
        }
        Ok(())
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_FIT_MAX_ITERATIONS,
            sigma_max: DEFAULT_FIT_SIGMA_MAX,
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Requested worker threads (capped to available cores)
    pub max_workers: usize,
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(MatchError::Config(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_workers: available_cores(),
        }
    }
}

/// Number of cores available to this process, at least 1.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prominence_parse_auto() {
        assert_eq!("auto".parse::<Prominence>().unwrap(), Prominence::Auto);
        assert_eq!("AUTO".parse::<Prominence>().unwrap(), Prominence::Auto);
    }

    #[test]
    fn test_prominence_parse_fixed() {
        assert_eq!(
            "12.5".parse::<Prominence>().unwrap(),
            Prominence::Fixed(12.5)
        );
    }

    #[test]
    fn test_prominence_parse_invalid() {
        assert!("abc".parse::<Prominence>().is_err());
        assert!("-1".parse::<Prominence>().is_err());
        assert!("NaN".parse::<Prominence>().is_err());
    }

    #[test]
    fn test_prominence_auto_is_mean() {
        assert_eq!(Prominence::Auto.resolve(&[0.0, 4.0, 8.0]), 4.0);
        assert_eq!(Prominence::Fixed(3.0).resolve(&[0.0, 4.0, 8.0]), 3.0);
    }

    #[test]
    fn test_relative_tolerance() {
        let tol = Tolerance::Relative(0.03);
        assert!(tol.is_close(500.0, 502.0));
        assert!(!tol.is_close(1000.0, 1498.0));
        assert!(tol.is_close(0.0, 0.0));
    }

    #[test]
    fn test_absolute_tolerance() {
        let tol = Tolerance::Absolute(5.0);
        assert!(tol.is_close(1000.0, 1005.0));
        assert!(!tol.is_close(1000.0, 1005.5));
    }

    #[test]
    fn test_tolerance_validate() {
        assert!(Tolerance::Relative(0.0).validate().is_err());
        assert!(Tolerance::Relative(-0.1).validate().is_err());
        assert!(Tolerance::Absolute(f64::INFINITY).validate().is_err());
        assert!(Tolerance::default().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.detection.height, 0.1);
        assert_eq!(config.detection.distance, 10);
        assert_eq!(config.comparison.tolerance, Tolerance::Relative(0.03));
        assert_eq!(config.baseline.degree, 3);
        assert_eq!(config.baseline.max_iterations, 200);
        assert_eq!(config.scoring.empty_peaks, EmptyPeakPolicy::Fail);
        assert!(config.dispatch.max_workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = MatchConfig::from_toml_str(
            r#"
            [detection]
            height = 0.5
            prominence = 2.0

            [comparison]
            tolerance = { absolute = 4.0 }

            [scoring]
            empty_peaks = "skip"
            "#,
        )
        .unwrap();
        assert_eq!(config.detection.height, 0.5);
        assert_eq!(config.detection.distance, 10);
        assert_eq!(config.detection.prominence, Prominence::Fixed(2.0));
        assert_eq!(config.comparison.tolerance, Tolerance::Absolute(4.0));
        assert_eq!(config.scoring.empty_peaks, EmptyPeakPolicy::Skip);
    }

    #[test]
    fn test_from_toml_prominence_auto_string() {
        let config = MatchConfig::from_toml_str("[detection]\nprominence = \"auto\"\n").unwrap();
        assert_eq!(config.detection.prominence, Prominence::Auto);
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        assert!(MatchConfig::from_toml_str("[dispatch]\nmax_workers = 0\n").is_err());
        assert!(MatchConfig::from_toml_str("[detection]\ndistance = 0\n").is_err());
        assert!(MatchConfig::from_toml_str("[scoring]\npresence_criterion = 1.5\n").is_err());
        assert!(MatchConfig::from_toml_str("[baseline]\ndegree = 1000000\n").is_err());
        assert!(MatchConfig::from_toml_str("[fit]\nsigma_max = 0.0\n").is_err());
    }
}
