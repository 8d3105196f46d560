use nalgebra::DVector;

use crate::config::BaselineConfig;
use crate::constants::COEFFICIENT_NORM_EPSILON;
use crate::error::{MatchError, Result};
use crate::spectrum::ensure_finite;

use super::math::{PolynomialFit, unit_abscissae};

/// Iterative polynomial baseline remover.
///
/// Fits a polynomial to the lower envelope of a trace: after each fit, any
/// sample above the fitted curve is pulled down onto it, so peak tops stop
/// influencing the next fit and the curve settles onto the background.
/// Iteration stops once the relative change in coefficients drops below
/// the tolerance or the iteration cap is reached.
#[derive(Debug, Clone)]
pub struct BaselineCorrector {
    degree: usize,
    max_iterations: usize,
    tolerance: f64,
}

impl BaselineCorrector {
    pub fn new(config: &BaselineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            degree: config.degree,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        })
    }

    /// Estimate the baseline of `y` without clamping.
    pub fn estimate(&self, y: &[f64]) -> Result<Vec<f64>> {
        if y.is_empty() {
            return Err(MatchError::InvalidInput(
                "cannot estimate the baseline of an empty trace".to_string(),
            ));
        }
        ensure_finite("y", y)?;
        // n samples determine at most a degree n-1 polynomial
        let degree = self.degree.min(y.len() - 1);
        if degree < self.degree {
            log::debug!(
                "Baseline degree lowered from {} to {} for {} samples",
                self.degree,
                degree,
                y.len()
            );
        }

        let x = unit_abscissae(y.len());
        let fit = PolynomialFit::new(&x, degree)?;

        let mut envelope = DVector::from_column_slice(y);
        let mut coeffs = DVector::from_element(degree + 1, 1.0);
        let mut base = envelope.clone();

        for iteration in 0..self.max_iterations {
            let next = fit.coefficients(&envelope);
            let change = (&next - &coeffs).norm();
            let scale = coeffs.norm();
            let converged = if scale < COEFFICIENT_NORM_EPSILON {
                change < COEFFICIENT_NORM_EPSILON
            } else {
                change / scale < self.tolerance
            };
            if converged {
                log::trace!("Baseline converged after {} iterations", iteration);
                break;
            }

            coeffs = next;
            base = fit.evaluate(&coeffs);
            envelope.zip_apply(&base, |e, b| *e = e.min(b));
        }

        if base.iter().any(|v| !v.is_finite()) {
            return Err(MatchError::Numeric(
                "baseline fit produced non-finite values".to_string(),
            ));
        }

        Ok(base.iter().copied().collect())
    }

    /// Subtract the baseline from `y`.
    ///
    /// Negative baseline values are clamped to zero before subtraction so a
    /// dipping fit never lifts the corrected trace above the raw data.
    pub fn subtract(&self, y: &[f64]) -> Result<Vec<f64>> {
        let base = self.estimate(y)?;
        Ok(y.iter()
            .zip(base.iter())
            .map(|(&value, &b)| value - b.max(0.0))
            .collect())
    }
}

impl Default for BaselineCorrector {
    fn default() -> Self {
        let config = BaselineConfig::default();
        Self {
            degree: config.degree,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }
}

/// Remove a polynomial baseline of the given degree from `y_data`.
pub fn subtract_baseline(
    y_data: &[f64],
    degree: usize,
    max_iterations: usize,
) -> Result<Vec<f64>> {
    let config = BaselineConfig {
        degree,
        max_iterations,
        ..BaselineConfig::default()
    };
    BaselineCorrector::new(&config)?.subtract(y_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_BASELINE_DEGREE;
    use approx::assert_abs_diff_eq;

    fn gaussian(x: f64, center: f64, width: f64, height: f64) -> f64 {
        height * (-0.5 * ((x - center) / width).powi(2)).exp()
    }

    #[test]
    fn test_flat_signal_removed() {
        let y = vec![5.0; 200];
        let out = subtract_baseline(&y, 3, 200).unwrap();
        assert_eq!(out.len(), y.len());
        for v in out {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_negative_baseline_clamped() {
        // A constant negative background must not be subtracted
        let y = vec![-2.0; 50];
        let out = subtract_baseline(&y, 3, 200).unwrap();
        for v in out {
            assert_abs_diff_eq!(v, -2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_sloped_background_with_peak() {
        let y: Vec<f64> = (0..500)
            .map(|i| {
                let x = i as f64;
                10.0 + 0.02 * x + gaussian(x, 250.0, 5.0, 50.0)
            })
            .collect();
        let out = subtract_baseline(&y, 3, 200).unwrap();

        // Background far from the peak is mostly removed
        assert!(out[20].abs() < 2.0, "residual background {}", out[20]);
        assert!(out[480].abs() < 2.0, "residual background {}", out[480]);
        // Peak survives with most of its height
        assert!(out[250] > 40.0, "peak height {}", out[250]);
    }

    #[test]
    fn test_baseline_stays_below_peaks() {
        let y: Vec<f64> = (0..300)
            .map(|i| {
                let x = i as f64;
                5.0 + gaussian(x, 100.0, 4.0, 30.0) + gaussian(x, 200.0, 4.0, 20.0)
            })
            .collect();
        let base = BaselineCorrector::default().estimate(&y).unwrap();
        assert!(base[100] < 15.0);
        assert!(base[200] < 15.0);
    }

    #[test]
    fn test_input_not_mutated() {
        let y = vec![1.0, 3.0, 2.0, 5.0, 1.0];
        let copy = y.clone();
        let _ = subtract_baseline(&y, 3, 200).unwrap();
        assert_eq!(y, copy);
    }

    #[test]
    fn test_single_sample() {
        let out = subtract_baseline(&[4.0], 3, 200).unwrap();
        assert_eq!(out.len(), 1);
        assert_abs_diff_eq!(out[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(matches!(
            subtract_baseline(&[], 3, 200),
            Err(MatchError::InvalidInput(_))
        ));
        assert!(matches!(
            subtract_baseline(&[1.0, f64::INFINITY], 3, 200),
            Err(MatchError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_degree_capped() {
        let config = BaselineConfig {
            degree: MAX_BASELINE_DEGREE + 1,
            ..BaselineConfig::default()
        };
        assert!(matches!(
            BaselineCorrector::new(&config),
            Err(MatchError::Config(_))
        ));
    }

    #[test]
    fn test_degree_limited_by_sample_count() {
        // Degree 10 on three samples fits the quadratic through them exactly
        let out = subtract_baseline(&[1.0, 4.0, 9.0], 10, 200).unwrap();
        for v in out {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_rejects_zero_iterations() {
        assert!(subtract_baseline(&[1.0, 2.0], 3, 0).is_err());
    }
}
