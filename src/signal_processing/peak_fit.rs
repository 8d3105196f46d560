//! Pseudo-Voigt peak profile fitting.
//!
//! Every detected peak gets one pseudo-Voigt component, a weighted sum of a
//! Gaussian and a Lorentzian sharing the same full width at half maximum:
//!
//! ```text
//! f(x) = A * ((1 - a) * G(x; c, s / sqrt(2 ln 2)) + a * L(x; c, s))
//! ```
//!
//! where `G` and `L` are unit-area profiles, `c` is the centre, `s` the half
//! width at half maximum and `a` the Lorentzian fraction. Centres stay fixed
//! at the detected positions; amplitude, width and fraction are refined by a
//! bounded Levenberg-Marquardt least-squares fit of the composite model.

use std::f64::consts::{LN_2, PI};

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::config::FitConfig;
use crate::constants::{FIT_SIGMA_MIN, FIT_TOLERANCE};
use crate::error::{MatchError, Result};
use crate::spectrum::{Peak, ensure_finite};

const PARAMS_PER_PEAK: usize = 3;
const INITIAL_FRACTION: f64 = 0.5;
const INITIAL_LAMBDA: f64 = 1e-3;
const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e12;
const DAMPING_FLOOR: f64 = 1e-12;

/// Fitted profile of one peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakFit {
    /// Fixed at the detected position
    pub center: f64,
    /// Half width at half maximum
    pub sigma: f64,
    /// Integrated area
    pub amplitude: f64,
    pub fwhm: f64,
    pub height: f64,
    /// Lorentzian share of the profile, 0 (Gaussian) to 1 (Lorentzian)
    pub fraction: f64,
}

/// Profile fit of every peak in one spectrum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub peaks: Vec<PeakFit>,
    /// Lowest wavenumber in the fitted spectrum
    pub xmin: f64,
    /// Highest wavenumber in the fitted spectrum
    pub xmax: f64,
    pub iterations: usize,
    /// Root-mean-square residual of the composite model
    pub rms_residual: f64,
    pub converged: bool,
}

impl FitReport {
    pub fn centers(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.center).collect()
    }

    pub fn sigmas(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.sigma).collect()
    }

    pub fn amplitudes(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.amplitude).collect()
    }
}

/// Unit-area Gaussian and Lorentzian values at offset `d`, with their
/// derivatives with respect to the shared half width.
fn components(d: f64, sigma: f64) -> [f64; 4] {
    let scale = (2.0 * LN_2).sqrt();
    let sigma_g = sigma / scale;
    let gaussian = (-d * d / (2.0 * sigma_g * sigma_g)).exp() / (sigma_g * (2.0 * PI).sqrt());
    let denom = d * d + sigma * sigma;
    let lorentzian = sigma / (PI * denom);

    let d_gaussian = gaussian * (d * d / sigma_g.powi(3) - 1.0 / sigma_g) / scale;
    let d_lorentzian = (d * d - sigma * sigma) / (PI * denom * denom);
    [gaussian, lorentzian, d_gaussian, d_lorentzian]
}

/// Pseudo-Voigt profile value at `x`.
pub fn pseudo_voigt(x: f64, center: f64, sigma: f64, amplitude: f64, fraction: f64) -> f64 {
    let [g, l, _, _] = components(x - center, sigma);
    amplitude * ((1.0 - fraction) * g + fraction * l)
}

/// Peak height of a pseudo-Voigt profile.
pub fn pseudo_voigt_height(sigma: f64, amplitude: f64, fraction: f64) -> f64 {
    let sigma_g = sigma / (2.0 * LN_2).sqrt();
    amplitude * ((1.0 - fraction) / (sigma_g * (2.0 * PI).sqrt()) + fraction / (PI * sigma))
}

pub struct PeakFitter {
    max_iterations: usize,
    sigma_max: f64,
}

impl PeakFitter {
    pub fn new(config: &FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            max_iterations: config.max_iterations,
            sigma_max: config.sigma_max,
        })
    }

    /// Fit one pseudo-Voigt component per peak to a baseline-corrected trace.
    ///
    /// Peak heights seed the amplitudes; initial widths come from the half
    /// maximum crossings around each peak.
    pub fn fit(&self, x: &[f64], y: &[f64], peaks: &[Peak]) -> Result<FitReport> {
        if x.is_empty() || x.len() != y.len() {
            return Err(MatchError::InvalidInput(format!(
                "cannot fit {} x values against {} y values",
                x.len(),
                y.len()
            )));
        }
        ensure_finite("x", x)?;
        ensure_finite("y", y)?;

        let xmin = x.iter().copied().fold(f64::INFINITY, f64::min);
        let xmax = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if let Some(p) = peaks
            .iter()
            .find(|p| !(xmin..=xmax).contains(&p.position))
        {
            return Err(MatchError::InvalidInput(format!(
                "peak at {} lies outside the spectrum range {}..{}",
                p.position, xmin, xmax
            )));
        }

        let centers: Vec<f64> = peaks.iter().map(|p| p.position).collect();
        let mut params = DVector::from_vec(
            peaks
                .iter()
                .flat_map(|p| self.initial_guess(x, y, p))
                .collect(),
        );
        let mut residual = residuals(x, y, &centers, &params);
        let mut cost = residual.norm_squared();

        let mut lambda = INITIAL_LAMBDA;
        let mut iterations = 0;
        let mut converged = peaks.is_empty();
        while !converged && iterations < self.max_iterations {
            iterations += 1;
            let jacobian = jacobian(x, &centers, &params);
            let normal = jacobian.transpose() * &jacobian;
            let gradient = jacobian.transpose() * &residual;

            let mut improved = false;
            while lambda <= MAX_LAMBDA {
                let mut damped = normal.clone();
                for i in 0..damped.nrows() {
                    damped[(i, i)] += lambda * normal[(i, i)].max(DAMPING_FLOOR);
                }
                let Some(step) = damped.cholesky().map(|c| c.solve(&gradient)) else {
                    lambda *= 10.0;
                    continue;
                };

                let candidate = self.project(&params + step);
                let candidate_residual = residuals(x, y, &centers, &candidate);
                let candidate_cost = candidate_residual.norm_squared();
                if candidate_cost.is_finite() && candidate_cost <= cost {
                    let decrease = cost - candidate_cost;
                    converged = decrease <= FIT_TOLERANCE * cost.max(f64::MIN_POSITIVE);
                    params = candidate;
                    residual = candidate_residual;
                    cost = candidate_cost;
                    lambda = (lambda / 10.0).max(MIN_LAMBDA);
                    improved = true;
                    break;
                }
                lambda *= 10.0;
            }

            if !improved {
                // No damped step lowers the cost: a (bounded) minimum
                converged = true;
            }
        }

        if params.iter().any(|v| !v.is_finite()) {
            return Err(MatchError::Numeric(
                "peak profile fit produced non-finite parameters".to_string(),
            ));
        }
        if !converged {
            log::warn!(
                "Peak profile fit stopped after {} iterations without converging",
                iterations
            );
        }

        let fits: Vec<PeakFit> = centers
            .iter()
            .zip(params.as_slice().chunks_exact(PARAMS_PER_PEAK))
            .map(|(&center, p)| {
                let (amplitude, sigma, fraction) = (p[0], p[1], p[2]);
                PeakFit {
                    center,
                    sigma,
                    amplitude,
                    fwhm: 2.0 * sigma,
                    height: pseudo_voigt_height(sigma, amplitude, fraction),
                    fraction,
                }
            })
            .collect();

        log::debug!(
            "Fitted {} peak profiles in {} iterations (rms residual {:.4e})",
            fits.len(),
            iterations,
            (cost / x.len() as f64).sqrt()
        );

        Ok(FitReport {
            peaks: fits,
            xmin,
            xmax,
            iterations,
            rms_residual: (cost / x.len() as f64).sqrt(),
            converged,
        })
    }

    /// `[amplitude, sigma, fraction]` starting point for one peak
    fn initial_guess(&self, x: &[f64], y: &[f64], peak: &Peak) -> [f64; PARAMS_PER_PEAK] {
        let index = nearest_index(x, peak.position);
        let top = y[index];
        let half = top / 2.0;

        let mut left = index;
        while left > 0 && y[left] > half {
            left -= 1;
        }
        let mut right = index;
        while right + 1 < y.len() && y[right] > half {
            right += 1;
        }

        let sigma = ((x[right] - x[left]).abs() / 2.0).clamp(FIT_SIGMA_MIN, self.sigma_max);
        let height = peak.height.abs().max(top.abs()).max(f64::MIN_POSITIVE);
        let amplitude = height / pseudo_voigt_height(sigma, 1.0, INITIAL_FRACTION);
        [amplitude, sigma, INITIAL_FRACTION]
    }

    fn project(&self, mut params: DVector<f64>) -> DVector<f64> {
        for p in params.as_mut_slice().chunks_exact_mut(PARAMS_PER_PEAK) {
            p[0] = p[0].max(0.0);
            p[1] = p[1].clamp(FIT_SIGMA_MIN, self.sigma_max);
            p[2] = p[2].clamp(0.0, 1.0);
        }
        params
    }
}

impl Default for PeakFitter {
    fn default() -> Self {
        let config = FitConfig::default();
        Self {
            max_iterations: config.max_iterations,
            sigma_max: config.sigma_max,
        }
    }
}

fn nearest_index(x: &[f64], position: f64) -> usize {
    x.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - position).abs().total_cmp(&(*b - position).abs()))
        .map_or(0, |(i, _)| i)
}

fn model(x: f64, centers: &[f64], params: &DVector<f64>) -> f64 {
    centers
        .iter()
        .zip(params.as_slice().chunks_exact(PARAMS_PER_PEAK))
        .map(|(&c, p)| pseudo_voigt(x, c, p[1], p[0], p[2]))
        .sum()
}

fn residuals(x: &[f64], y: &[f64], centers: &[f64], params: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(
        x.len(),
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| yi - model(xi, centers, params)),
    )
}

/// Derivatives of the model with respect to every parameter
fn jacobian(x: &[f64], centers: &[f64], params: &DVector<f64>) -> DMatrix<f64> {
    let mut jacobian = DMatrix::zeros(x.len(), params.len());
    for (k, (&center, p)) in centers
        .iter()
        .zip(params.as_slice().chunks_exact(PARAMS_PER_PEAK))
        .enumerate()
    {
        let (amplitude, sigma, fraction) = (p[0], p[1], p[2]);
        let col = k * PARAMS_PER_PEAK;
        for (row, &xi) in x.iter().enumerate() {
            let [g, l, dg, dl] = components(xi - center, sigma);
            jacobian[(row, col)] = (1.0 - fraction) * g + fraction * l;
            jacobian[(row, col + 1)] = amplitude * ((1.0 - fraction) * dg + fraction * dl);
            jacobian[(row, col + 2)] = amplitude * (l - g);
        }
    }
    jacobian
}
