//! Synthetic two-compound mixtures built from reference spectra.
//!
//! Reference spectra rarely share a sampling grid, so each one is
//! baseline-corrected, stripped of repeated wavenumbers, and resampled onto
//! whole wavenumbers before intensities are added point by point.

use std::cmp::Ordering;

use crate::error::{MatchError, Result};
use crate::signal_processing::{BaselineCorrector, CubicSpline};
use crate::spectrum::Spectrum;

/// Baseline-correct `spectrum` and drop samples that repeat the previous
/// retained wavenumber.
pub fn clean_spectrum(spectrum: &Spectrum, corrector: &BaselineCorrector) -> Result<Spectrum> {
    let corrected = corrector.subtract(spectrum.y())?;

    let mut x = Vec::with_capacity(spectrum.len());
    let mut y = Vec::with_capacity(spectrum.len());
    for (&xi, yi) in spectrum.x().iter().zip(corrected) {
        if x.last() == Some(&xi) {
            continue;
        }
        x.push(xi);
        y.push(yi);
    }

    let dropped = spectrum.len() - x.len();
    if dropped > 0 {
        log::debug!("Dropped {} repeated wavenumbers", dropped);
    }
    Spectrum::new(x, y)
}

/// Interpolate onto every whole wavenumber strictly inside the sampled range.
pub fn resample_integer_grid(spectrum: &Spectrum) -> Result<Spectrum> {
    let spline = CubicSpline::new(spectrum.x(), spectrum.y())?;
    let (lo, hi) = spline.domain();

    let first = lo.floor() as i64 + 1;
    let last = hi.floor() as i64 - 1;
    if last < first {
        return Err(MatchError::InvalidInput(format!(
            "range [{}, {}] contains no interior whole wavenumber",
            lo, hi
        )));
    }

    let x: Vec<f64> = (first..=last).map(|w| w as f64).collect();
    let y = x
        .iter()
        .map(|&t| spline.evaluate(t))
        .collect::<Result<Vec<f64>>>()?;
    Spectrum::new(x, y)
}

/// Merge two ascending spectra, adding intensities where wavenumbers coincide.
pub fn sum_spectra(a: &Spectrum, b: &Spectrum) -> Result<Spectrum> {
    let (ax, ay) = (a.x(), a.y());
    let (bx, by) = (b.x(), b.y());
    let mut x = Vec::with_capacity(ax.len() + bx.len());
    let mut y = Vec::with_capacity(ax.len() + bx.len());

    let (mut i, mut j) = (0, 0);
    while i < ax.len() || j < bx.len() {
        let order = match (ax.get(i), bx.get(j)) {
            (Some(p), Some(q)) => p.total_cmp(q),
            (Some(_), None) => Ordering::Less,
            _ => Ordering::Greater,
        };
        match order {
            Ordering::Less => {
                x.push(ax[i]);
                y.push(ay[i]);
                i += 1;
            }
            Ordering::Greater => {
                x.push(bx[j]);
                y.push(by[j]);
                j += 1;
            }
            Ordering::Equal => {
                x.push(ax[i]);
                y.push(ay[i] + by[j]);
                i += 1;
                j += 1;
            }
        }
    }
    Spectrum::new(x, y)
}

/// Build an unknown-like spectrum containing both `a` and `b`.
pub fn combine_spectra(
    a: &Spectrum,
    b: &Spectrum,
    corrector: &BaselineCorrector,
) -> Result<Spectrum> {
    let a = resample_integer_grid(&clean_spectrum(a, corrector)?)?;
    let b = resample_integer_grid(&clean_spectrum(b, corrector)?)?;
    sum_spectra(&a, &b)
}
