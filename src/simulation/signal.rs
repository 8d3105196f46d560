use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::spectrum::{KnownCompound, Spectrum};

/// One Raman band, Lorentzian in shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RamanLine {
    /// Band centre (cm⁻¹)
    pub center: f64,
    /// Full width at half maximum (cm⁻¹)
    pub fwhm: f64,
    pub height: f64,
}

impl RamanLine {
    pub fn new(center: f64, fwhm: f64, height: f64) -> Self {
        Self {
            center,
            fwhm,
            height,
        }
    }
}

/// Evenly spaced wavenumber axis
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WavenumberGrid {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for WavenumberGrid {
    fn default() -> Self {
        Self {
            start: 200.0,
            end: 3200.0,
            step: 1.0,
        }
    }
}

impl WavenumberGrid {
    pub fn points(&self) -> Result<Vec<f64>> {
        if !(self.step > 0.0) || !(self.end > self.start) {
            return Err(MatchError::Config(format!(
                "invalid wavenumber grid {}..{} step {}",
                self.start, self.end, self.step
            )));
        }
        let n = ((self.end - self.start) / self.step).floor() as usize + 1;
        Ok((0..n).map(|i| self.start + i as f64 * self.step).collect())
    }
}

pub fn lorentzian(x: f64, line: &RamanLine) -> f64 {
    let half = line.fwhm / 2.0;
    line.height * half * half / ((x - line.center).powi(2) + half * half)
}

/// Noise-free spectrum: the sum of `lines` over `grid`.
pub fn generate_spectrum(grid: &WavenumberGrid, lines: &[RamanLine]) -> Result<Spectrum> {
    if let Some(line) = lines.iter().find(|l| !(l.fwhm > 0.0)) {
        return Err(MatchError::Config(format!(
            "line at {} cm-1 has non-positive width {}",
            line.center, line.fwhm
        )));
    }
    let x = grid.points()?;
    let y = x
        .iter()
        .map(|&w| lines.iter().map(|line| lorentzian(w, line)).sum())
        .collect();
    Spectrum::new(x, y)
}

pub fn generate_compound(
    title: &str,
    grid: &WavenumberGrid,
    lines: &[RamanLine],
) -> Result<KnownCompound> {
    KnownCompound::new(title, generate_spectrum(grid, lines)?)
}
