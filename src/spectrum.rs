//! Spectrum records shared by every stage of the pipeline.
//!
//! A [`Spectrum`] is validated on construction (equal lengths, finite
//! values, non-empty), so downstream stages never re-check raw arrays.

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// A Raman spectrum: wavenumber `x` against intensity `y`.
///
/// `x` is expected to be non-decreasing but may repeat values in raw data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Spectrum {
    /// Create a spectrum, rejecting empty, mismatched or non-finite data.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.is_empty() {
            return Err(MatchError::InvalidInput("spectrum is empty".to_string()));
        }
        if x.len() != y.len() {
            return Err(MatchError::InvalidInput(format!(
                "x has {} values but y has {}",
                x.len(),
                y.len()
            )));
        }
        ensure_finite("x", &x)?;
        ensure_finite("y", &y)?;
        Ok(Self { x, y })
    }

    /// Build a spectrum from `(x, y)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let (x, y) = pairs.iter().copied().unzip();
        Self::new(x, y)
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Iterate over `(x, y)` samples in order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.x, self.y)
    }
}

/// Wire form of a spectrum record; validated through [`KnownCompound::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundRecord {
    pub title: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// A reference spectrum tagged with the title of the compound it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnownCompound {
    title: String,
    #[serde(flatten)]
    spectrum: Spectrum,
}

impl KnownCompound {
    pub fn new(title: impl Into<String>, spectrum: Spectrum) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(MatchError::InvalidInput(
                "compound title must not be empty".to_string(),
            ));
        }
        Ok(Self { title, spectrum })
    }

    pub fn from_xy(title: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let title = title.into();
        let spectrum = Spectrum::new(x, y)
            .map_err(|e| MatchError::InvalidInput(format!("compound '{}': {}", title, e)))?;
        Self::new(title, spectrum)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn into_parts(self) -> (String, Spectrum) {
        (self.title, self.spectrum)
    }
}

impl TryFrom<CompoundRecord> for KnownCompound {
    type Error = MatchError;

    fn try_from(record: CompoundRecord) -> Result<Self> {
        Self::from_xy(record.title, record.x, record.y)
    }
}

/// A detected peak: wavenumber position and baseline-corrected height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub position: f64,
    pub height: f64,
}

/// Extract the positions of a peak list, preserving order.
pub fn peak_positions(peaks: &[Peak]) -> Vec<f64> {
    peaks.iter().map(|p| p.position).collect()
}

/// Reject titles that appear more than once in a compound library.
pub fn ensure_unique_titles(compounds: &[KnownCompound]) -> Result<()> {
    let mut seen = std::collections::HashSet::with_capacity(compounds.len());
    for compound in compounds {
        if !seen.insert(compound.title()) {
            return Err(MatchError::InvalidInput(format!(
                "duplicate compound title '{}'",
                compound.title()
            )));
        }
    }
    Ok(())
}

pub(crate) fn ensure_finite(name: &str, values: &[f64]) -> Result<()> {
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(MatchError::InvalidInput(format!(
            "{}[{}] is not a finite number ({})",
            name, i, values[i]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_rejects_mismatched_lengths() {
        let err = Spectrum::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, MatchError::InvalidInput(_)));
    }

    #[test]
    fn test_spectrum_rejects_empty() {
        assert!(Spectrum::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_spectrum_rejects_nan() {
        let err = Spectrum::new(vec![1.0, 2.0], vec![0.5, f64::NAN]).unwrap_err();
        assert!(err.to_string().contains("y[1]"));
    }

    #[test]
    fn test_spectrum_allows_duplicate_x() {
        let spectrum = Spectrum::new(vec![1.0, 1.0, 2.0], vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(spectrum.len(), 3);
    }

    #[test]
    fn test_from_pairs() {
        let spectrum = Spectrum::from_pairs(&[(100.0, 1.0), (101.0, 2.0)]).unwrap();
        assert_eq!(spectrum.x(), &[100.0, 101.0]);
        assert_eq!(spectrum.y(), &[1.0, 2.0]);
    }

    #[test]
    fn test_known_compound_requires_title() {
        let spectrum = Spectrum::new(vec![1.0], vec![1.0]).unwrap();
        assert!(KnownCompound::new("  ", spectrum).is_err());
    }

    #[test]
    fn test_known_compound_error_names_title() {
        let err = KnownCompound::from_xy("WATER", vec![1.0], vec![]).unwrap_err();
        assert!(err.to_string().contains("WATER"));
    }

    #[test]
    fn test_duplicate_titles_rejected() {
        let a = KnownCompound::from_xy("A", vec![1.0], vec![1.0]).unwrap();
        let b = KnownCompound::from_xy("A", vec![2.0], vec![1.0]).unwrap();
        assert!(ensure_unique_titles(&[a.clone()]).is_ok());
        assert!(ensure_unique_titles(&[a, b]).is_err());
    }
}
