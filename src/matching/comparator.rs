use serde::Serialize;

use crate::config::Tolerance;
use crate::error::Result;
use crate::spectrum::ensure_finite;

/// Per-compound match flags, one per unknown-spectrum peak
///
/// Entry `i` is set when unknown peak `i` coincides with any peak of the
/// compound. The length always equals the number of unknown peaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssignmentMatrix(Vec<bool>);

impl AssignmentMatrix {
    /// All-unmatched matrix for `len` unknown peaks
    pub fn zeros(len: usize) -> Self {
        Self(vec![false; len])
    }

    pub fn from_flags(flags: Vec<bool>) -> Self {
        Self(flags)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_match(&self, unknown_index: usize) -> bool {
        self.0.get(unknown_index).copied().unwrap_or(false)
    }

    /// Number of unknown peaks matched
    pub fn matched_count(&self) -> usize {
        self.0.iter().filter(|&&m| m).count()
    }

    /// 0/1 indicator form
    pub fn indicators(&self) -> Vec<u8> {
        self.0.iter().map(|&m| u8::from(m)).collect()
    }

    pub fn flags(&self) -> &[bool] {
        &self.0
    }
}

/// Flag each unknown peak position that lies within relative `precision`
/// of some known peak position.
///
/// # Example
/// ```
/// use ramanmatch::matching::compare_unknown_to_known;
///
/// let matrix =
///     compare_unknown_to_known(&[500.0, 1000.0, 1500.0], &[502.0, 1498.0], 0.03).unwrap();
/// assert_eq!(matrix.indicators(), vec![1, 0, 1]);
/// ```
pub fn compare_unknown_to_known(
    unknown_positions: &[f64],
    known_positions: &[f64],
    precision: f64,
) -> Result<AssignmentMatrix> {
    compare_with_tolerance(
        unknown_positions,
        known_positions,
        Tolerance::Relative(precision),
    )
}

/// As [`compare_unknown_to_known`], with an explicit tolerance model.
pub fn compare_with_tolerance(
    unknown_positions: &[f64],
    known_positions: &[f64],
    tolerance: Tolerance,
) -> Result<AssignmentMatrix> {
    tolerance.validate()?;
    ensure_finite("unknown peak positions", unknown_positions)?;
    ensure_finite("known peak positions", known_positions)?;

    let flags = unknown_positions
        .iter()
        .map(|&u| known_positions.iter().any(|&k| tolerance.is_close(u, k)))
        .collect();
    Ok(AssignmentMatrix(flags))
}
