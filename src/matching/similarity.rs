//! Reciprocal-distance similarity between two peak-position lists.
//!
//! A graded alternative to the binary tolerance test: every pair of peaks
//! closer than [`SIMILARITY_MAX_SEPARATION`] gets a score of `1 / (d + 1)`
//! (so coincident peaks score 1), optionally normalised by a reference
//! maximum.

use crate::constants::{SIMILARITY_MAX_SEPARATION, SIMILARITY_MIN_SCORE};
use crate::error::{MatchError, Result};
use crate::spectrum::ensure_finite;

/// Scored peak pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairScores {
    pub scores: Vec<f64>,
    /// `(row_i peak, row_j peak)` for each score
    pub pairs: Vec<(f64, f64)>,
}

/// Score every `(row_i, row_j)` pair, dividing by `score_max`.
///
/// Pairs where `row_i` exceeds `row_j` by more than the maximum separation
/// are skipped, as are pairs scoring at or below the minimum score.
pub fn peak_1d_score(row_i: &[f64], row_j: &[f64], score_max: f64) -> Result<PairScores> {
    ensure_finite("row_i", row_i)?;
    ensure_finite("row_j", row_j)?;
    if !score_max.is_finite() || score_max <= 0.0 {
        return Err(MatchError::InvalidInput(format!(
            "score_max must be a positive number, got {}",
            score_max
        )));
    }

    let mut result = PairScores::default();
    for &a in row_i {
        for &b in row_j {
            if a - b > SIMILARITY_MAX_SEPARATION {
                continue;
            }
            let score = 1.0 / ((a - b).abs() + 1.0);
            if score > SIMILARITY_MIN_SCORE {
                result.scores.push(score / score_max);
                result.pairs.push((a, b));
            }
        }
    }
    Ok(result)
}

/// Scores normalised by the `k`-th highest distinct raw score.
///
/// Falls back to a normaliser of 1 when fewer than `k` distinct scores exist.
pub fn score_max(row_i: &[f64], row_j: &[f64], k: usize) -> Result<PairScores> {
    if k == 0 {
        return Err(MatchError::InvalidInput(
            "k must be at least 1".to_string(),
        ));
    }

    let raw = peak_1d_score(row_i, row_j, 1.0)?;
    let mut distinct = raw.scores;
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup();

    let normaliser = match distinct.get(k - 1) {
        Some(&s) => s,
        None => {
            log::warn!(
                "Only {} distinct scores, cannot normalise by rank {}; using 1",
                distinct.len(),
                k
            );
            1.0
        }
    };
    peak_1d_score(row_i, row_j, normaliser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_peak_1d_score_range() {
        let result = peak_1d_score(&[0.0, 1.0], &[2.0, 1.0], 1.0).unwrap();
        assert_eq!(result.scores.len(), 4);
        assert!(result.scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
        assert_eq!(result.pairs[3], (1.0, 1.0));
        assert_relative_eq!(result.scores[3], 1.0);
        assert_relative_eq!(result.scores[0], 1.0 / 3.0);
    }

    #[test]
    fn test_far_pairs_dropped() {
        let result = peak_1d_score(&[500.0], &[100.0, 560.0, 501.0], 1.0).unwrap();
        assert_eq!(result.pairs, vec![(500.0, 501.0)]);
    }

    #[test]
    fn test_invalid_score_max() {
        assert!(peak_1d_score(&[0.0], &[1.0], -1.0).is_err());
        assert!(peak_1d_score(&[0.0], &[1.0], 0.0).is_err());
    }

    #[test]
    fn test_score_max_normalises_by_rank() {
        // Raw scores: 1/3, 1/2, 1/2, 1/3; second highest distinct is 1/3
        let result = score_max(&[0.0, 3.0], &[2.0, 1.0], 2).unwrap();
        assert_eq!(result.scores.len(), 4);
        assert!(result.scores.iter().all(|&s| (0.0..=2.0).contains(&s)));
        assert_relative_eq!(result.scores[1], 1.5);
    }

    #[test]
    fn test_score_max_fallback() {
        let result = score_max(&[0.0], &[0.0], 5).unwrap();
        assert_eq!(result.scores, vec![1.0]);
    }

    #[test]
    fn test_score_max_invalid_k() {
        assert!(score_max(&[0.0], &[1.0], 0).is_err());
    }
}
