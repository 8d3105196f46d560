//! Confidence scoring: how much of each compound's own peak signature
//! shows up in the unknown spectrum.
//!
//! The score for compound `j` is `100 * matched / own_peak_count`, where
//! `matched` counts the unknown peaks flagged in that compound's assignment
//! matrix. The denominator is the compound's peak count, not the unknown's,
//! so a sparse compound (one peak, matched) scores 100% regardless of how
//! many other unknown peaks it leaves unexplained. False positives from
//! sparse signatures are therefore not penalised.
//!
//! Counting unknown peaks against compound peaks skews both ways. Several
//! unknown peaks near one compound peak over-count, and the score is capped
//! at 100. One unknown peak lying within tolerance of two close compound
//! peaks under-counts: both compound peaks are present, yet only one match
//! is recorded and the compound scores 50%.

use serde::Serialize;

use crate::config::EmptyPeakPolicy;
use crate::error::{MatchError, Result};

use super::AssignmentMatrix;
use super::assignment::check_alignment;

/// Confidence for one compound
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundScore {
    pub title: String,
    /// Percentage in `[0, 100]`
    pub percentage: f64,
    /// Unknown peaks flagged for this compound
    pub matched: usize,
    /// Peaks detected in the compound's own spectrum
    pub peak_count: usize,
}

impl CompoundScore {
    /// Confidence as a fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        self.percentage / 100.0
    }
}

/// Title to percentage mapping, in compound input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfidenceScores(Vec<CompoundScore>);

impl ConfidenceScores {
    pub fn get(&self, title: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.percentage)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompoundScore> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[CompoundScore] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ConfidenceScores {
    type Item = &'a CompoundScore;
    type IntoIter = std::slice::Iter<'a, CompoundScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Score every compound, failing on compounds without peaks.
pub fn score_percentages<T: AsRef<str>>(
    known_peak_lists: &[Vec<f64>],
    assignment_matrices: &[AssignmentMatrix],
    known_titles: &[T],
) -> Result<ConfidenceScores> {
    score_percentages_with_policy(
        known_peak_lists,
        assignment_matrices,
        known_titles,
        EmptyPeakPolicy::Fail,
    )
}

/// Score every compound, handling peakless compounds per `policy`.
pub fn score_percentages_with_policy<T: AsRef<str>>(
    known_peak_lists: &[Vec<f64>],
    assignment_matrices: &[AssignmentMatrix],
    known_titles: &[T],
    policy: EmptyPeakPolicy,
) -> Result<ConfidenceScores> {
    check_alignment(known_peak_lists.len(), known_titles.len(), assignment_matrices)?;

    let mut scores = Vec::with_capacity(known_titles.len());
    for ((peaks, matrix), title) in known_peak_lists
        .iter()
        .zip(assignment_matrices)
        .zip(known_titles)
    {
        let title = title.as_ref();
        let matched = matrix.matched_count();

        if peaks.is_empty() {
            match policy {
                EmptyPeakPolicy::Fail => {
                    return Err(MatchError::DivisionUndefined {
                        title: title.to_string(),
                    });
                }
                EmptyPeakPolicy::Zero => {
                    log::warn!("Compound '{}' has no peaks; scoring 0%", title);
                    scores.push(CompoundScore {
                        title: title.to_string(),
                        percentage: 0.0,
                        matched,
                        peak_count: 0,
                    });
                }
                EmptyPeakPolicy::Skip => {
                    log::warn!("Compound '{}' has no peaks; leaving it unscored", title);
                }
            }
            continue;
        }

        let raw = 100.0 * matched as f64 / peaks.len() as f64;
        if raw > 100.0 {
            log::debug!(
                "'{}': {} unknown peaks matched {} compound peaks; capping at 100%",
                title,
                matched,
                peaks.len()
            );
        }
        scores.push(CompoundScore {
            title: title.to_string(),
            percentage: raw.min(100.0),
            matched,
            peak_count: peaks.len(),
        });
    }

    Ok(ConfidenceScores(scores))
}

/// Compounds whose confidence fraction reaches `criterion` (0-1).
pub fn judge_presence(scores: &ConfidenceScores, criterion: f64) -> Vec<&CompoundScore> {
    scores
        .iter()
        .filter(|s| s.fraction() >= criterion)
        .collect()
}
