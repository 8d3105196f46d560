use crate::constants::UNASSIGNED_LABEL;
use crate::error::{MatchError, Result};

use super::AssignmentMatrix;

/// Label every unknown peak with the titles of the compounds that explain it.
///
/// Labels for a peak follow the order of `known_titles`; a peak no compound
/// matches gets `["Unassigned"]`. The output has one non-empty entry per
/// unknown peak.
pub fn assign_labels<T: AsRef<str>>(
    unknown_peaks: &[f64],
    known_peak_lists: &[Vec<f64>],
    known_titles: &[T],
    assignment_matrices: &[AssignmentMatrix],
) -> Result<Vec<Vec<String>>> {
    check_alignment(known_peak_lists.len(), known_titles.len(), assignment_matrices)?;
    check_matrix_lengths(unknown_peaks.len(), known_titles, assignment_matrices)?;

    let labels = (0..unknown_peaks.len())
        .map(|i| {
            let mut labels: Vec<String> = known_titles
                .iter()
                .zip(assignment_matrices)
                .filter(|(_, matrix)| matrix.is_match(i))
                .map(|(title, _)| title.as_ref().to_string())
                .collect();
            if labels.is_empty() {
                labels.push(UNASSIGNED_LABEL.to_string());
            }
            labels
        })
        .collect();
    Ok(labels)
}

pub(crate) fn check_alignment(
    peak_lists: usize,
    titles: usize,
    assignment_matrices: &[AssignmentMatrix],
) -> Result<()> {
    if peak_lists != titles || titles != assignment_matrices.len() {
        return Err(MatchError::InvalidInput(format!(
            "misaligned compound inputs: {} peak lists, {} titles, {} assignment matrices",
            peak_lists,
            titles,
            assignment_matrices.len()
        )));
    }
    Ok(())
}

fn check_matrix_lengths<T: AsRef<str>>(
    unknown_count: usize,
    known_titles: &[T],
    assignment_matrices: &[AssignmentMatrix],
) -> Result<()> {
    for (title, matrix) in known_titles.iter().zip(assignment_matrices) {
        if matrix.len() != unknown_count {
            return Err(MatchError::InvalidInput(format!(
                "assignment matrix for '{}' has {} entries, expected {}",
                title.as_ref(),
                matrix.len(),
                unknown_count
            )));
        }
    }
    Ok(())
}
