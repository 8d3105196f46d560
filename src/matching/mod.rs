pub mod assignment;
pub mod comparator;
pub mod confidence;
pub mod similarity;

pub use assignment::assign_labels;
pub use comparator::{AssignmentMatrix, compare_unknown_to_known, compare_with_tolerance};
pub use confidence::{
    CompoundScore, ConfidenceScores, judge_presence, score_percentages,
    score_percentages_with_policy,
};
pub use similarity::{PairScores, peak_1d_score, score_max};
