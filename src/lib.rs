pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod library;
pub mod matching;
pub mod mixture;
pub mod output;
pub mod signal_processing;
pub mod spectrum;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::MatchConfig;
pub use dispatch::{MatchEngine, MatchReport, assign_and_score};
pub use error::{MatchError, Result};
pub use spectrum::{KnownCompound, Peak, Spectrum};
