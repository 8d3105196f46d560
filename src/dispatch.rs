//! Parallel peak matching against a compound library.
//!
//! [`MatchEngine`] owns a fixed-size worker pool built once from
//! [`DispatchConfig`](crate::config::DispatchConfig) and reused by every
//! run. A run detects the unknown's peaks once, then fans out one task per
//! known compound (peak detection followed by comparison against the
//! unknown's peak positions). Results are joined back in library order
//! before labels and confidences are computed, because titles and
//! assignment matrices are zipped positionally.

use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::{MatchConfig, ScoringConfig, Tolerance, available_cores};
use crate::error::{MatchError, Result};
use crate::matching::{
    AssignmentMatrix, CompoundScore, ConfidenceScores, assign_labels, compare_with_tolerance,
    judge_presence, score_percentages_with_policy,
};
use crate::signal_processing::{FitReport, PeakDetector, PeakFitter};
use crate::spectrum::{KnownCompound, Peak, Spectrum, ensure_unique_titles, peak_positions};

/// Output of one per-compound task
#[derive(Debug, Clone)]
pub struct CompoundMatch {
    pub peaks: Vec<Peak>,
    pub assignment: AssignmentMatrix,
}

/// Result of matching an unknown spectrum against a library
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    /// Peaks detected in the unknown spectrum, ascending position
    pub unknown_peaks: Vec<Peak>,
    /// Labels per unknown peak, `["Unassigned"]` when nothing matches
    pub assignments: Vec<Vec<String>>,
    /// Confidence per compound, in library order
    pub percentages: ConfidenceScores,
}

impl MatchReport {
    pub fn unknown_positions(&self) -> Vec<f64> {
        peak_positions(&self.unknown_peaks)
    }

    /// Compounds whose confidence fraction reaches `criterion`.
    pub fn present(&self, criterion: f64) -> Vec<&CompoundScore> {
        judge_presence(&self.percentages, criterion)
    }
}

pub struct MatchEngine {
    detector: PeakDetector,
    fitter: PeakFitter,
    tolerance: Tolerance,
    scoring: ScoringConfig,
    pool: rayon::ThreadPool,
    workers: usize,
}

impl MatchEngine {
    pub fn new(config: &MatchConfig) -> Result<Self> {
        config.validate()?;

        let cores = available_cores();
        let workers = config.dispatch.max_workers.clamp(1, cores);
        if workers < config.dispatch.max_workers {
            log::warn!(
                "Requested {} workers but only {} cores are available; using {}",
                config.dispatch.max_workers,
                cores,
                workers
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ramanmatch-worker-{}", i))
            .build()
            .map_err(|e| MatchError::Config(format!("failed to build worker pool: {}", e)))?;

        Ok(Self {
            detector: PeakDetector::new(&config.detection, &config.baseline)?,
            fitter: PeakFitter::new(&config.fit)?,
            tolerance: config.comparison.tolerance,
            scoring: config.scoring.clone(),
            pool,
            workers,
        })
    }

    /// Worker threads in the pool
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn detect_peaks(&self, spectrum: &Spectrum) -> Result<Vec<Peak>> {
        self.detector.detect(spectrum)
    }

    /// Detect a compound's peaks and compare them with the unknown's.
    pub fn match_compound(
        &self,
        unknown_positions: &[f64],
        compound: &KnownCompound,
    ) -> Result<CompoundMatch> {
        let peaks = self.detector.detect(compound.spectrum())?;
        let assignment =
            compare_with_tolerance(unknown_positions, &peak_positions(&peaks), self.tolerance)?;
        Ok(CompoundMatch { peaks, assignment })
    }

    /// Fit a pseudo-Voigt profile to every peak detected in `spectrum`.
    ///
    /// Profiles are fitted to the same corrected trace peak detection uses.
    pub fn fit_report(&self, spectrum: &Spectrum) -> Result<FitReport> {
        let (y, peaks) = self.detector.detect_with_trace(spectrum)?;
        self.fitter.fit(spectrum.x(), &y, &peaks)
    }

    pub fn compound_report(&self, compound: &KnownCompound) -> Result<FitReport> {
        self.fit_report(compound.spectrum())
    }

    /// Peak profile fits for every compound, in library order.
    pub fn compound_reports(&self, library: &[KnownCompound]) -> Result<Vec<FitReport>> {
        self.map_compounds(library, |compound| self.compound_report(compound))
    }

    /// Run `task` on every compound in the pool, returning results in
    /// library order.
    ///
    /// Every task runs to completion. If any failed, the failure with the
    /// lowest library index is returned as [`MatchError::WorkerFailure`] and
    /// all other results are discarded.
    pub fn map_compounds<T, F>(&self, library: &[KnownCompound], task: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&KnownCompound) -> Result<T> + Sync,
    {
        let outcomes: Vec<Result<T>> = self
            .pool
            .install(|| library.par_iter().map(&task).collect());

        let mut results = Vec::with_capacity(outcomes.len());
        for (index, (compound, outcome)) in library.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(value) => results.push(value),
                Err(e) => {
                    return Err(MatchError::WorkerFailure {
                        index,
                        title: compound.title().to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(results)
    }

    /// Label the unknown's peaks and score every compound in `library`.
    ///
    /// Per-compound work goes through [`MatchEngine::map_compounds`].
    pub fn assign_and_score(
        &self,
        unknown: &Spectrum,
        library: &[KnownCompound],
    ) -> Result<MatchReport> {
        ensure_unique_titles(library)?;

        let start = Instant::now();
        let unknown_peaks = self.detector.detect(unknown)?;
        let unknown_positions = peak_positions(&unknown_peaks);
        log::debug!(
            "Unknown spectrum: {} peaks in {:.1?}",
            unknown_peaks.len(),
            start.elapsed()
        );

        let matches = self.map_compounds(library, |compound| {
            let task_start = Instant::now();
            let m = self.match_compound(&unknown_positions, compound)?;
            log::debug!(
                "'{}': {} peaks, {} unknown peaks matched in {:.1?}",
                compound.title(),
                m.peaks.len(),
                m.assignment.matched_count(),
                task_start.elapsed()
            );
            Ok(m)
        })?;

        let mut compound_peaks = Vec::with_capacity(matches.len());
        let mut matrices = Vec::with_capacity(matches.len());
        for m in matches {
            compound_peaks.push(peak_positions(&m.peaks));
            matrices.push(m.assignment);
        }

        let titles: Vec<&str> = library.iter().map(|c| c.title()).collect();
        let assignments = assign_labels(&unknown_positions, &compound_peaks, &titles, &matrices)?;
        let percentages = score_percentages_with_policy(
            &compound_peaks,
            &matrices,
            &titles,
            self.scoring.empty_peaks,
        )?;

        log::info!(
            "Matched {} unknown peaks against {} compounds on {} workers in {:.1?}",
            unknown_peaks.len(),
            library.len(),
            self.workers,
            start.elapsed()
        );

        Ok(MatchReport {
            unknown_peaks,
            assignments,
            percentages,
        })
    }
}

/// One-shot matching with a dedicated pool of up to `max_workers` threads.
///
/// Prefer a long-lived [`MatchEngine`] when matching repeatedly.
pub fn assign_and_score(
    unknown: &Spectrum,
    library: &[KnownCompound],
    config: &MatchConfig,
    max_workers: usize,
) -> Result<MatchReport> {
    let mut config = config.clone();
    config.dispatch.max_workers = max_workers;
    MatchEngine::new(&config)?.assign_and_score(unknown, library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BaselineConfig, EmptyPeakPolicy, Prominence};

    /// Sparse stick spectrum on a 1 cm⁻¹ grid with unit-height peaks.
    fn stick_spectrum(peaks: &[f64]) -> Spectrum {
        let x: Vec<f64> = (300..=2000).map(f64::from).collect();
        let y = x
            .iter()
            .map(|&w| if peaks.contains(&w) { 1.0 } else { 0.0 })
            .collect();
        Spectrum::new(x, y).unwrap()
    }

    fn raw_config() -> MatchConfig {
        let mut config = MatchConfig::default();
        config.baseline = BaselineConfig {
            enabled: false,
            ..BaselineConfig::default()
        };
        config.detection.prominence = Prominence::Fixed(0.5);
        config
    }

    #[test]
    fn test_water_scenario() {
        let unknown = stick_spectrum(&[500.0, 1000.0, 1500.0]);
        let water = KnownCompound::new("WATER", stick_spectrum(&[502.0, 1498.0])).unwrap();

        let report = assign_and_score(&unknown, &[water], &raw_config(), 2).unwrap();

        assert_eq!(report.unknown_positions(), vec![500.0, 1000.0, 1500.0]);
        assert_eq!(
            report.assignments,
            vec![vec!["WATER"], vec!["Unassigned"], vec!["WATER"]]
        );
        assert_eq!(report.percentages.get("WATER"), Some(100.0));
    }

    #[test]
    fn test_empty_library() {
        let unknown = stick_spectrum(&[500.0, 900.0]);
        let engine = MatchEngine::new(&raw_config()).unwrap();
        let report = engine.assign_and_score(&unknown, &[]).unwrap();
        assert_eq!(report.assignments.len(), 2);
        assert!(report.percentages.is_empty());
    }

    #[test]
    fn test_peakless_compound_fails_by_default() {
        let unknown = stick_spectrum(&[500.0]);
        let flat = KnownCompound::new("FLAT", stick_spectrum(&[])).unwrap();
        let err = assign_and_score(&unknown, &[flat], &raw_config(), 1).unwrap_err();
        assert!(matches!(err, MatchError::DivisionUndefined { .. }));
    }

    #[test]
    fn test_peakless_compound_zero_policy() {
        let unknown = stick_spectrum(&[500.0]);
        let flat = KnownCompound::new("FLAT", stick_spectrum(&[])).unwrap();
        let mut config = raw_config();
        config.scoring.empty_peaks = EmptyPeakPolicy::Zero;
        let report = assign_and_score(&unknown, &[flat], &config, 1).unwrap();
        assert_eq!(report.percentages.get("FLAT"), Some(0.0));
    }

    #[test]
    fn test_duplicate_titles_rejected() {
        let unknown = stick_spectrum(&[500.0]);
        let a = KnownCompound::new("A", stick_spectrum(&[500.0])).unwrap();
        let result = assign_and_score(&unknown, &[a.clone(), a], &raw_config(), 1);
        assert!(matches!(result, Err(MatchError::InvalidInput(_))));
    }

    #[test]
    fn test_workers_capped() {
        let mut config = raw_config();
        config.dispatch.max_workers = 10_000;
        let engine = MatchEngine::new(&config).unwrap();
        assert!(engine.workers() >= 1);
        assert!(engine.workers() <= available_cores());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let unknown = stick_spectrum(&[500.0]);
        assert!(assign_and_score(&unknown, &[], &raw_config(), 0).is_err());
    }

    #[test]
    fn test_map_compounds_preserves_order() {
        let mut config = raw_config();
        config.dispatch.max_workers = 8;
        let engine = MatchEngine::new(&config).unwrap();
        let library: Vec<KnownCompound> = (0..32)
            .map(|i| KnownCompound::new(format!("C{}", i), stick_spectrum(&[])).unwrap())
            .collect();

        let titles = engine
            .map_compounds(&library, |c| {
                // Uneven work so completion order differs from submission order
                let n: u64 = c.title()[1..].parse().unwrap();
                std::thread::sleep(std::time::Duration::from_millis((32 - n) % 7));
                Ok(c.title().to_string())
            })
            .unwrap();
        let expected: Vec<String> = (0..32).map(|i| format!("C{}", i)).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn test_map_compounds_reports_lowest_failure() {
        let engine = MatchEngine::new(&raw_config()).unwrap();
        let library: Vec<KnownCompound> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|t| KnownCompound::new(*t, stick_spectrum(&[])).unwrap())
            .collect();

        let err = engine
            .map_compounds(&library, |c| match c.title() {
                "B" | "D" => Err(MatchError::Numeric(format!("{} diverged", c.title()))),
                _ => Ok(()),
            })
            .unwrap_err();
        match err {
            MatchError::WorkerFailure {
                index,
                title,
                source,
            } => {
                assert_eq!(index, 1);
                assert_eq!(title, "B");
                assert!(matches!(*source, MatchError::Numeric(_)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_compound_reports() {
        let x: Vec<f64> = (300..=2000).map(f64::from).collect();
        let lorentzian = |w: f64, c: f64| 1.0 / (1.0 + ((w - c) / 4.0).powi(2));
        let y = x
            .iter()
            .map(|&w| lorentzian(w, 800.0) + lorentzian(w, 1400.0))
            .collect();
        let library = vec![
            KnownCompound::new("DOUBLET", Spectrum::new(x, y).unwrap()).unwrap(),
            KnownCompound::new("STICKS", stick_spectrum(&[700.0])).unwrap(),
        ];

        let engine = MatchEngine::new(&raw_config()).unwrap();
        let reports = engine.compound_reports(&library).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].centers(), vec![800.0, 1400.0]);
        for fit in &reports[0].peaks {
            assert!((fit.fwhm - 8.0).abs() < 0.2, "fwhm {}", fit.fwhm);
        }
        assert_eq!(reports[0].xmin, 300.0);
        assert_eq!(reports[0].xmax, 2000.0);
        assert_eq!(reports[1].centers(), vec![700.0]);
    }

    #[test]
    fn test_present() {
        let unknown = stick_spectrum(&[500.0, 1000.0]);
        let a = KnownCompound::new("A", stick_spectrum(&[500.0, 1000.0])).unwrap();
        let b = KnownCompound::new("B", stick_spectrum(&[700.0, 1000.0])).unwrap();
        let report = assign_and_score(&unknown, &[a, b], &raw_config(), 2).unwrap();
        let present: Vec<&str> = report
            .present(0.99)
            .into_iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(present, vec!["A"]);
        assert_eq!(report.percentages.get("B"), Some(50.0));
    }
}
