use crate::dispatch::MatchReport;
use crate::signal_processing::FitReport;

use super::Formatter;

pub struct TextFormatter {
    verbose: bool,
    criterion: f64,
}

impl TextFormatter {
    pub fn new(verbose: bool, criterion: f64) -> Self {
        Self { verbose, criterion }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, report: &MatchReport) -> String {
        let mut out = String::new();

        out.push_str(&format!("Peaks: {}\n", report.unknown_peaks.len()));
        for (peak, labels) in report.unknown_peaks.iter().zip(&report.assignments) {
            if self.verbose {
                out.push_str(&format!(
                    "  {:>8.1} cm-1 (height {:>8.3})  {}\n",
                    peak.position,
                    peak.height,
                    labels.join(", ")
                ));
            } else {
                out.push_str(&format!(
                    "  {:>8.1} cm-1  {}\n",
                    peak.position,
                    labels.join(", ")
                ));
            }
        }

        out.push_str("Confidence:\n");
        for score in &report.percentages {
            let marker = if score.fraction() >= self.criterion {
                " *"
            } else {
                ""
            };
            if self.verbose {
                out.push_str(&format!(
                    "  {:<24} {:>6.1}% ({}/{} peaks){}\n",
                    score.title, score.percentage, score.matched, score.peak_count, marker
                ));
            } else {
                out.push_str(&format!(
                    "  {:<24} {:>6.1}%{}\n",
                    score.title, score.percentage, marker
                ));
            }
        }
        out
    }

    fn format_fits(&self, fits: &[(&str, &FitReport)]) -> String {
        let mut out = String::new();
        for (title, fit) in fits {
            out.push_str(&format!(
                "Peak fits for {} ({:.1}-{:.1} cm-1):\n",
                title, fit.xmin, fit.xmax
            ));
            out.push_str("    center     fwhm    height   amplitude  fraction\n");
            for peak in &fit.peaks {
                out.push_str(&format!(
                    "  {:>8.1} {:>8.2} {:>9.3} {:>11.3} {:>9.2}\n",
                    peak.center, peak.fwhm, peak.height, peak.amplitude, peak.fraction
                ));
            }
            if self.verbose {
                out.push_str(&format!(
                    "  rms residual {:.3e} after {} iterations{}\n",
                    fit.rms_residual,
                    fit.iterations,
                    if fit.converged { "" } else { " (not converged)" }
                ));
            }
        }
        out
    }
}
