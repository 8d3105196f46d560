mod csv;
mod json;
mod text;

use chrono::Utc;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

use crate::dispatch::MatchReport;
use crate::signal_processing::FitReport;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

pub trait Formatter: Send {
    fn format(&self, report: &MatchReport) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }

    /// Peak profile fits, one titled entry per spectrum.
    fn format_fits(&self, fits: &[(&str, &FitReport)]) -> String;
}

/// `criterion` is the confidence fraction at which a compound is reported present.
pub fn create_formatter(format: OutputFormat, verbose: bool, criterion: f64) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose, criterion)),
        OutputFormat::Json => Box::new(JsonFormatter::new(criterion)),
        OutputFormat::Csv => Box::new(CsvFormatter::new(criterion)),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
pub(crate) mod test_report {
    use crate::dispatch::MatchReport;
    use crate::matching::{AssignmentMatrix, score_percentages};
    use crate::signal_processing::{FitReport, PeakFit};
    use crate::spectrum::Peak;

    /// WATER bands at 1640 and 3250 with fitted profiles
    pub fn water_fit() -> FitReport {
        let band = |center: f64, sigma: f64, amplitude: f64, height: f64| PeakFit {
            center,
            sigma,
            amplitude,
            fwhm: 2.0 * sigma,
            height,
            fraction: 0.75,
        };
        FitReport {
            peaks: vec![band(1640.0, 30.0, 40.0, 0.4), band(3250.0, 60.0, 190.0, 1.0)],
            xmin: 200.0,
            xmax: 3600.0,
            iterations: 12,
            rms_residual: 0.0021,
            converged: true,
        }
    }

    /// Unknown peaks at 500/1000/1500 against WATER (502, 1498) and
    /// ETHANOL (880, 1050, 1455)
    pub fn water_report() -> MatchReport {
        let percentages = score_percentages(
            &[vec![502.0, 1498.0], vec![880.0, 1050.0, 1455.0]],
            &[
                AssignmentMatrix::from_flags(vec![true, false, true]),
                AssignmentMatrix::from_flags(vec![false, true, true]),
            ],
            &["WATER", "ETHANOL"],
        )
        .unwrap();
        MatchReport {
            unknown_peaks: vec![
                Peak { position: 500.0, height: 1.5 },
                Peak { position: 1000.0, height: 0.8 },
                Peak { position: 1500.0, height: 2.25 },
            ],
            assignments: vec![
                vec!["WATER".to_string()],
                vec!["ETHANOL".to_string()],
                vec!["WATER".to_string(), "ETHANOL".to_string()],
            ],
            percentages,
        }
    }
}
