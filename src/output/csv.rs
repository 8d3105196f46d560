use ::csv::{Terminator, WriterBuilder};

use crate::dispatch::MatchReport;
use crate::signal_processing::FitReport;

use super::{Formatter, iso8601_timestamp};

const FIT_HEADER: [&str; 9] = [
    "ts", "compound", "center", "sigma", "amplitude", "fwhm", "height", "fraction", "converged",
];

type RowResult = Result<String, Box<dyn std::error::Error>>;

/// One row per compound
pub struct CsvFormatter {
    criterion: f64,
}

impl CsvFormatter {
    pub fn new(criterion: f64) -> Self {
        Self { criterion }
    }

    fn write_rows(&self, report: &MatchReport) -> RowResult {
        let ts = iso8601_timestamp();
        let mut writer = row_writer();

        for score in report.percentages.iter() {
            writer.write_record([
                ts.clone(),
                score.title.clone(),
                format!("{:.2}", score.percentage),
                score.matched.to_string(),
                score.peak_count.to_string(),
                (score.fraction() >= self.criterion).to_string(),
            ])?;
        }

        finish(writer)
    }

    fn write_fit_rows(&self, fits: &[(&str, &FitReport)]) -> RowResult {
        let ts = iso8601_timestamp();
        let mut writer = row_writer();
        writer.write_record(FIT_HEADER)?;

        for (title, fit) in fits {
            for peak in &fit.peaks {
                writer.write_record([
                    ts.clone(),
                    title.to_string(),
                    format!("{:.2}", peak.center),
                    format!("{:.4}", peak.sigma),
                    format!("{:.4}", peak.amplitude),
                    format!("{:.4}", peak.fwhm),
                    format!("{:.4}", peak.height),
                    format!("{:.4}", peak.fraction),
                    fit.converged.to_string(),
                ])?;
            }
        }

        finish(writer)
    }
}

fn row_writer() -> ::csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

/// Written rows without the final terminator
fn finish(writer: ::csv::Writer<Vec<u8>>) -> RowResult {
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut rows = String::from_utf8(bytes)?;
    if rows.ends_with('\n') {
        rows.pop();
    }
    Ok(rows)
}

impl Formatter for CsvFormatter {
    fn format(&self, report: &MatchReport) -> String {
        self.write_rows(report).unwrap_or_else(|e| {
            log::error!("Failed to write CSV rows: {}", e);
            String::new()
        })
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,compound,percentage,matched,peak_count,present")
    }

    /// Peak rows behind their own header line
    fn format_fits(&self, fits: &[(&str, &FitReport)]) -> String {
        self.write_fit_rows(fits).unwrap_or_else(|e| {
            log::error!("Failed to write CSV rows: {}", e);
            String::new()
        })
    }
}
