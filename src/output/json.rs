use serde::Serialize;

use crate::dispatch::MatchReport;
use crate::signal_processing::FitReport;

use super::{Formatter, iso8601_timestamp};

pub struct JsonFormatter {
    criterion: f64,
}

impl JsonFormatter {
    pub fn new(criterion: f64) -> Self {
        Self { criterion }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    ts: String,
    #[serde(flatten)]
    report: &'a MatchReport,
    present: Vec<&'a str>,
}

#[derive(Serialize)]
struct JsonFit<'a> {
    title: &'a str,
    #[serde(flatten)]
    fit: &'a FitReport,
}

#[derive(Serialize)]
struct JsonFits<'a> {
    ts: String,
    fits: Vec<JsonFit<'a>>,
}

fn to_json<T: Serialize>(document: &T) -> String {
    serde_json::to_string(document).unwrap_or_else(|e| {
        log::error!("Failed to serialise report: {}", e);
        format!(r#"{{"error":"{}"}}"#, e)
    })
}

impl Formatter for JsonFormatter {
    fn format(&self, report: &MatchReport) -> String {
        let document = JsonReport {
            ts: iso8601_timestamp(),
            report,
            present: report
                .present(self.criterion)
                .into_iter()
                .map(|s| s.title.as_str())
                .collect(),
        };
        to_json(&document)
    }

    fn format_fits(&self, fits: &[(&str, &FitReport)]) -> String {
        to_json(&JsonFits {
            ts: iso8601_timestamp(),
            fits: fits
                .iter()
                .map(|&(title, fit)| JsonFit { title, fit })
                .collect(),
        })
    }
}
