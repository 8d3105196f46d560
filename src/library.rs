//! Loading reference libraries and unknown spectra from disk.
//!
//! Supported formats, chosen by extension:
//! * `.json` – `[{"title": "...", "x": [...], "y": [...]}, ...]`, or a single
//!   such object
//! * `.csv`  – two numeric columns `x,y`, optional header row; the compound
//!   title is the file stem

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::Deserialize;

use crate::error::{MatchError, Result};
use crate::spectrum::{CompoundRecord, KnownCompound, Spectrum, ensure_unique_titles};

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRecords {
    Many(Vec<CompoundRecord>),
    One(CompoundRecord),
}

/// Load every compound in `path`.
pub fn load_compounds(path: &Path) -> Result<Vec<KnownCompound>> {
    let compounds = match extension(path).as_str() {
        "json" => load_json(path)?,
        "csv" => vec![load_csv(path)?],
        other => {
            return Err(MatchError::Parse {
                path: path.display().to_string(),
                reason: format!("unsupported file extension '.{}'", other),
            });
        }
    };
    log::debug!("Loaded {} compounds from {}", compounds.len(), path.display());
    Ok(compounds)
}

/// Load and concatenate several library files, rejecting repeated titles.
pub fn load_library<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<KnownCompound>> {
    let mut library = Vec::new();
    for path in paths {
        library.extend(load_compounds(path.as_ref())?);
    }
    ensure_unique_titles(&library)?;
    Ok(library)
}

/// Load a single spectrum; JSON files must hold exactly one record.
pub fn load_spectrum(path: &Path) -> Result<Spectrum> {
    let mut compounds = load_compounds(path)?;
    if compounds.len() != 1 {
        return Err(MatchError::Parse {
            path: path.display().to_string(),
            reason: format!("expected one spectrum, found {}", compounds.len()),
        });
    }
    let (_, spectrum) = compounds.remove(0).into_parts();
    Ok(spectrum)
}

/// Write compounds as a JSON array readable by [`load_compounds`].
pub fn write_json(path: &Path, compounds: &[KnownCompound]) -> Result<()> {
    let file = File::create(path).map_err(|source| io_error(path, source))?;
    serde_json::to_writer_pretty(BufWriter::new(file), compounds).map_err(|e| {
        MatchError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })
}

fn load_json(path: &Path) -> Result<Vec<KnownCompound>> {
    let file = File::open(path).map_err(|source| io_error(path, source))?;
    let records: JsonRecords =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| MatchError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let records = match records {
        JsonRecords::Many(records) => records,
        JsonRecords::One(record) => vec![record],
    };
    records.into_iter().map(KnownCompound::try_from).collect()
}

fn load_csv(path: &Path) -> Result<KnownCompound> {
    let parse_error = |reason: String| MatchError::Parse {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(source) => io_error(path, source),
            other => parse_error(format!("{:?}", other)),
        })?;

    let mut x = Vec::new();
    let mut y = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| parse_error(format!("row {}: {}", row + 1, e)))?;
        if record.len() < 2 {
            return Err(parse_error(format!(
                "row {}: expected two columns, found {}",
                row + 1,
                record.len()
            )));
        }
        match (record[0].parse::<f64>(), record[1].parse::<f64>()) {
            (Ok(xv), Ok(yv)) => {
                x.push(xv);
                y.push(yv);
            }
            // Header row
            _ if row == 0 => continue,
            _ => {
                return Err(parse_error(format!(
                    "row {}: '{}', '{}' is not a number pair",
                    row + 1,
                    &record[0],
                    &record[1]
                )));
            }
        }
    }

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    KnownCompound::from_xy(title, x, y)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn io_error(path: &Path, source: std::io::Error) -> MatchError {
    MatchError::Io {
        path: path.display().to_string(),
        source,
    }
}
