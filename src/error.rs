use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Confidence undefined for '{title}': compound has no detected peaks")]
    DivisionUndefined { title: String },

    #[error("Worker for compound #{index} ('{title}') failed: {source}")]
    WorkerFailure {
        index: usize,
        title: String,
        #[source]
        source: Box<MatchError>,
    },

    #[error("Numeric failure: {0}")]
    Numeric(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MatchError>;
