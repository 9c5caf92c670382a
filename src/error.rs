use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Everything that can stop the invoice table from being built.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("worker count must be at least 1, got {0}")]
    Partition(usize),

    #[error("failed to parse {}{}: {source}", path.display(), line_suffix(*line))]
    Parse {
        path: PathBuf,
        line: Option<u64>,
        #[source]
        source: csv::Error,
    },

    #[error("{} line {line}: expected {expected} columns, found {found}", path.display())]
    ColumnCount {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("file name of {} contains no digits to derive a record id from", path.display())]
    MissingRecordId { path: PathBuf },

    #[error("invalid {column} {value:?} in {} line {line}", path.display())]
    Conversion {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error(
        "record id {record_id} is derived from both {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateKey {
        record_id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{} file(s) failed to load: {}", .0.len(), summarize(.0))]
    Workers(Vec<LoadError>),

    #[error("worker for chunk {chunk} panicked: {message}")]
    WorkerPanicked {
        chunk: usize,
        message: String,
    },

    #[error("load did not finish within {0:?}")]
    Timeout(Duration),

    #[error("worker channel closed with {missing} chunk(s) unreported")]
    Disconnected { missing: usize },

    #[error("building worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid file pattern")]
    Pattern(#[from] glob::PatternError),

    #[error("listing input files")]
    Discovery(#[from] glob::GlobError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// The input file this error points at, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            LoadError::Parse { path, .. }
            | LoadError::ColumnCount { path, .. }
            | LoadError::MissingRecordId { path }
            | LoadError::Conversion { path, .. }
            | LoadError::Io { path, .. } => Some(path),
            LoadError::DuplicateKey { second, .. } => Some(second),
            _ => None,
        }
    }
}

fn line_suffix(line: Option<u64>) -> String {
    line.map(|l| format!(" line {}", l)).unwrap_or_default()
}

fn summarize(errors: &[LoadError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure while writing one report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
