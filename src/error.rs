use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::DatasetKind;

/// Error type for ingestion, analysis and output failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input directory '{}' for {kind} data does not exist", path.display())]
    MissingInputDir { kind: DatasetKind, path: PathBuf },
    #[error("no CSV files found in '{}' for {kind} data", path.display())]
    NoInputFiles { kind: DatasetKind, path: PathBuf },
    #[error("file '{}' is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("insufficient history to forecast {kind} demand: the daily series is empty")]
    InsufficientHistory { kind: DatasetKind },
    #[error("forecast horizon of {horizon} days for {kind} data runs past the last representable date")]
    HorizonOutOfRange { kind: DatasetKind, horizon: usize },
    #[error("csv error in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    CsvWrite(#[from] csv::Error),
}

impl PipelineError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
