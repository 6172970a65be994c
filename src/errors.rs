use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::SampleRole;

/// Every failure is fatal to the run; nothing is retried.
#[derive(Debug, Error)]
pub enum QcError {
    #[error("input does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{0}")]
    Validation(String),
    #[error("Not a valid Sanger Variant Call result archive: {}: {reason}", .path.display())]
    InvalidArchive { path: PathBuf, reason: String },
    #[error("Missing BAS files for {role} samples: {}", .samples.join(", "))]
    MissingSample {
        role: SampleRole,
        samples: Vec<String>,
    },
    #[error("duplicated sample '{sample}' in {kind} files {} and {}", .first.display(), .second.display())]
    DuplicateSample {
        kind: String,
        sample: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("tumour/normal pair {pair} is produced by both {} and {}", .first.display(), .second.display())]
    DuplicatePair {
        pair: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("existing output file: {}", .0.display())]
    OutputExists(PathBuf),
    #[error("output is not writable: {}: {source}", .path.display())]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not remove placeholder {}, delete it before running again: {source}", .path.display())]
    PlaceholderLeft {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to extract metrics for {pair}: {reason}")]
    Extraction { pair: String, reason: String },
    #[error("failed to create the final output: {0}")]
    Packaging(#[source] io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, QcError>;
