use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse record in line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read events from {path:?}")]
    Input {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid binning `{0}`: expected `nbins,min,max` with nbins > 0 and min < max")]
    InvalidBinning(String),

    #[error("Histogram binnings differ")]
    BinningMismatch,

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("No input samples")]
    NoSamples,
}

pub type Result<T> = std::result::Result<T, Error>;
