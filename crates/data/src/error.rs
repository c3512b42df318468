use std::path::PathBuf;
use thiserror::Error;

/// Errors from the prediction store.
///
/// A missing log file is not an error; it reads as an empty store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The log exists but could not be opened or read (permissions, a directory, ...).
    #[error("prediction log {path} exists but cannot be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error while reading or writing the log.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
