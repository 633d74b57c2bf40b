use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Hard failures of the persistence layer. Per-line problems inside a record
/// or index file are logged and skipped instead.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no player named {name} in the index")]
    NotFound { name: String },
    #[error("invalid player name {name:?}")]
    InvalidName { name: String },
    #[error("failed to open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove {path}: {source}")]
    FileRemove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
