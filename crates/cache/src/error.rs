use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid JSON in {path}: {source}")]
    JsonError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid data path: {0}")]
    InvalidPath(String),

    #[error("Watcher error: {0}")]
    WatcherError(String),

    #[error("{0}")]
    Other(String),
}

impl From<notify::Error> for CacheError {
    fn from(err: notify::Error) -> Self {
        Self::WatcherError(err.to_string())
    }
}
