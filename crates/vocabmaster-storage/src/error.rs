//! Error taxonomy for the storage layer.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// In-memory records failed validation; nothing was written.
    #[error("{0}")]
    Validation(String),

    #[error("Backup file does not exist: {}", .0.display())]
    BackupNotFound(PathBuf),

    #[error("Backup {} is unusable: {reason}", path.display())]
    BackupCorrupt { path: PathBuf, reason: String },

    /// A migration aborted before writing any output.
    #[error("Cannot migrate {}: {reason}", path.display())]
    FormatMigration { path: PathBuf, reason: String },

    #[error("Invalid language name {name:?}: {reason}")]
    InvalidLanguageName { name: String, reason: String },

    #[error("Missing required columns in {}: {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: Box<csv::Error>,
    },
}

impl StorageError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path) -> impl FnOnce(csv::Error) -> Self + '_ {
        move |source| StorageError::Csv {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// True when the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::BackupNotFound(_) => true,
            StorageError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
