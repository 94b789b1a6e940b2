//! Error taxonomy for backup and restore operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot create backup directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed: {message}")]
    Process { program: String, message: String },

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Backup not found: {0}")]
    NotFound(String),

    #[error("Database handle error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Short machine-readable kind, used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            BackupError::Configuration(_) => "ConfigurationError",
            BackupError::Directory { .. } => "DirectoryError",
            BackupError::Process { .. } => "ProcessError",
            BackupError::Integrity(_) => "IntegrityError",
            BackupError::NotFound(_) => "NotFoundError",
            BackupError::Database(_) => "DatabaseError",
            BackupError::Io(_) => "IoError",
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
