//! Backup & Restore Engine
//!
//! Point-in-time snapshots of a PostgreSQL or SQLite database as gzip
//! artifacts, with integrity probing, per-cadence retention, a nightly
//! schedule and guarded restore.

pub mod api;
pub mod catalog;
pub mod config;
pub mod daemon;
pub mod db;
pub mod engine;
pub mod events;
pub mod executor;
pub mod models;
pub mod restore;
pub mod retention;
pub mod scheduler;
pub mod source;
pub mod utils;
pub mod verify;

// Re-export commonly used types
pub use config::Config;
pub use engine::{BackupEngine, EngineContext};
pub use models::{BackupMetadata, BackupResult, Cadence, RestoreResult};
pub use retention::{RetentionPolicy, RotationReport};
pub use source::DataSource;
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
