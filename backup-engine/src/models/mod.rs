pub mod backup;
pub mod cadence;

pub use backup::{BackupMetadata, BackupResult, RestoreResult};
pub use cadence::Cadence;
