use crate::models::Cadence;
use crate::utils::BackupError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::path::PathBuf;

pub const FILENAME_PREFIX: &str = "backup-";
pub const COMPRESSED_SUFFIX: &str = ".gz";

/// Raw artifact extensions, one per storage engine.
pub const RAW_EXTENSIONS: &[&str] = &["sql", "db"];

/// Immutable description of one backup artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub filename: String,
    pub filepath: PathBuf,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub cadence: Cadence,
    pub compressed: bool,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BackupMetadata>,
    #[serde(serialize_with = "serialize_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<BackupError>,
}

impl BackupResult {
    pub fn ok(metadata: BackupMetadata) -> Self {
        Self {
            success: true,
            metadata: Some(metadata),
            error: None,
        }
    }

    pub fn failed(error: BackupError) -> Self {
        Self {
            success: false,
            metadata: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResult {
    pub success: bool,
    pub restored_from: String,
    #[serde(serialize_with = "serialize_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<BackupError>,
    /// Filename of the manual backup taken before the restore touched anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_backup: Option<String>,
    /// Best-effort steps that failed without aborting the restore.
    pub diagnostics: Vec<String>,
}

impl RestoreResult {
    pub fn failed(restored_from: &str, error: BackupError) -> Self {
        Self {
            success: false,
            restored_from: restored_from.to_string(),
            error: Some(error),
            safety_backup: None,
            diagnostics: Vec::new(),
        }
    }
}

fn serialize_error<S: Serializer>(error: &Option<BackupError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_str(&e.to_string()),
        None => s.serialize_none(),
    }
}

/// Filesystem-safe form of an ISO-8601 instant: colons and dots become hyphens.
pub fn filename_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// `backup-<cadence>-<timestamp>.<ext>.gz`
pub fn artifact_filename(cadence: Cadence, at: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{}{}-{}.{}{}",
        FILENAME_PREFIX,
        cadence,
        filename_timestamp(at),
        extension,
        COMPRESSED_SUFFIX
    )
}

/// Whether a directory entry name looks like one of our artifacts.
pub fn is_artifact_name(name: &str) -> bool {
    if !name.starts_with(FILENAME_PREFIX) {
        return false;
    }
    let raw = name.strip_suffix(COMPRESSED_SUFFIX).unwrap_or(name);
    RAW_EXTENSIONS
        .iter()
        .any(|ext| raw.ends_with(&format!(".{}", ext)))
}

pub fn is_compressed_name(name: &str) -> bool {
    name.ends_with(COMPRESSED_SUFFIX)
}

/// Artifact names are plain filenames; anything that could escape the backup
/// directory is rejected.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}
