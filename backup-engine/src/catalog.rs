//! Backup directory listing.
//!
//! Metadata is rebuilt from filenames and filesystem stats on every call;
//! nothing about an artifact is persisted besides the artifact itself.

use crate::models::backup::{is_artifact_name, is_compressed_name, is_safe_filename};
use crate::models::{BackupMetadata, Cadence};
use crate::utils::{BackupError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BackupCatalog {
    dir: PathBuf,
}

impl BackupCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All artifacts, newest first. A missing directory lists as empty.
    pub async fn list(&self) -> Result<Vec<BackupMetadata>> {
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_artifact_name(&name) {
                continue;
            }
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => {
                    entries.push(self.describe(name, &meta));
                }
                Ok(_) => {}
                Err(e) => debug!("Skipping {}: {}", name, e),
            }
        }

        entries.sort_by(|a, b| {
            b.created
                .cmp(&a.created)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(entries)
    }

    pub async fn get(&self, filename: &str) -> Result<Option<BackupMetadata>> {
        if !is_safe_filename(filename) || !is_artifact_name(filename) {
            return Ok(None);
        }
        match tokio::fs::metadata(self.dir.join(filename)).await {
            Ok(meta) if meta.is_file() => Ok(Some(self.describe(filename.to_string(), &meta))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Explicit deletion of one artifact.
    pub async fn remove(&self, filename: &str) -> Result<()> {
        if self.get(filename).await?.is_none() {
            return Err(BackupError::NotFound(filename.to_string()));
        }
        tokio::fs::remove_file(self.dir.join(filename)).await?;
        Ok(())
    }

    fn describe(&self, filename: String, meta: &std::fs::Metadata) -> BackupMetadata {
        let created: DateTime<Utc> = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let filepath = self.dir.join(&filename);
        let filepath = std::path::absolute(&filepath).unwrap_or(filepath);

        BackupMetadata {
            cadence: Cadence::from_filename(&filename),
            compressed: is_compressed_name(&filename),
            filepath,
            size: meta.len(),
            created,
            verified: false,
            filename,
        }
    }
}
