//! Cheap integrity probe for backup artifacts.
//!
//! Only the first kilobyte of a compressed artifact is pushed through the
//! decoder. This catches wrong formats, empty dumps and truncated headers; it
//! does not validate the full stream or the dump's contents.

use crate::models::backup::is_compressed_name;
use async_compression::tokio::bufread::GzipDecoder;
use std::path::Path;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::debug;

const PROBE_BYTES: u64 = 1024;

pub async fn verify(path: &Path) -> bool {
    let compressed = path
        .file_name()
        .map(|n| is_compressed_name(&n.to_string_lossy()))
        .unwrap_or(false);

    let result = if compressed {
        probe_compressed(path).await
    } else {
        probe_readable(path).await
    };

    match result {
        Ok(ok) => ok,
        Err(e) => {
            debug!("Integrity probe failed for {}: {}", path.display(), e);
            false
        }
    }
}

async fn probe_compressed(path: &Path) -> std::io::Result<bool> {
    let file = tokio::fs::File::open(path).await?;
    let mut decoder = GzipDecoder::new(BufReader::new(file.take(PROBE_BYTES)));
    let mut buf = [0u8; 256];
    let n = decoder.read(&mut buf).await?;
    Ok(n > 0)
}

async fn probe_readable(path: &Path) -> std::io::Result<bool> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = [0u8; 1];
    file.read(&mut buf).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::write::GzipEncoder;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    async fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzipEncoder::new(Vec::new());
        encoder.write_all(data).await.unwrap();
        encoder.shutdown().await.unwrap();
        encoder.into_inner()
    }

    #[tokio::test]
    async fn test_well_formed_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup-manual-a.sql.gz");
        let payload = "INSERT INTO t VALUES (1);\n".repeat(500);
        std::fs::write(&path, gzip(payload.as_bytes()).await).unwrap();
        assert!(verify(&path).await);
    }

    #[tokio::test]
    async fn test_truncated_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup-manual-a.sql.gz");
        let full = gzip(b"CREATE TABLE t (id int);\n").await;
        // Header only: no deflate data left to produce output.
        std::fs::write(&path, &full[..10]).unwrap();
        assert!(!verify(&path).await);
    }

    #[tokio::test]
    async fn test_corrupted_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup-manual-a.sql.gz");
        std::fs::write(&path, b"this was never gzip data at all").unwrap();
        assert!(!verify(&path).await);
    }

    #[tokio::test]
    async fn test_empty_stream_is_not_verified() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup-manual-a.sql.gz");
        std::fs::write(&path, gzip(b"").await).unwrap();
        assert!(!verify(&path).await);
    }

    #[tokio::test]
    async fn test_uncompressed_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup-manual-a.sql");
        std::fs::write(&path, b"-- dump").unwrap();
        assert!(verify(&path).await);
        assert!(!verify(&dir.path().join("backup-manual-missing.sql")).await);
    }
}
