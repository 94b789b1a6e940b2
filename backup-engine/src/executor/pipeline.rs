//! Streaming compression stages.
//!
//! Each pipeline is a single future with a single `io::Result`: a failure in
//! the source, the codec or the sink surfaces through the same channel.
//! `tokio::io::copy` only pulls from the encoder when the sink has accepted the
//! previous chunk, so a slow disk throttles the producer.

use async_compression::tokio::bufread::{GzipDecoder, GzipEncoder};
use async_compression::Level;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Source → gzip (best compression) → `dest`. Returns compressed bytes written.
pub async fn compress_to_file<R>(source: R, dest: &Path) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut encoder = GzipEncoder::with_quality(BufReader::new(source), Level::Best);
    let mut file = File::create(dest).await?;
    let written = tokio::io::copy(&mut encoder, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// Reader over an artifact's logical content, decompressing when needed.
pub async fn open_artifact(
    path: &Path,
    compressed: bool,
) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
    let file = File::open(path).await?;
    if compressed {
        Ok(Box::new(GzipDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

/// Artifact → (gunzip) → `sink`. Returns logical bytes copied.
pub async fn copy_artifact<W>(path: &Path, compressed: bool, sink: &mut W) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut reader = open_artifact(path, compressed).await?;
    let copied = tokio::io::copy(&mut reader, sink).await?;
    sink.flush().await?;
    Ok(copied)
}
