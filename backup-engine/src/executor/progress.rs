//! Artifact growth monitor.
//!
//! Polls the size of the file being written and emits `backup:progress` when
//! it has grown enough since the last report. The task owns a cancellation
//! token and is stopped by consuming the monitor, so each run stops it once.

use crate::events::{BackupEvent, Notifier};
use crate::utils::format::format_bytes;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct ProgressSettings {
    /// Quiet period before the first poll; tiny initial writes are noise.
    pub grace: Duration,
    pub interval: Duration,
    /// Minimum growth (bytes) between two reports.
    pub threshold: u64,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(500),
            interval: Duration::from_secs(1),
            threshold: 1024,
        }
    }
}

pub struct ProgressMonitor {
    cancel: CancellationToken,
    handle: JoinHandle<usize>,
}

impl ProgressMonitor {
    pub fn spawn(
        path: PathBuf,
        filename: String,
        notifier: Notifier,
        settings: ProgressSettings,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut reports = 0usize;

            tokio::select! {
                _ = token.cancelled() => return reports,
                _ = tokio::time::sleep(settings.grace) => {}
            }

            let mut interval = tokio::time::interval(settings.interval);
            let mut last_reported = 0u64;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let size = match tokio::fs::metadata(&path).await {
                    Ok(meta) => meta.len(),
                    Err(_) => continue,
                };

                if size.saturating_sub(last_reported) > settings.threshold {
                    last_reported = size;
                    reports += 1;
                    notifier.emit(BackupEvent::Progress {
                        filename: filename.clone(),
                        size_text: format_bytes(size),
                        status: "in_progress".to_string(),
                    });
                }
            }

            reports
        });

        Self { cancel, handle }
    }

    /// Cancel the poller and wait for it to exit. Returns the number of
    /// progress events it emitted.
    pub async fn stop(self) -> usize {
        self.cancel.cancel();
        self.handle.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fast() -> ProgressSettings {
        ProgressSettings {
            grace: Duration::from_millis(10),
            interval: Duration::from_millis(20),
            threshold: 1024,
        }
    }

    #[tokio::test]
    async fn test_reports_growth_above_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("growing.sql.gz");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let monitor = ProgressMonitor::spawn(path, "growing.sql.gz".into(), notifier, fast());

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            BackupEvent::Progress { size_text, status, .. } => {
                assert_eq!(size_text, "4.00 KB");
                assert_eq!(status, "in_progress");
            }
            other => panic!("unexpected event {:?}", other),
        }

        // No further growth, so no further reports.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(monitor.stop().await, 1);
    }

    #[tokio::test]
    async fn test_small_growth_is_silent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.sql.gz");
        std::fs::write(&path, vec![0u8; 100]).unwrap();

        let monitor = ProgressMonitor::spawn(path, "tiny.sql.gz".into(), Notifier::new(), fast());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(monitor.stop().await, 0);
    }

    #[tokio::test]
    async fn test_stop_during_grace() {
        let dir = TempDir::new().unwrap();
        let monitor = ProgressMonitor::spawn(
            dir.path().join("x"),
            "x".into(),
            Notifier::new(),
            ProgressSettings::default(),
        );
        let stopped = tokio::time::timeout(Duration::from_millis(200), monitor.stop()).await;
        assert_eq!(stopped.unwrap(), 0);
    }
}
