//! Backup executor - produces one compressed, verified snapshot.
//!
//! Flow for a single run:
//! - ensure the backup directory and pick a unique filename
//! - stream the snapshot (pg_dump stdout, or an online SQLite copy) through
//!   gzip into the artifact while a poller reports growth
//! - verify the artifact, emit completion, rotate that cadence family

pub mod pipeline;
pub mod process;
pub mod progress;

use crate::engine::{EngineContext, OperationGuard};
use crate::events::BackupEvent;
use crate::models::backup::artifact_filename;
use crate::models::{BackupMetadata, BackupResult, Cadence};
use crate::source::{DataSource, PgParams};
use crate::utils::format::{format_bytes, format_elapsed};
use crate::utils::{BackupError, Result};
use chrono::{DateTime, Utc};
use pipeline::compress_to_file;
use progress::ProgressMonitor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct BackupExecutor {
    ctx: Arc<EngineContext>,
}

impl BackupExecutor {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Run one backup. Never fails: errors come back inside the result.
    pub async fn create(&self, cadence: Cadence) -> BackupResult {
        let guard = self.ctx.lock().await;
        self.create_locked(cadence, &guard).await
    }

    /// Same as [`BackupExecutor::create`] for callers already holding the
    /// operation lock (the restore's safety backup).
    pub(crate) async fn create_locked(
        &self,
        cadence: Cadence,
        _guard: &OperationGuard<'_>,
    ) -> BackupResult {
        let started = std::time::Instant::now();
        let filename = self.next_filename(cadence);

        match self.run(cadence, &filename).await {
            Ok(metadata) => {
                info!(
                    cadence = %cadence,
                    verified = metadata.verified,
                    "Backup created: {} ({}) in {}",
                    metadata.filename,
                    format_bytes(metadata.size),
                    format_elapsed(started.elapsed())
                );

                let report = self.ctx.retention.rotate(Some(cadence)).await;
                if !report.failed.is_empty() {
                    warn!(
                        cadence = %cadence,
                        "Retention left {} artifact(s) behind",
                        report.failed.len()
                    );
                }

                BackupResult::ok(metadata)
            }
            Err(e) => {
                error!(cadence = %cadence, "Backup {} failed: {}", filename, e);
                self.ctx.notifier.emit(BackupEvent::Error {
                    filename,
                    error: e.to_string(),
                });
                BackupResult::failed(e)
            }
        }
    }

    async fn run(&self, cadence: Cadence, filename: &str) -> Result<BackupMetadata> {
        let dir = &self.ctx.backup_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| BackupError::Directory {
                path: dir.display().to_string(),
                source,
            })?;

        let dest = dir.join(filename);
        self.ctx.notifier.emit(BackupEvent::Started {
            filename: filename.to_string(),
            cadence,
        });

        let monitor = ProgressMonitor::spawn(
            dest.clone(),
            filename.to_string(),
            self.ctx.notifier.clone(),
            self.ctx.progress,
        );
        let outcome = match &self.ctx.source {
            DataSource::Postgres(pg) => self.dump_postgres(pg, &dest).await,
            DataSource::Sqlite { path } => self.dump_sqlite(path, &dest).await,
        };
        monitor.stop().await;

        if let Err(e) = outcome {
            if let Err(rm) = tokio::fs::remove_file(&dest).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove partial artifact {}: {}", dest.display(), rm);
                }
            }
            return Err(e);
        }

        let stat = tokio::fs::metadata(&dest).await?;
        let verified = crate::verify::verify(&dest).await;
        if !verified {
            warn!("Backup {} did not pass the integrity probe", filename);
        }

        let metadata = BackupMetadata {
            filename: filename.to_string(),
            filepath: dest,
            size: stat.len(),
            created: Utc::now(),
            cadence,
            compressed: true,
            verified,
        };

        self.ctx.notifier.emit(BackupEvent::Completed {
            filename: metadata.filename.clone(),
            size_text: format_bytes(metadata.size),
            cadence,
            verified,
        });

        Ok(metadata)
    }

    /// Millisecond timestamps; a clash with an existing artifact (only
    /// possible for back-to-back runs under the lock) moves forward 1ms.
    fn next_filename(&self, cadence: Cadence) -> String {
        let ext = self.ctx.source.artifact_extension();
        let mut at: DateTime<Utc> = Utc::now();
        loop {
            let name = artifact_filename(cadence, at, ext);
            if !self.ctx.backup_dir.join(&name).exists() {
                return name;
            }
            at += chrono::Duration::milliseconds(1);
        }
    }

    async fn dump_postgres(&self, pg: &PgParams, dest: &Path) -> Result<()> {
        let program = &self.ctx.tools.pg_dump;
        let mut child = Command::new(program)
            .args(["--clean", "--if-exists", "--no-owner", "--no-privileges", "--format=plain"])
            .args(pg.connection_args())
            .envs(pg.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| process::spawn_failed(program, e))?;

        let stderr = process::collect_stderr(child.stderr.take());
        let stdout = child.stdout.take().ok_or_else(|| BackupError::Process {
            program: program.clone(),
            message: "stdout was not captured".to_string(),
        })?;

        if let Err(sink_error) = compress_to_file(stdout, dest).await {
            // The kill status would mask the real cause.
            let _ = child.start_kill();
            let _ = child.wait().await;
            let _ = stderr.await;
            return Err(sink_error.into());
        }

        let status = child.wait().await?;
        let diagnostics = stderr.await.unwrap_or_default();
        if !status.success() {
            return Err(process::exit_failure(program, status, &diagnostics));
        }
        if !diagnostics.is_empty() {
            info!("{}: {}", program, diagnostics);
        }
        Ok(())
    }

    /// Online copy of the live database into a scratch file, then through the
    /// same compression pipeline.
    async fn dump_sqlite(&self, db_path: &Path, dest: &Path) -> Result<()> {
        if let Err(e) = self.ctx.handle.execute_raw("PRAGMA wal_checkpoint(FULL)") {
            warn!("Checkpoint before backup failed: {}", e);
        }

        let snapshot = snapshot_path(dest);
        let source = db_path.to_path_buf();
        let target = snapshot.clone();
        let copied = tokio::task::spawn_blocking(move || snapshot_sqlite(&source, &target))
            .await
            .map_err(|e| BackupError::Database(format!("snapshot task panicked: {}", e)))?;

        let result = match copied {
            Ok(()) => match tokio::fs::File::open(&snapshot).await {
                Ok(file) => compress_to_file(file, dest).await.map(|_| ()).map_err(Into::into),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };

        let _ = tokio::fs::remove_file(&snapshot).await;
        result
    }
}

/// Hidden scratch name next to the artifact; the catalog ignores it.
fn snapshot_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.snapshot", name))
}

fn snapshot_sqlite(source: &Path, target: &Path) -> Result<()> {
    use rusqlite::{Connection, DatabaseName, OpenFlags};

    let conn = Connection::open_with_flags(
        source,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| BackupError::Database(format!("cannot open {}: {}", source.display(), e)))?;

    conn.backup(DatabaseName::Main, target, None)
        .map_err(|e| BackupError::Database(format!("snapshot of {} failed: {}", source.display(), e)))
}
