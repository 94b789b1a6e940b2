//! Engine wiring: shared context, the operation lock, and the facade used by
//! the CLI, the HTTP API and the scheduler.

use crate::catalog::BackupCatalog;
use crate::config::{Config, ToolsConfig};
use crate::db::DatabaseHandle;
use crate::events::Notifier;
use crate::executor::progress::ProgressSettings;
use crate::executor::BackupExecutor;
use crate::models::{BackupMetadata, BackupResult, Cadence, RestoreResult};
use crate::restore::RestoreExecutor;
use crate::retention::{RetentionManager, RetentionPolicy, RotationReport};
use crate::source::DataSource;
use crate::utils::{BackupError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Proof that the caller holds the process-wide backup/restore lock.
pub type OperationGuard<'a> = MutexGuard<'a, ()>;

pub struct EngineContext {
    pub backup_dir: PathBuf,
    pub source: DataSource,
    pub tools: ToolsConfig,
    pub catalog: BackupCatalog,
    pub retention: RetentionManager,
    pub notifier: Notifier,
    pub handle: Arc<dyn DatabaseHandle>,
    pub progress: ProgressSettings,
    // Disconnect/reconnect of `handle` is global, so backups and restores
    // never overlap.
    operation_lock: Mutex<()>,
}

impl EngineContext {
    pub fn new(
        backup_dir: impl Into<PathBuf>,
        source: DataSource,
        tools: ToolsConfig,
        policy: RetentionPolicy,
        handle: Arc<dyn DatabaseHandle>,
        notifier: Notifier,
    ) -> Self {
        let backup_dir = backup_dir.into();
        let catalog = BackupCatalog::new(backup_dir.clone());
        Self {
            retention: RetentionManager::new(catalog.clone(), policy),
            catalog,
            backup_dir,
            source,
            tools,
            notifier,
            handle,
            progress: ProgressSettings::default(),
            operation_lock: Mutex::new(()),
        }
    }

    pub async fn lock(&self) -> OperationGuard<'_> {
        self.operation_lock.lock().await
    }
}

#[derive(Clone)]
pub struct BackupEngine {
    ctx: Arc<EngineContext>,
    backups: BackupExecutor,
    restores: RestoreExecutor,
}

impl BackupEngine {
    pub fn new(ctx: EngineContext) -> Self {
        let ctx = Arc::new(ctx);
        let backups = BackupExecutor::new(ctx.clone());
        let restores = RestoreExecutor::new(ctx.clone(), backups.clone());
        Self {
            ctx,
            backups,
            restores,
        }
    }

    /// Build from validated configuration. The backup directory is made
    /// absolute against the current working directory.
    pub fn from_config(
        config: &Config,
        source: DataSource,
        handle: Arc<dyn DatabaseHandle>,
        notifier: Notifier,
    ) -> Self {
        let dir = std::path::absolute(&config.backup.dir).unwrap_or_else(|_| config.backup.dir.clone());
        Self::new(EngineContext::new(
            dir,
            source,
            config.tools.clone(),
            config.retention,
            handle,
            notifier,
        ))
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    pub fn notifier(&self) -> &Notifier {
        &self.ctx.notifier
    }

    pub fn backups(&self) -> &BackupExecutor {
        &self.backups
    }

    pub async fn create(&self, cadence: Cadence) -> BackupResult {
        self.backups.create(cadence).await
    }

    pub async fn restore(&self, filename: &str) -> RestoreResult {
        self.restores.restore(filename).await
    }

    pub async fn list(&self) -> Result<Vec<BackupMetadata>> {
        self.ctx.catalog.list().await
    }

    pub async fn verify(&self, filename: &str) -> Result<bool> {
        let meta = self
            .ctx
            .catalog
            .get(filename)
            .await?
            .ok_or_else(|| BackupError::NotFound(filename.to_string()))?;
        Ok(crate::verify::verify(&meta.filepath).await)
    }

    pub async fn rotate(&self, cadence: Option<Cadence>) -> RotationReport {
        let _guard = self.ctx.lock().await;
        self.ctx.retention.rotate(cadence).await
    }

    pub async fn delete(&self, filename: &str) -> Result<()> {
        let _guard = self.ctx.lock().await;
        self.ctx.catalog.remove(filename).await?;
        tracing::info!("Deleted backup {}", filename);
        Ok(())
    }
}
