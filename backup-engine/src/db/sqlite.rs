use super::DatabaseHandle;
use anyhow::Context;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled SQLite handle that can be torn down and rebuilt around a restore.
pub struct SqliteHandle {
    path: PathBuf,
    pool: RwLock<Option<DbPool>>,
}

impl SqliteHandle {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let pool = create_pool(&path)?;
        Ok(Self {
            path,
            pool: RwLock::new(Some(pool)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current pool, if connected.
    pub fn pool(&self) -> Option<DbPool> {
        self.pool.read().ok().and_then(|p| p.clone())
    }
}

pub fn create_pool(path: &Path) -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let conn = pool.get()?;
    conn.execute_batch(
        "PRAGMA journal_mode = DELETE;
         PRAGMA synchronous = FULL;
         PRAGMA foreign_keys = ON;",
    )?;

    Ok(pool)
}

impl DatabaseHandle for SqliteHandle {
    fn disconnect(&self) -> anyhow::Result<()> {
        let mut guard = self
            .pool
            .write()
            .map_err(|_| anyhow::anyhow!("pool lock poisoned"))?;
        if let Some(pool) = guard.take() {
            if let Ok(conn) = pool.get() {
                let _ = conn.execute_batch("PRAGMA wal_checkpoint(FULL)");
            }
            // Connections close once the last clone of the pool is dropped.
            drop(pool);
            tracing::debug!(path = %self.path.display(), "SQLite pool closed");
        }
        Ok(())
    }

    fn connect(&self) -> anyhow::Result<()> {
        let mut guard = self
            .pool
            .write()
            .map_err(|_| anyhow::anyhow!("pool lock poisoned"))?;
        if guard.is_none() {
            *guard = Some(create_pool(&self.path)?);
            tracing::debug!(path = %self.path.display(), "SQLite pool reopened");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.read().map(|p| p.is_some()).unwrap_or(false)
    }

    fn execute_raw(&self, sql: &str) -> anyhow::Result<()> {
        let pool = self
            .pool()
            .ok_or_else(|| anyhow::anyhow!("database handle is disconnected"))?;
        let conn = pool.get()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}
