//! Shared database-handle collaborator.
//!
//! The host application owns one process-wide handle. Restores disconnect it
//! to release locks and reconnect it afterwards; backups only read through it.

pub mod sqlite;

pub use sqlite::SqliteHandle;

/// Connection lifecycle of the host application's database handle.
pub trait DatabaseHandle: Send + Sync {
    fn disconnect(&self) -> anyhow::Result<()>;

    fn connect(&self) -> anyhow::Result<()>;

    fn is_connected(&self) -> bool;

    /// Run a raw statement (checkpoints before dumping, session cleanup).
    /// Handles without a raw channel accept and ignore it.
    fn execute_raw(&self, _sql: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handle for hosts that keep no pool of their own (e.g. the CLI against a
/// PostgreSQL server). Tracks the connected flag only.
#[derive(Debug)]
pub struct DetachedHandle {
    connected: std::sync::atomic::AtomicBool,
}

impl DetachedHandle {
    pub fn new() -> Self {
        Self {
            connected: std::sync::atomic::AtomicBool::new(true),
        }
    }
}

impl Default for DetachedHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseHandle for DetachedHandle {
    fn disconnect(&self) -> anyhow::Result<()> {
        self.connected.store(false, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn connect(&self) -> anyhow::Result<()> {
        self.connected.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_handle_tracks_state() {
        let handle = DetachedHandle::new();
        assert!(handle.is_connected());
        handle.disconnect().unwrap();
        assert!(!handle.is_connected());
        handle.execute_raw("SELECT 1").unwrap();
        handle.connect().unwrap();
        assert!(handle.is_connected());
    }
}
