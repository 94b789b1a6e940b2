//! Per-cadence retention.

use crate::catalog::BackupCatalog;
use crate::models::{BackupMetadata, Cadence};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// How many artifacts to keep for each rotated cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    #[serde(default = "default_daily")]
    pub daily: usize,
    #[serde(default = "default_weekly")]
    pub weekly: usize,
    #[serde(default = "default_monthly")]
    pub monthly: usize,
}

fn default_daily() -> usize {
    7
}

fn default_weekly() -> usize {
    4
}

fn default_monthly() -> usize {
    12
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            daily: default_daily(),
            weekly: default_weekly(),
            monthly: default_monthly(),
        }
    }
}

impl RetentionPolicy {
    /// `None` for manual backups, which are never rotated.
    pub fn quota(&self, cadence: Cadence) -> Option<usize> {
        if !cadence.is_rotated() {
            return None;
        }
        match cadence {
            Cadence::Daily => Some(self.daily),
            Cadence::Weekly => Some(self.weekly),
            Cadence::Monthly => Some(self.monthly),
            Cadence::Manual => None,
        }
    }
}

/// Outcome of one rotation pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RotationReport {
    pub deleted: Vec<String>,
    pub failed: Vec<RotationFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RotationFailure {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RetentionManager {
    catalog: BackupCatalog,
    policy: RetentionPolicy,
}

impl RetentionManager {
    pub fn new(catalog: BackupCatalog, policy: RetentionPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Delete artifacts beyond each cadence's quota, oldest first.
    ///
    /// With `only` set, just that cadence family is considered. Never fails:
    /// listing and deletion errors are logged and land in the report.
    pub async fn rotate(&self, only: Option<Cadence>) -> RotationReport {
        let mut report = RotationReport::default();

        let entries = match self.catalog.list().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Retention skipped, cannot list backups: {}", e);
                report.failed.push(RotationFailure {
                    filename: self.catalog.dir().display().to_string(),
                    reason: e.to_string(),
                });
                return report;
            }
        };

        let mut groups: BTreeMap<Cadence, Vec<BackupMetadata>> = BTreeMap::new();
        for entry in entries {
            if only.is_some_and(|c| c != entry.cadence) {
                continue;
            }
            groups.entry(entry.cadence).or_default().push(entry);
        }

        for (cadence, mut group) in groups {
            let Some(quota) = self.policy.quota(cadence) else {
                continue;
            };
            if group.len() <= quota {
                continue;
            }

            group.sort_by(|a, b| {
                b.created
                    .cmp(&a.created)
                    .then_with(|| b.filename.cmp(&a.filename))
            });

            for stale in group.into_iter().skip(quota) {
                match tokio::fs::remove_file(&stale.filepath).await {
                    Ok(()) => {
                        info!(cadence = %cadence, "Removed old backup: {}", stale.filename);
                        report.deleted.push(stale.filename);
                    }
                    Err(e) => {
                        warn!(cadence = %cadence, "Failed to remove {}: {}", stale.filename, e);
                        report.failed.push(RotationFailure {
                            filename: stale.filename,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        report
    }
}
