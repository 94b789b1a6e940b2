//! Nightly backup schedule.
//!
//! One backup per day at a fixed local time. The cadence follows the calendar:
//! the 1st of the month is monthly, other Sundays are weekly, everything else
//! is daily. A failed run is logged and the next one is scheduled regardless.

use crate::engine::BackupEngine;
use crate::models::Cadence;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Weekday};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct BackupScheduler {
    engine: BackupEngine,
    at: NaiveTime,
    production: bool,
}

impl BackupScheduler {
    pub fn new(engine: BackupEngine, at: NaiveTime, production: bool) -> Self {
        Self {
            engine,
            at,
            production,
        }
    }

    /// Spawn the schedule loop. Outside production mode nothing is spawned.
    pub fn start(self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.production {
            info!("Backup schedule disabled (not in production mode)");
            return None;
        }

        Some(tokio::spawn(async move {
            loop {
                let now = Local::now();
                let next = next_trigger(&now, self.at);
                let delay = (next.clone() - now).to_std().unwrap_or_default();
                info!("Next scheduled backup at {}", next.format("%Y-%m-%d %H:%M %Z"));

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                let cadence = cadence_for(next.date_naive());
                info!(cadence = %cadence, "Starting scheduled backup");
                let result = self.engine.create(cadence).await;
                match (&result.metadata, &result.error) {
                    (Some(meta), _) if result.success => {
                        info!(cadence = %cadence, "Scheduled backup finished: {}", meta.filename)
                    }
                    (_, Some(e)) => error!(cadence = %cadence, "Scheduled backup failed: {}", e),
                    _ => warn!(cadence = %cadence, "Scheduled backup returned no result"),
                }
            }
            info!("Backup scheduler stopped");
        }))
    }
}

/// The next instant at local time-of-day `at` strictly after `now`.
///
/// If `at` does not exist on a day (DST gap) the first valid day after it is
/// used; on an ambiguous day the earlier instant wins.
pub fn next_trigger<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    loop {
        if let Some(candidate) = tz.from_local_datetime(&day.and_time(at)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        day = day.succ_opt().unwrap_or(day + Duration::days(1));
    }
}

pub fn cadence_for(date: NaiveDate) -> Cadence {
    if date.day() == 1 {
        Cadence::Monthly
    } else if date.weekday() == Weekday::Sun {
        Cadence::Weekly
    } else {
        Cadence::Daily
    }
}
