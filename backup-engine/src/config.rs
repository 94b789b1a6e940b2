//! Configuration management for the backup engine.
//!
//! Loads configuration from a TOML file, then applies environment variable
//! overrides (a `.env` file is honoured). Everything environment-dependent is
//! resolved here once and injected from then on.

use crate::retention::RetentionPolicy;
use crate::source::DataSource;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub retention: RetentionPolicy,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string (postgres://...) or SQLite file path
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory holding backup artifacts
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Enables the automatic nightly schedule
    #[serde(default)]
    pub production: bool,

    /// Local time of day for scheduled backups, "HH:MM"
    #[serde(default = "default_schedule_time")]
    pub schedule_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Program that writes a plain SQL dump to stdout
    #[serde(default = "default_pg_dump")]
    pub pg_dump: String,

    /// Program that applies SQL read from stdin
    #[serde(default = "default_psql")]
    pub psql: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_schedule_time() -> String {
    "02:00".to_string()
}

fn default_pg_dump() -> String {
    "pg_dump".to_string()
}

fn default_psql() -> String {
    "psql".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            production: false,
            schedule_time: default_schedule_time(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pg_dump: default_pg_dump(),
            psql: default_psql(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            backup: BackupConfig::default(),
            retention: RetentionPolicy::default(),
            tools: ToolsConfig::default(),
            server: ServerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// File (if given) plus environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(dir) = var("BACKUP_DIR") {
            self.backup.dir = PathBuf::from(dir);
        }
        if var("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")) {
            self.backup.production = true;
        }
        if let Some(flag) = var("BACKUP_PRODUCTION") {
            self.backup.production = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(at) = var("BACKUP_SCHEDULE_TIME") {
            self.backup.schedule_time = at;
        }
        if let Some(n) = quota_override(&var, "BACKUP_KEEP_DAILY") {
            self.retention.daily = n;
        }
        if let Some(n) = quota_override(&var, "BACKUP_KEEP_WEEKLY") {
            self.retention.weekly = n;
        }
        if let Some(n) = quota_override(&var, "BACKUP_KEEP_MONTHLY") {
            self.retention.monthly = n;
        }
        if let Some(p) = var("PG_DUMP_PATH") {
            self.tools.pg_dump = p;
        }
        if let Some(p) = var("PSQL_PATH") {
            self.tools.psql = p;
        }
        if let Some(port) = var("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log.level = level;
        }
    }

    /// Parse the locator and schedule once, failing fast on malformed values.
    pub fn validate(&self) -> anyhow::Result<(DataSource, NaiveTime)> {
        let source = DataSource::parse(&self.database.url)?;
        let at = self.schedule_time()?;
        Ok((source, at))
    }

    pub fn schedule_time(&self) -> anyhow::Result<NaiveTime> {
        NaiveTime::parse_from_str(self.backup.schedule_time.trim(), "%H:%M").map_err(|e| {
            anyhow::anyhow!(
                "invalid schedule_time '{}': {}",
                self.backup.schedule_time,
                e
            )
        })
    }
}

fn quota_override<F>(var: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a whole number, keeping configured quota", key, raw);
            None
        }
    }
}
