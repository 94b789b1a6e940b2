//! Data-source locator parsing.
//!
//! A single locator string names the live database: a `postgres://` URL for
//! the process engine (dumped and restored through external tools), or a
//! file path for the embedded SQLite engine.

use crate::utils::{BackupError, Result};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::{Host, Url};

const DEFAULT_PG_PORT: u16 = 5432;
const DEFAULT_PG_USER: &str = "postgres";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub sslmode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Postgres(PgParams),
    Sqlite { path: PathBuf },
}

impl DataSource {
    pub fn parse(locator: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(BackupError::Configuration(
                "database locator is empty".to_string(),
            ));
        }

        if let Some(path) =
            strip_scheme(locator, "sqlite://").or_else(|| strip_scheme(locator, "file:"))
        {
            let path = path.split(['?', '#']).next().unwrap_or_default();
            if path.is_empty() {
                return Err(BackupError::Configuration(format!(
                    "sqlite locator has no path: {}",
                    locator
                )));
            }
            return Ok(DataSource::Sqlite {
                path: PathBuf::from(path),
            });
        }

        if locator.contains("://") {
            let url = Url::parse(locator).map_err(|e| {
                BackupError::Configuration(format!(
                    "malformed database locator '{}': {}",
                    redact(locator),
                    e
                ))
            })?;
            return match url.scheme() {
                "postgres" | "postgresql" => parse_postgres(&url).map(DataSource::Postgres),
                other => Err(BackupError::Configuration(format!(
                    "unsupported database scheme '{}'",
                    other
                ))),
            };
        }

        let is_sqlite_file = Path::new(locator)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e, "db" | "sqlite" | "sqlite3"))
            .unwrap_or(false);
        if is_sqlite_file {
            return Ok(DataSource::Sqlite {
                path: PathBuf::from(locator),
            });
        }

        Err(BackupError::Configuration(format!(
            "cannot determine storage engine for '{}'",
            locator
        )))
    }

    /// Raw extension of artifacts produced for this engine.
    pub fn artifact_extension(&self) -> &'static str {
        match self {
            DataSource::Postgres(_) => "sql",
            DataSource::Sqlite { .. } => "db",
        }
    }

    pub fn engine_name(&self) -> &'static str {
        match self {
            DataSource::Postgres(_) => "postgres",
            DataSource::Sqlite { .. } => "sqlite",
        }
    }
}

impl PgParams {
    /// Connection arguments shared by the dump and restore tools. The password
    /// never appears here; see [`PgParams::env`].
    pub fn connection_args(&self) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
            "-U".to_string(),
            self.user.clone(),
            "-d".to_string(),
            self.database.clone(),
        ]
    }

    /// Settings passed to the tools through the environment.
    pub fn env(&self) -> Vec<(&'static str, String)> {
        let mut env = Vec::new();
        if let Some(pw) = &self.password {
            env.push(("PGPASSWORD", pw.clone()));
        }
        if let Some(mode) = &self.sslmode {
            env.push(("PGSSLMODE", mode.clone()));
        }
        env
    }
}

/// Case-insensitive scheme prefix match.
fn strip_scheme<'a>(locator: &'a str, prefix: &str) -> Option<&'a str> {
    locator
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &locator[prefix.len()..])
}

fn decode(component: &str) -> Result<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| BackupError::Configuration("locator is not valid UTF-8".to_string()))
}

/// libpq-style URL: query parameters override the authority and path.
fn parse_postgres(url: &Url) -> Result<PgParams> {
    let malformed = |why: &str| {
        BackupError::Configuration(format!("malformed postgres connection string: {}", why))
    };

    let mut host = match url.host() {
        Some(Host::Domain(domain)) => Some(decode(domain)?),
        Some(Host::Ipv4(addr)) => Some(addr.to_string()),
        Some(Host::Ipv6(addr)) => Some(addr.to_string()),
        None => None,
    };
    let mut port = url.port();
    let mut user = Some(decode(url.username())?);
    let mut password = url.password().map(decode).transpose()?;
    let mut database = Some(decode(url.path().trim_start_matches('/'))?);
    let mut sslmode = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "host" => host = Some(value.into_owned()),
            "port" => port = Some(value.parse().map_err(|_| malformed("invalid port"))?),
            "user" => user = Some(value.into_owned()),
            "password" => password = Some(value.into_owned()),
            "dbname" => database = Some(value.into_owned()),
            "sslmode" => sslmode = Some(value.into_owned()),
            other => debug!("Ignoring connection parameter '{}'", other),
        }
    }

    let host = host
        .filter(|h| !h.is_empty())
        .ok_or_else(|| malformed("missing host"))?;
    let database = database
        .filter(|d| !d.is_empty() && !d.contains('/'))
        .ok_or_else(|| malformed("missing database"))?;

    Ok(PgParams {
        host,
        port: port.unwrap_or(DEFAULT_PG_PORT),
        user: user
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_PG_USER.to_string()),
        password: password.filter(|p| !p.is_empty()),
        database,
        sslmode,
    })
}

/// Strip credentials before a locator lands in a log line or error.
pub fn redact(locator: &str) -> String {
    match Url::parse(locator) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(None);
            url.to_string()
        }
        Ok(_) => locator.to_string(),
        // Unparseable but may still carry userinfo.
        Err(_) if locator.contains('@') => "<redacted locator>".to_string(),
        Err(_) => locator.to_string(),
    }
}
