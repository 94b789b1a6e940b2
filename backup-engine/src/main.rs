//! Backup Engine - Main entry point
//!
//! Serves the backup HTTP API with the nightly schedule, or runs a single
//! backup operation from the command line.

use anyhow::{bail, Result};
use backup_engine::api::{self, AppState};
use backup_engine::daemon::shutdown::ShutdownCoordinator;
use backup_engine::db::{DatabaseHandle, DetachedHandle, SqliteHandle};
use backup_engine::events::{BackupEvent, Notifier};
use backup_engine::scheduler::BackupScheduler;
use backup_engine::utils::{self, format::format_bytes};
use backup_engine::{BackupEngine, Cadence, Config, DataSource};
use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API and, in production mode, the nightly schedule
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Take a backup now
    Create {
        #[arg(long, default_value = "manual")]
        cadence: Cadence,
    },
    /// Restore the live database from a backup (takes a safety backup first)
    Restore { filename: String },
    /// List backups, newest first
    List,
    /// Probe a backup's integrity
    Verify { filename: String },
    /// Apply retention to one cadence, or all when omitted
    Rotate {
        #[arg(long)]
        cadence: Option<Cadence>,
    },
    /// Delete a backup
    Delete { filename: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    let (source, at) = config.validate()?;
    let handle: Arc<dyn DatabaseHandle> = match &source {
        DataSource::Sqlite { path } => {
            let handle = SqliteHandle::open(path)?;
            tracing::debug!("Opened SQLite pool on {}", handle.path().display());
            Arc::new(handle)
        }
        DataSource::Postgres(_) => Arc::new(DetachedHandle::new()),
    };
    tracing::debug!("Data source: {}", backup_engine::source::redact(&config.database.url));

    let engine = BackupEngine::from_config(&config, source, handle, Notifier::new());

    match args.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            serve(engine, port, at, config.backup.production).await
        }
        Command::Create { cadence } => {
            let progress = spawn_progress_printer(&engine);
            let result = engine.create(cadence).await;
            progress.abort();
            match (result.metadata, result.error) {
                (Some(meta), _) if result.success => {
                    println!(
                        "{}  {}  verified={}",
                        meta.filepath.display(),
                        format_bytes(meta.size),
                        meta.verified
                    );
                    Ok(())
                }
                (_, Some(e)) => bail!("Backup failed: {}", e),
                _ => bail!("Backup failed"),
            }
        }
        Command::Restore { filename } => {
            let result = engine.restore(&filename).await;
            if let Some(safety) = &result.safety_backup {
                println!("Safety backup: {}", safety);
            }
            for line in &result.diagnostics {
                eprintln!("note: {}", line);
            }
            match result.error {
                None if result.success => {
                    println!("Restored from {}", result.restored_from);
                    Ok(())
                }
                Some(e) => bail!("Restore failed: {}", e),
                None => bail!("Restore failed"),
            }
        }
        Command::List => {
            let backups = engine.list().await?;
            if backups.is_empty() {
                println!("No backups in {}", engine.context().backup_dir.display());
            }
            for meta in backups {
                println!(
                    "{:<8} {:>12}  {}  {}",
                    meta.cadence.as_str(),
                    format_bytes(meta.size),
                    meta.created.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                    meta.filename
                );
            }
            Ok(())
        }
        Command::Verify { filename } => {
            if engine.verify(&filename).await? {
                println!("{}: ok", filename);
                Ok(())
            } else {
                bail!("{}: integrity check failed", filename)
            }
        }
        Command::Rotate { cadence } => {
            let report = engine.rotate(cadence).await;
            for name in &report.deleted {
                println!("deleted {}", name);
            }
            for failure in &report.failed {
                eprintln!("failed to delete {}: {}", failure.filename, failure.reason);
            }
            if report.failed.is_empty() {
                Ok(())
            } else {
                bail!("{} backup(s) could not be deleted", report.failed.len())
            }
        }
        Command::Delete { filename } => {
            engine.delete(&filename).await?;
            println!("deleted {}", filename);
            Ok(())
        }
    }
}

async fn serve(engine: BackupEngine, port: u16, at: NaiveTime, production: bool) -> Result<()> {
    tracing::info!(
        "Starting backup-engine v{} ({} backups in {})",
        env!("CARGO_PKG_VERSION"),
        engine.context().source.engine_name(),
        engine.context().backup_dir.display()
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let shutdown = ShutdownCoordinator::new();

    let scheduler = BackupScheduler::new(engine.clone(), at, production).start(shutdown.token());

    let app = api::create_router(AppState::new(engine.clone()));

    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Health endpoint: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let token = shutdown.token();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        token.cancelled().await;
    });
    let server_handle = tokio::spawn(async move { server.await });

    shutdown.wait_for_signal().await;

    if let Some(handle) = scheduler {
        let _ = tokio::time::timeout(Duration::from_secs(3), handle).await;
    }

    // Let an in-flight backup or restore finish before exiting
    shutdown.drain(&engine, Duration::from_secs(300)).await;

    match tokio::time::timeout(Duration::from_secs(5), server_handle).await {
        Ok(Ok(Ok(()))) => tracing::info!("Server shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!("Server error during shutdown: {}", e),
        Ok(Err(e)) => tracing::error!("Server task panicked: {}", e),
        Err(_) => tracing::warn!("Server shutdown timeout, forcing exit"),
    }

    Ok(())
}

/// Echo progress events to stderr while a CLI backup runs.
fn spawn_progress_printer(engine: &BackupEngine) -> tokio::task::JoinHandle<()> {
    let mut rx = engine.notifier().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let BackupEvent::Progress {
                filename,
                size_text,
                ..
            } = event
            {
                eprintln!("{}: {}", filename, size_text);
            }
        }
    })
}
