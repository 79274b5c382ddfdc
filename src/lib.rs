pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod insight;
pub mod models;
pub mod server;
pub mod stats;

use std::path::Path;

use config::ServerConfig;
use error::{AppError, Result};

/// Runs the API server until Ctrl-C
pub async fn run(config: ServerConfig) -> Result<()> {
    let backups = Path::new(&config.db_path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .join("backups");

    server::serve(config).await.inspect_err(|e| {
        if matches!(e, AppError::Database(_)) {
            log::error!("Database initialization or query failed: {}", e);
            log::error!("This might be due to a failed migration or database corruption.");
            log::error!("Pre-migration backups are kept in {}", backups.display());
            log::error!("To recover, stop the server, replace the database file with the newest backup and restart.");
        }
    })
}
