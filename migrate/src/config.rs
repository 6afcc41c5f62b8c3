//! Configuration for the migration job
//!
//! Warehouse connection settings come from `PG_HOST`, `PG_PORT`, `PG_USER`,
//! `PG_PASSWORD` and `PG_DATABASE`. The destination is `CATALOG_DB_PATH`
//! unless `--database` is given. Setting `CATALOG_LOG_DIR` additionally
//! writes a daily log file there.

use std::path::PathBuf;
use std::time::Duration;

use catalog_store::DEFAULT_DB_PATH;

const DEFAULT_PG_HOST: &str = "localhost";
const DEFAULT_PG_PORT: u16 = 5435;
const DEFAULT_PG_USER: &str = "postgres";
const DEFAULT_PG_PASSWORD: &str = "root";
const DEFAULT_PG_DATABASE: &str = "steamdb";

pub const PG_MAX_CONNECTIONS: u32 = 20;
pub const PG_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const PG_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection settings for the warehouse.
#[derive(Clone)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

pub fn get_pg_config() -> PgConfig {
    PgConfig {
        host: env_or("PG_HOST", DEFAULT_PG_HOST),
        port: parse_port(std::env::var("PG_PORT").ok().as_deref()),
        user: env_or("PG_USER", DEFAULT_PG_USER),
        password: env_or("PG_PASSWORD", DEFAULT_PG_PASSWORD),
        database: env_or("PG_DATABASE", DEFAULT_PG_DATABASE),
    }
}

/// Get the path of the catalog database.
pub fn get_db_path() -> PathBuf {
    PathBuf::from(env_or("CATALOG_DB_PATH", DEFAULT_DB_PATH))
}

/// Directory for the rolling log file, if file logging is enabled.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("CATALOG_LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn parse_port(value: Option<&str>) -> u16 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_PG_PORT)
}
