//! Configuration for the catalog API server
//!
//! Every setting comes from an environment variable with a built-in default:
//! - `PORT`: listening port (3000)
//! - `CATALOG_BIND_ADDR`: listening address (0.0.0.0)
//! - `CATALOG_DB_PATH`: catalog database file (./data/steam_games.db)

use std::path::PathBuf;

use catalog_store::DEFAULT_DB_PATH;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Get the listening port. Values that are not a valid port fall back to
/// the default.
pub fn get_port() -> u16 {
    parse_port(std::env::var("PORT").ok().as_deref())
}

pub fn get_bind_addr() -> String {
    std::env::var("CATALOG_BIND_ADDR")
        .ok()
        .filter(|addr| !addr.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
}

/// Get the path of the catalog database.
pub fn get_db_path() -> PathBuf {
    match std::env::var("CATALOG_DB_PATH") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_DB_PATH),
    }
}

fn parse_port(value: Option<&str>) -> u16 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}
