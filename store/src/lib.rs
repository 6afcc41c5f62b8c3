//! SQLite-backed document store for the game catalog.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` in WAL mode. Embedded migrations
//! (`migrations/0001_initial_schema.sql`) run automatically when
//! [`Database::open`] is called.
//!
//! ## Collections
//!
//! Eleven collections, one table each: `games`, the five entity collections
//! (`developers`, `publishers`, `genres`, `categories`, `tags`) and the five
//! junction collections (`game_developers`, ...). Document ids are generated
//! strings. References between collections are not enforced, so a junction
//! document can outlive the game it points at.
//!
//! ## Repository types
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqliteGameRepository`] | [`GameRepository`] |
//! | [`SqliteEntityRepository`] | [`EntityRepository`] |
//! | [`SqliteLinkRepository`] | [`LinkRepository`] |
//!
//! Entity and junction collections share one repository each, parameterized
//! by [`catalog::EntityKind`].

mod database;
mod entity_repo;
mod game_repo;
mod helpers;
mod link_repo;
mod query;
pub mod traits;

pub use database::Database;
pub use entity_repo::SqliteEntityRepository;
pub use game_repo::SqliteGameRepository;
pub use link_repo::SqliteLinkRepository;
pub use query::GameQuery;
pub use traits::{EntityRepository, GameRepository, LinkRepository};

use catalog::ValidationError;

/// Where the catalog database lives unless configured otherwise.
pub const DEFAULT_DB_PATH: &str = "./data/steam_games.db";

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
