use std::sync::Arc;
use std::time::Instant;

use catalog_store::{Database, SqliteEntityRepository, SqliteGameRepository, SqliteLinkRepository};

use crate::query::GameQueryService;

/// The query service as wired against the SQLite store.
pub type CatalogService =
    GameQueryService<SqliteGameRepository, SqliteEntityRepository, SqliteLinkRepository>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: &Database) -> Self {
        Self {
            catalog: Arc::new(GameQueryService::new(
                db.games(),
                db.entities(),
                db.links(),
            )),
            started_at: Instant::now(),
        }
    }
}
