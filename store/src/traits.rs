//! Async repository trait definitions for the document store.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send`, which axum handlers and `tokio::spawn`
//! require.

use catalog::{DocumentId, EntityKind, Game, GamePatch, Link, NamedEntity, NewGame, SourceGame};
use std::future::Future;

use crate::{GameQuery, StoreError};

/// Repository for game documents.
pub trait GameRepository: Send + Sync {
    /// Insert a new game. A second game with the same `app_id` is rejected
    /// with [`StoreError::Duplicate`].
    fn insert_game(
        &self,
        game: &NewGame,
    ) -> impl Future<Output = Result<Game, StoreError>> + Send;
    fn find_game(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send;
    fn find_game_by_app_id(
        &self,
        app_id: i64,
    ) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send;
    /// Apply a partial update. `Ok(None)` when no game has this id.
    fn update_game(
        &self,
        id: &DocumentId,
        patch: GamePatch,
    ) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send;
    /// Remove a game and return the removed document. Links are left alone.
    fn delete_game(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send;
    /// One page of matching games, ordered by name.
    fn find_games(
        &self,
        query: &GameQuery,
        skip: u64,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Game>, StoreError>> + Send;
    fn count_games(
        &self,
        query: &GameQuery,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
    /// Insert or update a warehouse game keyed by its `game_id`.
    fn upsert_source_game(
        &self,
        row: &SourceGame,
    ) -> impl Future<Output = Result<DocumentId, StoreError>> + Send;
    /// Average price over all games and average metacritic score over games
    /// that have one. `None` when there is nothing to average.
    fn averages(
        &self,
    ) -> impl Future<Output = Result<(Option<f64>, Option<f64>), StoreError>> + Send;
}

/// Repository for the five named-entity collections.
///
/// Names are unique within a collection; `source_id` is the natural key used
/// by the migration.
pub trait EntityRepository: Send + Sync {
    fn upsert_entity(
        &self,
        kind: EntityKind,
        source_id: i64,
        name: &str,
    ) -> impl Future<Output = Result<DocumentId, StoreError>> + Send;
    fn find_entity_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> impl Future<Output = Result<Option<NamedEntity>, StoreError>> + Send;
    /// Entities with any of `ids`, ordered by name. Unknown ids are skipped.
    fn find_entities(
        &self,
        kind: EntityKind,
        ids: &[DocumentId],
    ) -> impl Future<Output = Result<Vec<NamedEntity>, StoreError>> + Send;
    fn count_entities(
        &self,
        kind: EntityKind,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// Repository for the five junction collections.
///
/// Implementations must keep each (game, entity) pair unique.
pub trait LinkRepository: Send + Sync {
    /// Insert or refresh the link for this pair. `tag_count` is only stored
    /// for [`EntityKind::Tag`].
    fn upsert_link(
        &self,
        kind: EntityKind,
        game_id: &DocumentId,
        entity_id: &DocumentId,
        tag_count: Option<i64>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn links_for_game(
        &self,
        kind: EntityKind,
        game_id: &DocumentId,
    ) -> impl Future<Output = Result<Vec<Link>, StoreError>> + Send;
    fn games_for_entity(
        &self,
        kind: EntityKind,
        entity_id: &DocumentId,
    ) -> impl Future<Output = Result<Vec<DocumentId>, StoreError>> + Send;
    fn count_links(
        &self,
        kind: EntityKind,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
