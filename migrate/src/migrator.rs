//! Warehouse to catalog store migration.
//!
//! Runs strictly in order: games, then the five dimension collections, then
//! the five junction collections. Every write is a natural-key upsert, so a
//! second run over the same warehouse converges on the same documents.

use std::collections::HashMap;

use catalog::{CatalogStatistics, CollectionCounts, DocumentId, EntityKind, RelationshipCounts};
use catalog_store::{EntityRepository, GameQuery, GameRepository, LinkRepository, StoreError};
use tracing::info;

use crate::source::SourceReader;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("source database error: {0}")]
    Source(#[from] sqlx::Error),
    #[error("catalog store error: {0}")]
    Store(#[from] StoreError),
}

/// Warehouse id to document id, per collection.
type IdMap = HashMap<i64, DocumentId>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindReport {
    pub entities: u64,
    pub links: u64,
    /// Junction rows dropped because one side was not migrated.
    pub skipped_links: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub games: u64,
    pub developers: KindReport,
    pub publishers: KindReport,
    pub genres: KindReport,
    pub categories: KindReport,
    pub tags: KindReport,
}

impl MigrationReport {
    pub fn kind(&self, kind: EntityKind) -> &KindReport {
        match kind {
            EntityKind::Developer => &self.developers,
            EntityKind::Publisher => &self.publishers,
            EntityKind::Genre => &self.genres,
            EntityKind::Category => &self.categories,
            EntityKind::Tag => &self.tags,
        }
    }

    fn kind_mut(&mut self, kind: EntityKind) -> &mut KindReport {
        match kind {
            EntityKind::Developer => &mut self.developers,
            EntityKind::Publisher => &mut self.publishers,
            EntityKind::Genre => &mut self.genres,
            EntityKind::Category => &mut self.categories,
            EntityKind::Tag => &mut self.tags,
        }
    }
}

pub struct Migrator<S, G, E, L> {
    source: S,
    games: G,
    entities: E,
    links: L,
}

impl<S, G, E, L> Migrator<S, G, E, L>
where
    S: SourceReader,
    G: GameRepository,
    E: EntityRepository,
    L: LinkRepository,
{
    pub fn new(source: S, games: G, entities: E, links: L) -> Self {
        Self {
            source,
            games,
            entities,
            links,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Copy the warehouse into the catalog store.
    ///
    /// With a `limit`, only the first `limit` games by warehouse id are
    /// copied, along with just the entities those games reference.
    pub async fn run(&self, limit: Option<u64>) -> Result<MigrationReport, MigrationError> {
        info!(?limit, "Starting warehouse migration");
        let mut report = MigrationReport::default();

        let game_ids = self.migrate_games(limit).await?;
        report.games = game_ids.len() as u64;
        info!(games = report.games, "Migrated games");

        let related = match limit {
            Some(_) => Some(self.related_entity_ids(&game_ids).await?),
            None => None,
        };

        let mut entity_ids: HashMap<EntityKind, IdMap> = HashMap::new();
        for kind in EntityKind::ALL {
            let only = related
                .as_ref()
                .map(|r| r.get(&kind).map(Vec::as_slice).unwrap_or_default());
            let ids = self.migrate_entities(kind, only).await?;
            report.kind_mut(kind).entities = ids.len() as u64;
            info!(%kind, count = ids.len(), "Migrated {}", kind.collection());
            entity_ids.insert(kind, ids);
        }

        for kind in EntityKind::ALL {
            let empty = IdMap::new();
            let targets = entity_ids.get(&kind).unwrap_or(&empty);
            let (migrated, skipped) = self.migrate_links(kind, &game_ids, targets).await?;
            let entry = report.kind_mut(kind);
            entry.links = migrated;
            entry.skipped_links = skipped;
            info!(%kind, migrated, skipped, "Migrated {}", kind.link_collection());
        }

        info!(
            games = report.games,
            developers = report.developers.entities,
            publishers = report.publishers.entities,
            genres = report.genres.entities,
            categories = report.categories.entities,
            tags = report.tags.entities,
            game_developers = report.developers.links,
            game_publishers = report.publishers.links,
            game_genres = report.genres.links,
            game_categories = report.categories.links,
            game_tags = report.tags.links,
            "Warehouse migration completed"
        );
        Ok(report)
    }

    async fn migrate_games(&self, limit: Option<u64>) -> Result<IdMap, MigrationError> {
        let rows = self.source.read_games(limit).await?;
        let mut ids = IdMap::with_capacity(rows.len());
        for row in &rows {
            let id = self.games.upsert_source_game(row).await?;
            ids.insert(row.game_id, id);
        }
        Ok(ids)
    }

    /// Distinct entity ids referenced by the migrated games, per kind.
    async fn related_entity_ids(
        &self,
        games: &IdMap,
    ) -> Result<HashMap<EntityKind, Vec<i64>>, MigrationError> {
        let mut game_ids: Vec<i64> = games.keys().copied().collect();
        game_ids.sort_unstable();

        let mut related = HashMap::new();
        for kind in EntityKind::ALL {
            let ids = if game_ids.is_empty() {
                Vec::new()
            } else {
                self.source.related_entity_ids(kind, &game_ids).await?
            };
            info!(%kind, count = ids.len(), "Found related {}", kind.collection());
            related.insert(kind, ids);
        }
        Ok(related)
    }

    async fn migrate_entities(
        &self,
        kind: EntityKind,
        only: Option<&[i64]>,
    ) -> Result<IdMap, MigrationError> {
        if matches!(only, Some(ids) if ids.is_empty()) {
            return Ok(IdMap::new());
        }

        let rows = self.source.read_entities(kind, only).await?;
        let mut ids = IdMap::with_capacity(rows.len());
        for row in &rows {
            let id = self.entities.upsert_entity(kind, row.id, &row.name).await?;
            ids.insert(row.id, id);
        }
        Ok(ids)
    }

    /// Returns how many junction rows were written and how many were skipped.
    async fn migrate_links(
        &self,
        kind: EntityKind,
        games: &IdMap,
        targets: &IdMap,
    ) -> Result<(u64, u64), MigrationError> {
        let rows = self.source.read_links(kind).await?;
        let (mut migrated, mut skipped) = (0, 0);

        for row in &rows {
            match (games.get(&row.game_id), targets.get(&row.entity_id)) {
                (Some(game_id), Some(entity_id)) => {
                    let tag_count = match kind {
                        EntityKind::Tag => row.tag_count,
                        _ => None,
                    };
                    self.links
                        .upsert_link(kind, game_id, entity_id, tag_count)
                        .await?;
                    migrated += 1;
                }
                _ => skipped += 1,
            }
        }
        Ok((migrated, skipped))
    }

    /// Document counts of every collection in the catalog store.
    pub async fn statistics(&self) -> Result<CatalogStatistics, MigrationError> {
        let all = GameQuery::default();
        let (games, developers, publishers, genres, categories, tags) = tokio::try_join!(
            self.games.count_games(&all),
            self.entities.count_entities(EntityKind::Developer),
            self.entities.count_entities(EntityKind::Publisher),
            self.entities.count_entities(EntityKind::Genre),
            self.entities.count_entities(EntityKind::Category),
            self.entities.count_entities(EntityKind::Tag),
        )?;
        let (game_developers, game_publishers, game_genres, game_categories, game_tags) = tokio::try_join!(
            self.links.count_links(EntityKind::Developer),
            self.links.count_links(EntityKind::Publisher),
            self.links.count_links(EntityKind::Genre),
            self.links.count_links(EntityKind::Category),
            self.links.count_links(EntityKind::Tag),
        )?;

        Ok(CatalogStatistics::new(
            CollectionCounts {
                games,
                developers,
                publishers,
                genres,
                categories,
                tags,
            },
            RelationshipCounts {
                game_developers,
                game_publishers,
                game_genres,
                game_categories,
                game_tags,
            },
        ))
    }
}
