//! Game queries that resolve relations through the junction collections.
//!
//! The store keeps games, entities and links in separate collections. This
//! service turns a [`GameFilter`] into a [`GameQuery`] by resolving entity
//! names to game ids, and hydrates each game with its developers,
//! publishers, genres, categories and tags.

use std::collections::{HashMap, HashSet};

use catalog::{
    DocumentId, EntityKind, Game, GameFilter, GamePatch, GameStats, GameWithRelations, NewGame,
    PageRequest, Pagination, RelatedEntity, RelatedTag,
};
use catalog_store::{EntityRepository, GameQuery, GameRepository, LinkRepository, StoreError};
use futures::future::try_join_all;

pub struct GameQueryService<G, E, L> {
    games: G,
    entities: E,
    links: L,
}

impl<G, E, L> GameQueryService<G, E, L>
where
    G: GameRepository,
    E: EntityRepository,
    L: LinkRepository,
{
    pub fn new(games: G, entities: E, links: L) -> Self {
        Self {
            games,
            entities,
            links,
        }
    }

    /// Attach every relation to `game`. The five look-ups run concurrently.
    pub async fn hydrate(&self, game: Game) -> Result<GameWithRelations, StoreError> {
        let (developers, publishers, genres, categories, tags) = tokio::try_join!(
            self.related(EntityKind::Developer, &game.id),
            self.related(EntityKind::Publisher, &game.id),
            self.related(EntityKind::Genre, &game.id),
            self.related(EntityKind::Category, &game.id),
            self.related_tags(&game.id),
        )?;

        Ok(GameWithRelations {
            game,
            developers,
            publishers,
            genres,
            categories,
            tags,
        })
    }

    async fn related(
        &self,
        kind: EntityKind,
        game_id: &DocumentId,
    ) -> Result<Vec<RelatedEntity>, StoreError> {
        let links = self.links.links_for_game(kind, game_id).await?;
        let ids: Vec<DocumentId> = links.into_iter().map(|l| l.entity_id).collect();
        let entities = self.entities.find_entities(kind, &ids).await?;
        Ok(entities.into_iter().map(RelatedEntity::from).collect())
    }

    async fn related_tags(&self, game_id: &DocumentId) -> Result<Vec<RelatedTag>, StoreError> {
        let links = self.links.links_for_game(EntityKind::Tag, game_id).await?;
        let counts: HashMap<DocumentId, Option<i64>> = links
            .into_iter()
            .map(|l| (l.entity_id, l.tag_count))
            .collect();
        let ids: Vec<DocumentId> = counts.keys().cloned().collect();

        let tags = self.entities.find_entities(EntityKind::Tag, &ids).await?;
        Ok(tags
            .into_iter()
            .map(|tag| RelatedTag {
                count: counts.get(&tag.id).copied().flatten(),
                id: tag.id,
                name: tag.name,
            })
            .collect())
    }

    pub async fn find_game_with_relations(
        &self,
        id: &DocumentId,
    ) -> Result<Option<GameWithRelations>, StoreError> {
        match self.games.find_game(id).await? {
            Some(game) => Ok(Some(self.hydrate(game).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_game_by_app_id_with_relations(
        &self,
        app_id: i64,
    ) -> Result<Option<GameWithRelations>, StoreError> {
        match self.games.find_game_by_app_id(app_id).await? {
            Some(game) => Ok(Some(self.hydrate(game).await?)),
            None => Ok(None),
        }
    }

    /// One page of games matching `filter`, sorted by name, each with its
    /// relations attached.
    pub async fn find_games_with_relations(
        &self,
        filter: &GameFilter,
        page: PageRequest,
    ) -> Result<(Vec<GameWithRelations>, Pagination), StoreError> {
        let query = self.build_query(filter).await?;

        let (games, total) = tokio::try_join!(
            self.games.find_games(&query, page.skip(), page.limit),
            self.games.count_games(&query),
        )?;
        let games = try_join_all(games.into_iter().map(|game| self.hydrate(game))).await?;

        Ok((games, page.pagination(total)))
    }

    /// Translate a caller's filter into a store query.
    ///
    /// Developer, publisher and genre names resolve to the set of games
    /// linked to that entity. Several relation criteria intersect, and a
    /// name that matches no entity matches no game.
    pub async fn build_query(&self, filter: &GameFilter) -> Result<GameQuery, StoreError> {
        let mut query = GameQuery {
            min_price: filter.min_price,
            max_price: filter.max_price,
            min_score: filter.min_score,
            platform: filter.platform,
            ..Default::default()
        };
        if let Some(search) = &filter.search {
            query = query.with_search(search);
        }

        let criteria = [
            (EntityKind::Developer, &filter.developer),
            (EntityKind::Publisher, &filter.publisher),
            (EntityKind::Genre, &filter.genre),
        ];

        let mut ids: Option<HashSet<DocumentId>> = None;
        for (kind, name) in criteria {
            let Some(name) = name else { continue };
            let matched = self.games_related_to(kind, name).await?;
            ids = Some(match ids {
                Some(prev) => prev.intersection(&matched).cloned().collect(),
                None => matched,
            });
        }

        query.ids = ids.map(|set| {
            let mut ids: Vec<DocumentId> = set.into_iter().collect();
            ids.sort();
            ids
        });
        Ok(query)
    }

    async fn games_related_to(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<HashSet<DocumentId>, StoreError> {
        let Some(entity) = self.entities.find_entity_by_name(kind, name).await? else {
            tracing::debug!(%kind, name, "Filter names an unknown entity");
            return Ok(HashSet::new());
        };
        let games = self.links.games_for_entity(kind, &entity.id).await?;
        Ok(games.into_iter().collect())
    }

    pub async fn statistics(&self) -> Result<GameStats, StoreError> {
        let all = GameQuery::default();
        let (games, developers, publishers, genres, (avg_price, avg_score)) = tokio::try_join!(
            self.games.count_games(&all),
            self.entities.count_entities(EntityKind::Developer),
            self.entities.count_entities(EntityKind::Publisher),
            self.entities.count_entities(EntityKind::Genre),
            self.games.averages(),
        )?;

        Ok(GameStats::new(
            games, developers, publishers, genres, avg_price, avg_score,
        ))
    }

    pub async fn create_game(&self, game: &NewGame) -> Result<Game, StoreError> {
        self.games.insert_game(game).await
    }

    pub async fn update_game(
        &self,
        id: &DocumentId,
        patch: GamePatch,
    ) -> Result<Option<Game>, StoreError> {
        self.games.update_game(id, patch).await
    }

    pub async fn delete_game(&self, id: &DocumentId) -> Result<Option<Game>, StoreError> {
        self.games.delete_game(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Platform;
    use catalog_store::{
        Database, SqliteEntityRepository, SqliteGameRepository, SqliteLinkRepository,
    };

    type Service = GameQueryService<SqliteGameRepository, SqliteEntityRepository, SqliteLinkRepository>;

    struct Fixture {
        db: Database,
        service: Service,
        portal: Game,
        dota: Game,
        stardew: Game,
    }

    fn new_game(app_id: i64, name: &str, price: f64, score: i64) -> NewGame {
        let mut game = NewGame::new(app_id, name);
        game.price = price;
        game.metacritic_score = score;
        game
    }

    /// Three games: Valve made Portal and Dota 2, ConcernedApe made Stardew
    /// Valley. Portal and Stardew Valley are tagged.
    async fn fixture() -> Fixture {
        let db = Database::new_in_memory().await.unwrap();
        let service = GameQueryService::new(db.games(), db.entities(), db.links());
        let entities = db.entities();
        let links = db.links();

        let portal = service
            .create_game(&new_game(400, "Portal", 9.99, 90))
            .await
            .unwrap();
        let dota = service
            .create_game(&new_game(570, "Dota 2", 0.0, 0))
            .await
            .unwrap();
        let stardew = service
            .create_game(&new_game(413150, "Stardew Valley", 14.99, 89))
            .await
            .unwrap();

        let valve = entities
            .upsert_entity(EntityKind::Developer, 1, "Valve")
            .await
            .unwrap();
        let ape = entities
            .upsert_entity(EntityKind::Developer, 2, "ConcernedApe")
            .await
            .unwrap();
        let valve_pub = entities
            .upsert_entity(EntityKind::Publisher, 1, "Valve")
            .await
            .unwrap();
        let puzzle = entities
            .upsert_entity(EntityKind::Tag, 1, "Puzzle")
            .await
            .unwrap();
        let farming = entities
            .upsert_entity(EntityKind::Tag, 2, "Farming Sim")
            .await
            .unwrap();
        let action = entities
            .upsert_entity(EntityKind::Genre, 1, "Action")
            .await
            .unwrap();

        for game in [&portal, &dota] {
            links
                .upsert_link(EntityKind::Developer, &game.id, &valve, None)
                .await
                .unwrap();
            links
                .upsert_link(EntityKind::Publisher, &game.id, &valve_pub, None)
                .await
                .unwrap();
        }
        links
            .upsert_link(EntityKind::Genre, &dota.id, &action, None)
            .await
            .unwrap();
        links
            .upsert_link(EntityKind::Developer, &stardew.id, &ape, None)
            .await
            .unwrap();
        links
            .upsert_link(EntityKind::Tag, &portal.id, &puzzle, Some(1200))
            .await
            .unwrap();
        links
            .upsert_link(EntityKind::Tag, &stardew.id, &farming, Some(800))
            .await
            .unwrap();

        Fixture {
            db,
            service,
            portal,
            dota,
            stardew,
        }
    }

    fn names(games: &[GameWithRelations]) -> Vec<&str> {
        games.iter().map(|g| g.game.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_hydrate_attaches_relations() {
        let f = fixture().await;
        let portal = f
            .service
            .find_game_with_relations(&f.portal.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(portal.game.id, f.portal.id);
        assert_eq!(portal.game.app_id, 400);
        assert_eq!(portal.developers.len(), 1);
        assert_eq!(portal.developers[0].name, "Valve");
        assert_eq!(portal.publishers[0].name, "Valve");
        assert!(portal.genres.is_empty());
        assert!(portal.categories.is_empty());
        assert_eq!(portal.tags.len(), 1);
        assert_eq!(portal.tags[0].name, "Puzzle");
        assert_eq!(portal.tags[0].count, Some(1200));
    }

    #[tokio::test]
    async fn test_find_by_app_id() {
        let f = fixture().await;
        let stardew = f
            .service
            .find_game_by_app_id_with_relations(413150)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stardew.game.id, f.stardew.id);
        assert_eq!(stardew.developers[0].name, "ConcernedApe");

        assert!(f
            .service
            .find_game_by_app_id_with_relations(1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_game() {
        let f = fixture().await;
        assert!(f
            .service
            .find_game_with_relations(&DocumentId::from("nope"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_hydrate_skips_dangling_links() {
        let f = fixture().await;
        f.db.links()
            .upsert_link(
                EntityKind::Developer,
                &f.portal.id,
                &DocumentId::from("deleted-developer"),
                None,
            )
            .await
            .unwrap();

        let portal = f
            .service
            .find_game_with_relations(&f.portal.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(portal.developers.len(), 1);
        assert_eq!(portal.developers[0].name, "Valve");
    }

    #[tokio::test]
    async fn test_deleted_game_leaves_links() {
        let f = fixture().await;
        let removed = f.service.delete_game(&f.dota.id).await.unwrap().unwrap();
        assert_eq!(removed.name, "Dota 2");

        let filter = GameFilter {
            developer: Some("Valve".into()),
            ..Default::default()
        };
        let (games, _) = f
            .service
            .find_games_with_relations(&filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(names(&games), vec!["Portal"]);
        assert_eq!(
            f.db.links().count_links(EntityKind::Developer).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_relation_filters_intersect() {
        let f = fixture().await;
        let filter = GameFilter {
            developer: Some("Valve".into()),
            genre: Some("Action".into()),
            ..Default::default()
        };
        let (games, pagination) = f
            .service
            .find_games_with_relations(&filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(names(&games), vec!["Dota 2"]);
        assert_eq!(pagination.total, 1);
        assert_eq!(games[0].genres[0].name, "Action");
    }

    #[tokio::test]
    async fn test_unknown_entity_matches_nothing() {
        let f = fixture().await;
        let filter = GameFilter {
            publisher: Some("Nobody".into()),
            ..Default::default()
        };
        let query = f.service.build_query(&filter).await.unwrap();
        assert!(query.matches_nothing());

        let (games, pagination) = f
            .service
            .find_games_with_relations(&filter, PageRequest::default())
            .await
            .unwrap();
        assert!(games.is_empty());
        assert_eq!(pagination.total, 0);
        assert_eq!(pagination.total_pages, 0);
    }

    #[tokio::test]
    async fn test_scalar_criteria_pass_through() {
        let f = fixture().await;
        let filter = GameFilter {
            search: Some("portal  valley".into()),
            min_price: Some(1.0),
            max_price: Some(20.0),
            min_score: Some(85),
            platform: Some(Platform::Windows),
            ..Default::default()
        };
        let query = f.service.build_query(&filter).await.unwrap();
        assert_eq!(query.search_terms, vec!["portal", "valley"]);
        assert_eq!(query.min_price, Some(1.0));
        assert_eq!(query.max_price, Some(20.0));
        assert_eq!(query.min_score, Some(85));
        assert_eq!(query.platform, Some(Platform::Windows));
        assert!(query.ids.is_none());
    }

    #[tokio::test]
    async fn test_list_sorted_and_paginated() {
        let f = fixture().await;
        let (games, pagination) = f
            .service
            .find_games_with_relations(&GameFilter::default(), PageRequest::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(names(&games), vec!["Dota 2", "Portal"]);
        assert_eq!(pagination.total, 3);
        assert_eq!(pagination.total_pages, 2);

        let (games, _) = f
            .service
            .find_games_with_relations(&GameFilter::default(), PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(names(&games), vec!["Stardew Valley"]);
        assert_eq!(games[0].tags[0].count, Some(800));
    }

    #[tokio::test]
    async fn test_statistics() {
        let f = fixture().await;
        let stats = f.service.statistics().await.unwrap();
        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.total_developers, 2);
        assert_eq!(stats.total_publishers, 1);
        assert_eq!(stats.total_genres, 1);
        // (9.99 + 0 + 14.99) / 3
        assert_eq!(stats.avg_price, 8.33);
        // Dota 2 has no score: (90 + 89) / 2 = 89.5
        assert_eq!(stats.avg_metacritic_score, 90);
    }

    #[tokio::test]
    async fn test_statistics_empty_catalog() {
        let db = Database::new_in_memory().await.unwrap();
        let service = GameQueryService::new(db.games(), db.entities(), db.links());
        let stats = service.statistics().await.unwrap();
        assert_eq!(stats.total_games, 0);
        assert_eq!(stats.avg_price, 0.0);
        assert_eq!(stats.avg_metacritic_score, 0);
    }
}
