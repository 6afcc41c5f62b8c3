//! SQLite-backed repository for game documents.

use catalog::{DocumentId, Game, GamePatch, NewGame, SourceGame};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::helpers::{classify_game_write, count_to_u64, search_name, GameRow, GAME_COLUMNS};
use crate::traits::GameRepository;
use crate::{GameQuery, StoreError};

/// SQLite implementation of [`GameRepository`].
pub struct SqliteGameRepository {
    pool: SqlitePool,
}

impl SqliteGameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl GameRepository for SqliteGameRepository {
    async fn insert_game(&self, game: &NewGame) -> Result<Game, StoreError> {
        game.validate()?;
        let id = DocumentId::generate();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO games
                (id, app_id, name, search_name, release_date, price, required_age, dlc_count,
                 short_description, header_image, website, windows, mac, linux,
                 metacritic_score, recommendations, positive_ratings, negative_ratings,
                 average_playtime_forever, source_id, migrated_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(game.app_id)
        .bind(&game.name)
        .bind(search_name(&game.name))
        .bind(game.release_date)
        .bind(game.price)
        .bind(game.required_age)
        .bind(game.dlc_count)
        .bind(&game.short_description)
        .bind(&game.header_image)
        .bind(&game.website)
        .bind(game.platforms.windows)
        .bind(game.platforms.mac)
        .bind(game.platforms.linux)
        .bind(game.metacritic_score)
        .bind(game.recommendations)
        .bind(game.ratings.positive)
        .bind(game.ratings.negative)
        .bind(game.average_playtime_forever)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(classify_game_write)?;

        tracing::debug!(id = %id, app_id = game.app_id, "Inserted game");

        Ok(Game {
            id,
            app_id: game.app_id,
            name: game.name.clone(),
            release_date: game.release_date,
            price: game.price,
            required_age: game.required_age,
            dlc_count: game.dlc_count,
            short_description: game.short_description.clone(),
            header_image: game.header_image.clone(),
            website: game.website.clone(),
            platforms: game.platforms,
            metacritic_score: game.metacritic_score,
            recommendations: game.recommendations,
            ratings: game.ratings,
            average_playtime_forever: game.average_playtime_forever,
            source_id: None,
            migrated_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_game(&self, id: &DocumentId) -> Result<Option<Game>, StoreError> {
        let row: Option<GameRow> =
            sqlx::query_as(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?"))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Game::from))
    }

    async fn find_game_by_app_id(&self, app_id: i64) -> Result<Option<Game>, StoreError> {
        let row: Option<GameRow> =
            sqlx::query_as(&format!("SELECT {GAME_COLUMNS} FROM games WHERE app_id = ?"))
                .bind(app_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Game::from))
    }

    async fn update_game(
        &self,
        id: &DocumentId,
        patch: GamePatch,
    ) -> Result<Option<Game>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<GameRow> =
            sqlx::query_as(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?"))
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut game = Game::from(row);
        game.apply(patch);
        game.validate()?;
        game.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE games SET
                app_id = ?, name = ?, search_name = ?, release_date = ?, price = ?, required_age = ?,
                dlc_count = ?, short_description = ?, header_image = ?, website = ?,
                windows = ?, mac = ?, linux = ?, metacritic_score = ?, recommendations = ?,
                positive_ratings = ?, negative_ratings = ?, average_playtime_forever = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(game.app_id)
        .bind(&game.name)
        .bind(search_name(&game.name))
        .bind(game.release_date)
        .bind(game.price)
        .bind(game.required_age)
        .bind(game.dlc_count)
        .bind(&game.short_description)
        .bind(&game.header_image)
        .bind(&game.website)
        .bind(game.platforms.windows)
        .bind(game.platforms.mac)
        .bind(game.platforms.linux)
        .bind(game.metacritic_score)
        .bind(game.recommendations)
        .bind(game.ratings.positive)
        .bind(game.ratings.negative)
        .bind(game.average_playtime_forever)
        .bind(game.updated_at)
        .bind(id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(classify_game_write)?;

        tx.commit().await?;
        tracing::debug!(id = %id, "Updated game");
        Ok(Some(game))
    }

    async fn delete_game(&self, id: &DocumentId) -> Result<Option<Game>, StoreError> {
        let row: Option<GameRow> = sqlx::query_as(&format!(
            "DELETE FROM games WHERE id = ? RETURNING {GAME_COLUMNS}"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        if row.is_some() {
            tracing::debug!(id = %id, "Deleted game");
        }
        Ok(row.map(Game::from))
    }

    async fn find_games(
        &self,
        query: &GameQuery,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Game>, StoreError> {
        // SQLite reads a negative OFFSET as zero, so an offset past i64 must
        // not wrap into one.
        let Ok(offset) = i64::try_from(skip) else {
            return Ok(Vec::new());
        };
        if query.matches_nothing() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {GAME_COLUMNS} FROM games"));
        query.push_where(&mut qb)?;
        qb.push(" ORDER BY name ASC, id ASC LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<GameRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Game::from).collect())
    }

    async fn count_games(&self, query: &GameQuery) -> Result<u64, StoreError> {
        if query.matches_nothing() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM games");
        query.push_where(&mut qb)?;
        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count_to_u64(count))
    }

    async fn upsert_source_game(&self, row: &SourceGame) -> Result<DocumentId, StoreError> {
        let game = row.to_new_game();
        let now: DateTime<Utc> = Utc::now();

        let (id,): (String,) = sqlx::query_as(
            r#"
            INSERT INTO games
                (id, app_id, name, search_name, release_date, price, required_age, dlc_count,
                 short_description, header_image, website, windows, mac, linux,
                 metacritic_score, recommendations, positive_ratings, negative_ratings,
                 average_playtime_forever, source_id, migrated_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (source_id) DO UPDATE SET
                app_id = excluded.app_id,
                name = excluded.name,
                search_name = excluded.search_name,
                release_date = excluded.release_date,
                price = excluded.price,
                required_age = excluded.required_age,
                dlc_count = excluded.dlc_count,
                short_description = excluded.short_description,
                header_image = excluded.header_image,
                website = excluded.website,
                windows = excluded.windows,
                mac = excluded.mac,
                linux = excluded.linux,
                metacritic_score = excluded.metacritic_score,
                recommendations = excluded.recommendations,
                positive_ratings = excluded.positive_ratings,
                negative_ratings = excluded.negative_ratings,
                average_playtime_forever = excluded.average_playtime_forever,
                migrated_at = excluded.migrated_at,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(DocumentId::generate().into_inner())
        .bind(game.app_id)
        .bind(&game.name)
        .bind(search_name(&game.name))
        .bind(game.release_date)
        .bind(game.price)
        .bind(game.required_age)
        .bind(game.dlc_count)
        .bind(&game.short_description)
        .bind(&game.header_image)
        .bind(&game.website)
        .bind(game.platforms.windows)
        .bind(game.platforms.mac)
        .bind(game.platforms.linux)
        .bind(game.metacritic_score)
        .bind(game.recommendations)
        .bind(game.ratings.positive)
        .bind(game.ratings.negative)
        .bind(game.average_playtime_forever)
        .bind(row.game_id)
        .bind(now)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(classify_game_write)?;

        Ok(DocumentId::from(id))
    }

    async fn averages(&self) -> Result<(Option<f64>, Option<f64>), StoreError> {
        let (avg_price,): (Option<f64>,) = sqlx::query_as("SELECT AVG(price) FROM games")
            .fetch_one(&self.pool)
            .await?;
        let (avg_score,): (Option<f64>,) =
            sqlx::query_as("SELECT AVG(metacritic_score) FROM games WHERE metacritic_score > 0")
                .fetch_one(&self.pool)
                .await?;
        Ok((avg_price, avg_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use catalog::{Platform, PlatformsPatch};

    async fn test_db() -> (Database, SqliteGameRepository) {
        let db = Database::new_in_memory().await.unwrap();
        let repo = db.games();
        (db, repo)
    }

    fn sample_game(app_id: i64, name: &str, price: f64) -> NewGame {
        let mut game = NewGame::new(app_id, name);
        game.price = price;
        game
    }

    fn sample_source(game_id: i64, app_id: i64, name: &str) -> SourceGame {
        SourceGame {
            game_id,
            app_id,
            name: name.to_string(),
            release_date: None,
            price: Some(19.99),
            required_age: None,
            dlc_count: Some(2),
            short_description: None,
            header_image: None,
            website: None,
            windows: Some(true),
            mac: None,
            linux: Some(false),
            metacritic_score: Some(80),
            recommendations: None,
            positive_ratings: Some(10),
            negative_ratings: Some(1),
            average_playtime_forever: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_roundtrip() {
        let (_db, repo) = test_db().await;
        let created = repo
            .insert_game(&sample_game(620, "Portal 2", 9.99))
            .await
            .unwrap();
        let loaded = repo.find_game(&created.id).await.unwrap();
        assert_eq!(loaded, Some(created.clone()));

        let by_app = repo.find_game_by_app_id(620).await.unwrap();
        assert_eq!(by_app.map(|g| g.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_find_nonexistent() {
        let (_db, repo) = test_db().await;
        assert_eq!(repo.find_game(&DocumentId::from("nope")).await.unwrap(), None);
        assert_eq!(repo.find_game_by_app_id(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_app_id_rejected() {
        let (_db, repo) = test_db().await;
        repo.insert_game(&sample_game(10, "Counter-Strike", 0.0))
            .await
            .unwrap();
        let err = repo
            .insert_game(&sample_game(10, "Counter-Strike Again", 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(err.to_string(), "Game with this appId already exists");
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_payload() {
        let (_db, repo) = test_db().await;
        let err = repo
            .insert_game(&sample_game(1, "Bad", -5.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let (_db, repo) = test_db().await;
        let created = repo
            .insert_game(&sample_game(70, "Half-Life", 9.99))
            .await
            .unwrap();

        let patch = GamePatch {
            price: Some(1.99),
            platforms: Some(PlatformsPatch {
                linux: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let updated = repo.update_game(&created.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.price, 1.99);
        assert!(updated.platforms.linux);
        assert_eq!(updated.name, "Half-Life");
        assert!(updated.updated_at >= created.updated_at);

        let reloaded = repo.find_game(&created.id).await.unwrap().unwrap();
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let (_db, repo) = test_db().await;
        let result = repo
            .update_game(&DocumentId::from("missing"), GamePatch::default())
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_update_to_taken_app_id_is_duplicate() {
        let (_db, repo) = test_db().await;
        repo.insert_game(&sample_game(1, "One", 0.0)).await.unwrap();
        let two = repo.insert_game(&sample_game(2, "Two", 0.0)).await.unwrap();
        let err = repo
            .update_game(
                &two.id,
                GamePatch {
                    app_id: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_document() {
        let (_db, repo) = test_db().await;
        let created = repo
            .insert_game(&sample_game(5, "Gone", 0.0))
            .await
            .unwrap();
        let deleted = repo.delete_game(&created.id).await.unwrap();
        assert_eq!(deleted.map(|g| g.app_id), Some(5));
        assert_eq!(repo.find_game(&created.id).await.unwrap(), None);
        assert_eq!(repo.delete_game(&created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_games_sorted_and_paginated() {
        let (_db, repo) = test_db().await;
        for (app_id, name) in [(3, "Cuphead"), (1, "Antichamber"), (2, "Braid")] {
            repo.insert_game(&sample_game(app_id, name, 0.0))
                .await
                .unwrap();
        }
        let query = GameQuery::default();

        let first: Vec<String> = repo
            .find_games(&query, 0, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(first, vec!["Antichamber", "Braid"]);

        let second = repo.find_games(&query, 2, 2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "Cuphead");

        assert_eq!(repo.count_games(&query).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_find_games_past_the_end_is_empty() {
        let (_db, repo) = test_db().await;
        repo.insert_game(&sample_game(1, "Antichamber", 0.0))
            .await
            .unwrap();
        let query = GameQuery::default();

        assert!(repo.find_games(&query, 1, 20).await.unwrap().is_empty());
        assert!(repo
            .find_games(&query, i64::MAX as u64, 20)
            .await
            .unwrap()
            .is_empty());
        assert!(repo
            .find_games(&query, u64::MAX, 20)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(repo.find_games(&query, 0, u64::MAX).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let (_db, repo) = test_db().await;
        let elan = repo
            .insert_game(&sample_game(1, "ÉLAN VITAL", 0.0))
            .await
            .unwrap();
        repo.insert_game(&sample_game(2, "Braid", 0.0))
            .await
            .unwrap();

        let found = repo
            .find_games(&GameQuery::default().with_search("élan"), 0, 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, elan.id);

        // Renaming refreshes what search sees.
        repo.update_game(
            &elan.id,
            GamePatch {
                name: Some("Über Run".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let renamed = GameQuery::default().with_search("ÜBER");
        assert_eq!(repo.count_games(&renamed).await.unwrap(), 1);
        let stale = GameQuery::default().with_search("élan");
        assert_eq!(repo.count_games(&stale).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_games_filters() {
        let (_db, repo) = test_db().await;
        let mut portal = sample_game(400, "Portal", 9.99);
        portal.metacritic_score = 90;
        portal.platforms.linux = true;
        let portal = repo.insert_game(&portal).await.unwrap();

        let mut dota = sample_game(570, "Dota 2", 0.0);
        dota.metacritic_score = 90;
        repo.insert_game(&dota).await.unwrap();

        let mut other = sample_game(999, "Expensive Portal Clone", 59.99);
        other.metacritic_score = 40;
        repo.insert_game(&other).await.unwrap();

        let search = GameQuery::default().with_search("PORTAL");
        assert_eq!(repo.count_games(&search).await.unwrap(), 2);

        let any_term = GameQuery::default().with_search("dota clone");
        assert_eq!(repo.count_games(&any_term).await.unwrap(), 2);

        let price = GameQuery {
            min_price: Some(1.0),
            max_price: Some(20.0),
            ..Default::default()
        };
        let found = repo.find_games(&price, 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, portal.id);

        let score = GameQuery {
            min_score: Some(85),
            ..Default::default()
        };
        assert_eq!(repo.count_games(&score).await.unwrap(), 2);

        let linux = GameQuery {
            platform: Some(Platform::Linux),
            ..Default::default()
        };
        assert_eq!(repo.count_games(&linux).await.unwrap(), 1);

        let ids = GameQuery {
            ids: Some(vec![portal.id.clone(), DocumentId::from("ghost")]),
            ..Default::default()
        };
        assert_eq!(repo.count_games(&ids).await.unwrap(), 1);

        let none = GameQuery {
            ids: Some(vec![]),
            ..Default::default()
        };
        assert!(repo.find_games(&none, 0, 10).await.unwrap().is_empty());
        assert_eq!(repo.count_games(&none).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_source_game_is_idempotent() {
        let (_db, repo) = test_db().await;
        let first = repo
            .upsert_source_game(&sample_source(1, 10, "Counter-Strike"))
            .await
            .unwrap();

        let mut renamed = sample_source(1, 10, "Counter-Strike 1.6");
        renamed.price = None;
        let second = repo.upsert_source_game(&renamed).await.unwrap();
        assert_eq!(first, second);

        let game = repo.find_game(&first).await.unwrap().unwrap();
        assert_eq!(game.name, "Counter-Strike 1.6");
        assert_eq!(game.price, 0.0);
        assert_eq!(game.source_id, Some(1));
        assert!(game.migrated_at.is_some());
        assert_eq!(repo.count_games(&GameQuery::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_source_game_conflicting_app_id_fails() {
        let (_db, repo) = test_db().await;
        repo.insert_game(&sample_game(10, "Hand-made", 0.0))
            .await
            .unwrap();
        let err = repo
            .upsert_source_game(&sample_source(1, 10, "Counter-Strike"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_averages() {
        let (_db, repo) = test_db().await;
        assert_eq!(repo.averages().await.unwrap(), (None, None));

        let mut a = sample_game(1, "A", 10.0);
        a.metacritic_score = 80;
        let b = sample_game(2, "B", 20.0);
        repo.insert_game(&a).await.unwrap();
        repo.insert_game(&b).await.unwrap();

        let (price, score) = repo.averages().await.unwrap();
        assert_eq!(price, Some(15.0));
        assert_eq!(score, Some(80.0));
    }
}
