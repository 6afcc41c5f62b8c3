//! SQLite-backed repository for the game ↔ entity junction collections.

use catalog::{DocumentId, EntityKind, Link};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::helpers::count_to_u64;
use crate::traits::LinkRepository;
use crate::StoreError;

/// SQLite implementation of [`LinkRepository`].
pub struct SqliteLinkRepository {
    pool: SqlitePool,
}

impl SqliteLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// `tag_count` exists only on the tag junction; other kinds select NULL.
fn tag_count_column(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Tag => "tag_count",
        _ => "NULL",
    }
}

impl LinkRepository for SqliteLinkRepository {
    async fn upsert_link(
        &self,
        kind: EntityKind,
        game_id: &DocumentId,
        entity_id: &DocumentId,
        tag_count: Option<i64>,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let table = kind.link_collection();
        let key = kind.key_column();

        let query = match kind {
            EntityKind::Tag => format!(
                r#"
                INSERT INTO {table} (id, game_id, {key}, tag_count, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (game_id, {key}) DO UPDATE SET
                    tag_count = excluded.tag_count,
                    updated_at = excluded.updated_at
                "#
            ),
            _ => format!(
                r#"
                INSERT INTO {table} (id, game_id, {key}, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (game_id, {key}) DO UPDATE SET
                    updated_at = excluded.updated_at
                "#
            ),
        };

        let mut q = sqlx::query(&query)
            .bind(DocumentId::generate().into_inner())
            .bind(game_id.as_str())
            .bind(entity_id.as_str());
        if kind == EntityKind::Tag {
            q = q.bind(tag_count);
        }
        q.bind(now).bind(now).execute(&self.pool).await?;

        Ok(())
    }

    async fn links_for_game(
        &self,
        kind: EntityKind,
        game_id: &DocumentId,
    ) -> Result<Vec<Link>, StoreError> {
        let query = format!(
            "SELECT game_id, {key}, {count} FROM {table} WHERE game_id = ? ORDER BY created_at, id",
            key = kind.key_column(),
            count = tag_count_column(kind),
            table = kind.link_collection(),
        );
        let rows: Vec<(String, String, Option<i64>)> = sqlx::query_as(&query)
            .bind(game_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(game_id, entity_id, tag_count)| Link {
                game_id: DocumentId::from(game_id),
                entity_id: DocumentId::from(entity_id),
                tag_count,
            })
            .collect())
    }

    async fn games_for_entity(
        &self,
        kind: EntityKind,
        entity_id: &DocumentId,
    ) -> Result<Vec<DocumentId>, StoreError> {
        let query = format!(
            "SELECT game_id FROM {} WHERE {} = ?",
            kind.link_collection(),
            kind.key_column()
        );
        let rows: Vec<(String,)> = sqlx::query_as(&query)
            .bind(entity_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| DocumentId::from(id)).collect())
    }

    async fn count_links(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let query = format!("SELECT COUNT(*) FROM {}", kind.link_collection());
        let (count,): (i64,) = sqlx::query_as(&query).fetch_one(&self.pool).await?;
        Ok(count_to_u64(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> (Database, SqliteLinkRepository) {
        let db = Database::new_in_memory().await.unwrap();
        let repo = db.links();
        (db, repo)
    }

    #[tokio::test]
    async fn test_pair_is_unique() {
        let (_db, repo) = test_db().await;
        let game = DocumentId::from("game");
        let dev = DocumentId::from("dev");
        repo.upsert_link(EntityKind::Developer, &game, &dev, None)
            .await
            .unwrap();
        repo.upsert_link(EntityKind::Developer, &game, &dev, None)
            .await
            .unwrap();
        assert_eq!(repo.count_links(EntityKind::Developer).await.unwrap(), 1);

        let links = repo
            .links_for_game(EntityKind::Developer, &game)
            .await
            .unwrap();
        assert_eq!(
            links,
            vec![Link {
                game_id: game,
                entity_id: dev,
                tag_count: None
            }]
        );
    }

    #[tokio::test]
    async fn test_tag_count_refreshed_on_upsert() {
        let (_db, repo) = test_db().await;
        let game = DocumentId::from("game");
        let tag = DocumentId::from("tag");
        repo.upsert_link(EntityKind::Tag, &game, &tag, Some(3))
            .await
            .unwrap();
        repo.upsert_link(EntityKind::Tag, &game, &tag, Some(7))
            .await
            .unwrap();

        let links = repo.links_for_game(EntityKind::Tag, &game).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].tag_count, Some(7));
    }

    #[tokio::test]
    async fn test_tag_count_ignored_for_other_kinds() {
        let (_db, repo) = test_db().await;
        let game = DocumentId::from("game");
        let genre = DocumentId::from("genre");
        repo.upsert_link(EntityKind::Genre, &game, &genre, Some(9))
            .await
            .unwrap();
        let links = repo.links_for_game(EntityKind::Genre, &game).await.unwrap();
        assert_eq!(links[0].tag_count, None);
    }

    #[tokio::test]
    async fn test_games_for_entity() {
        let (_db, repo) = test_db().await;
        let genre = DocumentId::from("action");
        for game in ["a", "b"] {
            repo.upsert_link(EntityKind::Genre, &DocumentId::from(game), &genre, None)
                .await
                .unwrap();
        }
        repo.upsert_link(
            EntityKind::Genre,
            &DocumentId::from("c"),
            &DocumentId::from("rpg"),
            None,
        )
        .await
        .unwrap();

        let mut games = repo
            .games_for_entity(EntityKind::Genre, &genre)
            .await
            .unwrap();
        games.sort();
        assert_eq!(games, vec![DocumentId::from("a"), DocumentId::from("b")]);

        // Same ids in another junction collection are unrelated.
        assert!(repo
            .games_for_entity(EntityKind::Publisher, &genre)
            .await
            .unwrap()
            .is_empty());
    }
}
