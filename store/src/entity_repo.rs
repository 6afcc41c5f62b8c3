//! SQLite-backed repository for developers, publishers, genres, categories
//! and tags.

use catalog::{DocumentId, EntityKind, NamedEntity};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::helpers::{count_to_u64, ids_json, is_unique_violation, EntityRow};
use crate::traits::EntityRepository;
use crate::StoreError;

/// SQLite implementation of [`EntityRepository`].
///
/// Table names are taken from [`EntityKind`], so they are never user input.
pub struct SqliteEntityRepository {
    pool: SqlitePool,
}

impl SqliteEntityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EntityRepository for SqliteEntityRepository {
    async fn upsert_entity(
        &self,
        kind: EntityKind,
        source_id: i64,
        name: &str,
    ) -> Result<DocumentId, StoreError> {
        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO {table} (id, name, source_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (source_id) DO UPDATE SET
                name = excluded.name,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
            table = kind.collection()
        );

        let (id,): (String,) = sqlx::query_as(&query)
            .bind(DocumentId::generate().into_inner())
            .bind(name)
            .bind(source_id)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate(format!("{kind} named {name:?}"))
                } else {
                    StoreError::Sqlx(e)
                }
            })?;

        Ok(DocumentId::from(id))
    }

    async fn find_entity_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<NamedEntity>, StoreError> {
        let query = format!(
            "SELECT id, name, source_id, created_at, updated_at FROM {} WHERE name = ?",
            kind.collection()
        );
        let row: Option<EntityRow> = sqlx::query_as(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(NamedEntity::from))
    }

    async fn find_entities(
        &self,
        kind: EntityKind,
        ids: &[DocumentId],
    ) -> Result<Vec<NamedEntity>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT id, name, source_id, created_at, updated_at
            FROM {}
            WHERE id IN (SELECT value FROM json_each(?))
            ORDER BY name
            "#,
            kind.collection()
        );
        let rows: Vec<EntityRow> = sqlx::query_as(&query)
            .bind(ids_json(ids)?)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(NamedEntity::from).collect())
    }

    async fn count_entities(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let query = format!("SELECT COUNT(*) FROM {}", kind.collection());
        let (count,): (i64,) = sqlx::query_as(&query).fetch_one(&self.pool).await?;
        Ok(count_to_u64(count))
    }
}
