//! Reading the warehouse's `processed` schema.

use std::future::Future;

use catalog::{EntityKind, SourceGame};
use chrono::NaiveDate;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::{PgConfig, PG_ACQUIRE_TIMEOUT, PG_IDLE_TIMEOUT, PG_MAX_CONNECTIONS};
use crate::migrator::MigrationError;

/// A row of a dimension table (`processed.developer`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntity {
    pub id: i64,
    pub name: String,
}

/// A row of a junction table (`processed.game_developer`, ...). Only
/// `game_tag` rows carry a `tag_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLink {
    pub game_id: i64,
    pub entity_id: i64,
    pub tag_count: Option<i64>,
}

/// Read access to the relational source.
pub trait SourceReader: Send + Sync {
    /// Games ordered by `game_id`, at most `limit` of them.
    fn read_games(
        &self,
        limit: Option<u64>,
    ) -> impl Future<Output = Result<Vec<SourceGame>, MigrationError>> + Send;
    /// Distinct ids of `kind` linked to any of `game_ids`.
    fn related_entity_ids(
        &self,
        kind: EntityKind,
        game_ids: &[i64],
    ) -> impl Future<Output = Result<Vec<i64>, MigrationError>> + Send;
    /// Dimension rows of `kind`, restricted to `only` when given.
    fn read_entities(
        &self,
        kind: EntityKind,
        only: Option<&[i64]>,
    ) -> impl Future<Output = Result<Vec<SourceEntity>, MigrationError>> + Send;
    /// Every junction row of `kind`.
    fn read_links(
        &self,
        kind: EntityKind,
    ) -> impl Future<Output = Result<Vec<SourceLink>, MigrationError>> + Send;
}

/// Warehouse reader over a PostgreSQL pool.
pub struct PgSourceReader {
    pool: PgPool,
}

impl PgSourceReader {
    pub async fn connect(config: &PgConfig) -> Result<Self, MigrationError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(PG_MAX_CONNECTIONS)
            .idle_timeout(PG_IDLE_TIMEOUT)
            .acquire_timeout(PG_ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Warehouse `game` row. Numeric columns are cast in SQL so they decode as
/// `i64` / `f64` whatever their declared width.
#[derive(sqlx::FromRow)]
struct GameRow {
    game_id: i64,
    app_id: i64,
    name: String,
    release_date: Option<NaiveDate>,
    price: Option<f64>,
    required_age: Option<i64>,
    dlc_count: Option<i64>,
    short_description: Option<String>,
    header_image: Option<String>,
    website: Option<String>,
    windows: Option<bool>,
    mac: Option<bool>,
    linux: Option<bool>,
    metacritic_score: Option<i64>,
    recommendations: Option<i64>,
    positive_ratings: Option<i64>,
    negative_ratings: Option<i64>,
    average_playtime_forever: Option<i64>,
}

impl From<GameRow> for SourceGame {
    fn from(r: GameRow) -> Self {
        Self {
            game_id: r.game_id,
            app_id: r.app_id,
            name: r.name,
            release_date: r.release_date,
            price: r.price,
            required_age: r.required_age,
            dlc_count: r.dlc_count,
            short_description: r.short_description,
            header_image: r.header_image,
            website: r.website,
            windows: r.windows,
            mac: r.mac,
            linux: r.linux,
            metacritic_score: r.metacritic_score,
            recommendations: r.recommendations,
            positive_ratings: r.positive_ratings,
            negative_ratings: r.negative_ratings,
            average_playtime_forever: r.average_playtime_forever,
        }
    }
}

const GAME_QUERY: &str = r#"
    SELECT
        game_id::bigint AS game_id,
        app_id::bigint AS app_id,
        name,
        release_date::date AS release_date,
        price::float8 AS price,
        required_age::bigint AS required_age,
        dlc_count::bigint AS dlc_count,
        short_description,
        header_image,
        website,
        windows::boolean AS windows,
        mac::boolean AS mac,
        linux::boolean AS linux,
        metacritic_score::bigint AS metacritic_score,
        recommendations::bigint AS recommendations,
        positive_ratings::bigint AS positive_ratings,
        negative_ratings::bigint AS negative_ratings,
        average_playtime_forever::bigint AS average_playtime_forever
    FROM processed.game
    ORDER BY game_id
    LIMIT $1
"#;

impl SourceReader for PgSourceReader {
    async fn read_games(&self, limit: Option<u64>) -> Result<Vec<SourceGame>, MigrationError> {
        // LIMIT NULL returns every row.
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows: Vec<GameRow> = sqlx::query_as(GAME_QUERY)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SourceGame::from).collect())
    }

    async fn related_entity_ids(
        &self,
        kind: EntityKind,
        game_ids: &[i64],
    ) -> Result<Vec<i64>, MigrationError> {
        let query = format!(
            "SELECT DISTINCT {key}::bigint FROM processed.{table} \
             WHERE game_id::bigint = ANY($1) ORDER BY 1",
            key = kind.key_column(),
            table = kind.source_link_table(),
        );
        let rows: Vec<(i64,)> = sqlx::query_as(&query)
            .bind(game_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn read_entities(
        &self,
        kind: EntityKind,
        only: Option<&[i64]>,
    ) -> Result<Vec<SourceEntity>, MigrationError> {
        let key = kind.key_column();
        let table = kind.as_str();
        let query = match only {
            Some(_) => format!(
                "SELECT {key}::bigint, name FROM processed.{table} \
                 WHERE {key}::bigint = ANY($1) ORDER BY {key}"
            ),
            None => format!("SELECT {key}::bigint, name FROM processed.{table} ORDER BY {key}"),
        };

        let mut q = sqlx::query_as::<_, (i64, String)>(&query);
        if let Some(ids) = only {
            q = q.bind(ids);
        }
        let rows = q.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| SourceEntity { id, name })
            .collect())
    }

    async fn read_links(&self, kind: EntityKind) -> Result<Vec<SourceLink>, MigrationError> {
        let count = match kind {
            EntityKind::Tag => "tag_count::bigint",
            _ => "NULL::bigint",
        };
        let query = format!(
            "SELECT game_id::bigint, {key}::bigint, {count} FROM processed.{table}",
            key = kind.key_column(),
            table = kind.source_link_table(),
        );
        let rows: Vec<(i64, i64, Option<i64>)> =
            sqlx::query_as(&query).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(game_id, entity_id, tag_count)| SourceLink {
                game_id,
                entity_id,
                tag_count,
            })
            .collect())
    }
}
