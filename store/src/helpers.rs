//! Row mapping and error classification shared by the SQLite repositories.

use catalog::{DocumentId, Game, NamedEntity, Platforms, Ratings};
use chrono::{DateTime, NaiveDate, Utc};

use crate::StoreError;

/// Column list matching [`GameRow`], in declaration order.
pub const GAME_COLUMNS: &str = "id, app_id, name, release_date, price, required_age, dlc_count, \
     short_description, header_image, website, windows, mac, linux, metacritic_score, \
     recommendations, positive_ratings, negative_ratings, average_playtime_forever, \
     source_id, migrated_at, created_at, updated_at";

/// Row type for game queries, mapped via `sqlx::FromRow`.
#[derive(sqlx::FromRow)]
pub struct GameRow {
    id: String,
    app_id: i64,
    name: String,
    release_date: Option<NaiveDate>,
    price: f64,
    required_age: i64,
    dlc_count: i64,
    short_description: Option<String>,
    header_image: Option<String>,
    website: Option<String>,
    windows: bool,
    mac: bool,
    linux: bool,
    metacritic_score: i64,
    recommendations: i64,
    positive_ratings: i64,
    negative_ratings: i64,
    average_playtime_forever: i64,
    source_id: Option<i64>,
    migrated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GameRow> for Game {
    fn from(r: GameRow) -> Self {
        Self {
            id: DocumentId::from(r.id),
            app_id: r.app_id,
            name: r.name,
            release_date: r.release_date,
            price: r.price,
            required_age: r.required_age,
            dlc_count: r.dlc_count,
            short_description: r.short_description,
            header_image: r.header_image,
            website: r.website,
            platforms: Platforms {
                windows: r.windows,
                mac: r.mac,
                linux: r.linux,
            },
            metacritic_score: r.metacritic_score,
            recommendations: r.recommendations,
            ratings: Ratings {
                positive: r.positive_ratings,
                negative: r.negative_ratings,
            },
            average_playtime_forever: r.average_playtime_forever,
            source_id: r.source_id,
            migrated_at: r.migrated_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Row type for entity queries.
#[derive(sqlx::FromRow)]
pub struct EntityRow {
    id: String,
    name: String,
    source_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EntityRow> for NamedEntity {
    fn from(r: EntityRow) -> Self {
        Self {
            id: DocumentId::from(r.id),
            name: r.name,
            source_id: r.source_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Whether `err` is SQLite rejecting a write on a UNIQUE constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Map a unique-constraint failure on a game write to [`StoreError::Duplicate`].
pub fn classify_game_write(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Duplicate("Game with this appId".to_string())
    } else {
        StoreError::Sqlx(err)
    }
}

/// Encode ids as a JSON array for binding against `json_each(?)`, which
/// keeps large id sets within a single bind parameter.
pub fn ids_json(ids: &[DocumentId]) -> Result<String, StoreError> {
    let raw: Vec<&str> = ids.iter().map(DocumentId::as_str).collect();
    Ok(serde_json::to_string(&raw)?)
}

/// Case-folded copy of a game name, matched by text search. Folding
/// happens here because SQLite's `lower()` leaves non-ASCII letters alone.
pub fn search_name(name: &str) -> String {
    name.to_lowercase()
}

pub fn count_to_u64(n: i64) -> u64 {
    n.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_json_is_a_string_array() {
        let ids = vec![DocumentId::from("a"), DocumentId::from("b\"c")];
        assert_eq!(ids_json(&ids).unwrap(), r#"["a","b\"c"]"#);
        assert_eq!(ids_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn non_database_errors_are_not_duplicates() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(matches!(
            classify_game_write(sqlx::Error::RowNotFound),
            StoreError::Sqlx(_)
        ));
    }
}
