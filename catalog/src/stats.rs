use serde::{Deserialize, Serialize};

/// Number of collections the catalog store holds: six entity collections and
/// five junction collections.
pub const COLLECTION_COUNT: u64 = 11;

/// Summary served by `GET /api/games/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub total_games: u64,
    pub total_developers: u64,
    pub total_publishers: u64,
    pub total_genres: u64,
    pub avg_price: f64,
    pub avg_metacritic_score: i64,
}

impl GameStats {
    /// Round the raw averages: price to cents, score to a whole number.
    /// A missing average (empty collection) reports as zero.
    pub fn new(
        total_games: u64,
        total_developers: u64,
        total_publishers: u64,
        total_genres: u64,
        avg_price: Option<f64>,
        avg_metacritic_score: Option<f64>,
    ) -> Self {
        Self {
            total_games,
            total_developers,
            total_publishers,
            total_genres,
            avg_price: (avg_price.unwrap_or(0.0) * 100.0).round() / 100.0,
            avg_metacritic_score: avg_metacritic_score.unwrap_or(0.0).round() as i64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCounts {
    pub games: u64,
    pub developers: u64,
    pub publishers: u64,
    pub genres: u64,
    pub categories: u64,
    pub tags: u64,
}

impl CollectionCounts {
    fn sum(&self) -> u64 {
        self.games + self.developers + self.publishers + self.genres + self.categories + self.tags
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipCounts {
    pub game_developers: u64,
    pub game_publishers: u64,
    pub game_genres: u64,
    pub game_categories: u64,
    pub game_tags: u64,
}

impl RelationshipCounts {
    fn sum(&self) -> u64 {
        self.game_developers
            + self.game_publishers
            + self.game_genres
            + self.game_categories
            + self.game_tags
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub collections: u64,
    pub documents: u64,
}

/// Per-collection document counts, reported at the end of a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStatistics {
    pub collections: CollectionCounts,
    pub relationships: RelationshipCounts,
    pub total: Totals,
}

impl CatalogStatistics {
    pub fn new(collections: CollectionCounts, relationships: RelationshipCounts) -> Self {
        let documents = collections.sum() + relationships.sum();
        Self {
            collections,
            relationships,
            total: Totals {
                collections: COLLECTION_COUNT,
                documents,
            },
        }
    }
}
