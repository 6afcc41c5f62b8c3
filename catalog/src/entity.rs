//! Named dimension entities and the links that tie them to games.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DocumentId, Game};

/// The five dimensions a game relates to.
///
/// Each kind owns one entity collection and one junction collection in the
/// catalog store, and one dimension table plus one junction table in the
/// warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Developer,
    Publisher,
    Genre,
    Category,
    Tag,
}

impl EntityKind {
    /// Migration and hydration order.
    pub const ALL: [EntityKind; 5] = [
        Self::Developer,
        Self::Publisher,
        Self::Genre,
        Self::Category,
        Self::Tag,
    ];

    /// Singular lowercase name; also the warehouse dimension table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Publisher => "publisher",
            Self::Genre => "genre",
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }

    /// Entity collection in the catalog store.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Developer => "developers",
            Self::Publisher => "publishers",
            Self::Genre => "genres",
            Self::Category => "categories",
            Self::Tag => "tags",
        }
    }

    /// Junction collection in the catalog store.
    pub fn link_collection(self) -> &'static str {
        match self {
            Self::Developer => "game_developers",
            Self::Publisher => "game_publishers",
            Self::Genre => "game_genres",
            Self::Category => "game_categories",
            Self::Tag => "game_tags",
        }
    }

    /// Column naming the entity on both sides of a junction: the document
    /// reference in the store, the numeric key in the warehouse.
    pub fn key_column(self) -> &'static str {
        match self {
            Self::Developer => "developer_id",
            Self::Publisher => "publisher_id",
            Self::Genre => "genre_id",
            Self::Category => "category_id",
            Self::Tag => "tag_id",
        }
    }

    /// Junction table in the warehouse.
    pub fn source_link_table(self) -> &'static str {
        match self {
            Self::Developer => "game_developer",
            Self::Publisher => "game_publisher",
            Self::Genre => "game_genre",
            Self::Category => "game_category",
            Self::Tag => "game_tag",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A developer, publisher, genre, category or tag document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A junction document. `tag_count` is only ever set for tag links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub game_id: DocumentId,
    pub entity_id: DocumentId,
    pub tag_count: Option<i64>,
}

/// Projection of a related entity embedded in a hydrated game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
}

impl From<NamedEntity> for RelatedEntity {
    fn from(e: NamedEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
        }
    }
}

/// A related tag together with how often it was applied to the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedTag {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// A game with every relation resolved through its junction collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameWithRelations {
    #[serde(flatten)]
    pub game: Game,
    pub developers: Vec<RelatedEntity>,
    pub publishers: Vec<RelatedEntity>,
    pub genres: Vec<RelatedEntity>,
    pub categories: Vec<RelatedEntity>,
    pub tags: Vec<RelatedTag>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn kind_names_are_distinct() {
        let collections: HashSet<_> = EntityKind::ALL.iter().map(|k| k.collection()).collect();
        let links: HashSet<_> = EntityKind::ALL
            .iter()
            .map(|k| k.link_collection())
            .collect();
        assert_eq!(collections.len(), 5);
        assert_eq!(links.len(), 5);
        assert!(collections.is_disjoint(&links));
    }

    #[test]
    fn key_column_matches_singular_name() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.key_column(), format!("{}_id", kind.as_str()));
            assert_eq!(kind.source_link_table(), format!("game_{}", kind.as_str()));
        }
    }

    #[test]
    fn related_tag_omits_missing_count() {
        let tag = RelatedTag {
            id: DocumentId::from("t1"),
            name: "Puzzle".to_string(),
            count: None,
        };
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json, serde_json::json!({"_id": "t1", "name": "Puzzle"}));
    }
}
