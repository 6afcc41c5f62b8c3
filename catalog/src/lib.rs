//! Domain types for the Steam game catalog.
//!
//! Everything here is storage-agnostic: the document store, the HTTP API and
//! the warehouse migration all speak in these types.

pub mod entity;
pub mod filter;
pub mod game;
pub mod id;
pub mod stats;

pub use entity::{EntityKind, GameWithRelations, Link, NamedEntity, RelatedEntity, RelatedTag};
pub use filter::{GameFilter, PageRequest, Pagination, Platform, UnknownPlatform};
pub use game::{
    Game, GamePatch, NewGame, Platforms, PlatformsPatch, Ratings, RatingsPatch, SourceGame,
    ValidationError,
};
pub use id::DocumentId;
pub use stats::{CatalogStatistics, CollectionCounts, GameStats, RelationshipCounts, Totals};
