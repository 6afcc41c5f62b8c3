//! The game document and the payloads that create or change it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::DocumentId;

/// Reasons a game payload is rejected before it reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name is required")]
    MissingName,
    #[error("price must not be negative (got {0})")]
    NegativePrice(f64),
    #[error("{field} must not be negative (got {value})")]
    NegativeCount { field: &'static str, value: i64 },
}

/// Platforms a game ships on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platforms {
    pub windows: bool,
    pub mac: bool,
    pub linux: bool,
}

/// User rating tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ratings {
    pub positive: i64,
    pub negative: i64,
}

/// A game document as held by the catalog store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub app_id: i64,
    pub name: String,
    pub release_date: Option<NaiveDate>,
    pub price: f64,
    pub required_age: i64,
    pub dlc_count: i64,
    pub short_description: Option<String>,
    pub header_image: Option<String>,
    pub website: Option<String>,
    pub platforms: Platforms,
    pub metacritic_score: i64,
    pub recommendations: i64,
    pub ratings: Ratings,
    pub average_playtime_forever: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// Merge the fields present in `patch` into this document.
    ///
    /// `updated_at` is left alone; the store stamps it on write.
    pub fn apply(&mut self, patch: GamePatch) {
        let GamePatch {
            app_id,
            name,
            release_date,
            price,
            required_age,
            dlc_count,
            short_description,
            header_image,
            website,
            platforms,
            metacritic_score,
            recommendations,
            ratings,
            average_playtime_forever,
        } = patch;

        if let Some(v) = app_id {
            self.app_id = v;
        }
        if let Some(v) = name {
            self.name = v;
        }
        if release_date.is_some() {
            self.release_date = release_date;
        }
        if let Some(v) = price {
            self.price = v;
        }
        if let Some(v) = required_age {
            self.required_age = v;
        }
        if let Some(v) = dlc_count {
            self.dlc_count = v;
        }
        if short_description.is_some() {
            self.short_description = short_description;
        }
        if header_image.is_some() {
            self.header_image = header_image;
        }
        if website.is_some() {
            self.website = website;
        }
        if let Some(p) = platforms {
            p.merge_into(&mut self.platforms);
        }
        if let Some(v) = metacritic_score {
            self.metacritic_score = v;
        }
        if let Some(v) = recommendations {
            self.recommendations = v;
        }
        if let Some(r) = ratings {
            r.merge_into(&mut self.ratings);
        }
        if let Some(v) = average_playtime_forever {
            self.average_playtime_forever = v;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            &self.name,
            self.price,
            &[
                ("requiredAge", self.required_age),
                ("dlcCount", self.dlc_count),
                ("metacriticScore", self.metacritic_score),
                ("recommendations", self.recommendations),
                ("averagePlaytimeForever", self.average_playtime_forever),
            ],
        )
    }
}

/// Payload for creating a game through the API.
///
/// Only `appId` and `name` are required; everything else defaults the same
/// way a migrated row with `NULL` columns does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub app_id: i64,
    pub name: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub required_age: i64,
    #[serde(default)]
    pub dlc_count: i64,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub header_image: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub platforms: Platforms,
    #[serde(default)]
    pub metacritic_score: i64,
    #[serde(default)]
    pub recommendations: i64,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub average_playtime_forever: i64,
}

impl NewGame {
    /// Minimal payload with every optional field at its default.
    pub fn new(app_id: i64, name: impl Into<String>) -> Self {
        Self {
            app_id,
            name: name.into(),
            release_date: None,
            price: 0.0,
            required_age: 0,
            dlc_count: 0,
            short_description: None,
            header_image: None,
            website: None,
            platforms: Platforms::default(),
            metacritic_score: 0,
            recommendations: 0,
            ratings: Ratings::default(),
            average_playtime_forever: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            &self.name,
            self.price,
            &[
                ("requiredAge", self.required_age),
                ("dlcCount", self.dlc_count),
                ("metacriticScore", self.metacritic_score),
                ("recommendations", self.recommendations),
                ("averagePlaytimeForever", self.average_playtime_forever),
            ],
        )
    }
}

fn validate_fields(
    name: &str,
    price: f64,
    counts: &[(&'static str, i64)],
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if price < 0.0 || price.is_nan() {
        return Err(ValidationError::NegativePrice(price));
    }
    for &(field, value) in counts {
        if value < 0 {
            return Err(ValidationError::NegativeCount { field, value });
        }
    }
    Ok(())
}

/// Partial platform update; absent flags keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformsPatch {
    pub windows: Option<bool>,
    pub mac: Option<bool>,
    pub linux: Option<bool>,
}

impl PlatformsPatch {
    fn merge_into(self, target: &mut Platforms) {
        if let Some(v) = self.windows {
            target.windows = v;
        }
        if let Some(v) = self.mac {
            target.mac = v;
        }
        if let Some(v) = self.linux {
            target.linux = v;
        }
    }
}

/// Partial ratings update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingsPatch {
    pub positive: Option<i64>,
    pub negative: Option<i64>,
}

impl RatingsPatch {
    fn merge_into(self, target: &mut Ratings) {
        if let Some(v) = self.positive {
            target.positive = v;
        }
        if let Some(v) = self.negative {
            target.negative = v;
        }
    }
}

/// Payload for `PUT /api/games/{id}`: only the fields present are changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GamePatch {
    pub app_id: Option<i64>,
    pub name: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub required_age: Option<i64>,
    pub dlc_count: Option<i64>,
    pub short_description: Option<String>,
    pub header_image: Option<String>,
    pub website: Option<String>,
    pub platforms: Option<PlatformsPatch>,
    pub metacritic_score: Option<i64>,
    pub recommendations: Option<i64>,
    pub ratings: Option<RatingsPatch>,
    pub average_playtime_forever: Option<i64>,
}

/// A row of the warehouse's `game` table.
///
/// Every column except the keys and the name may be `NULL` in the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGame {
    pub game_id: i64,
    pub app_id: i64,
    pub name: String,
    pub release_date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub required_age: Option<i64>,
    pub dlc_count: Option<i64>,
    pub short_description: Option<String>,
    pub header_image: Option<String>,
    pub website: Option<String>,
    pub windows: Option<bool>,
    pub mac: Option<bool>,
    pub linux: Option<bool>,
    pub metacritic_score: Option<i64>,
    pub recommendations: Option<i64>,
    pub positive_ratings: Option<i64>,
    pub negative_ratings: Option<i64>,
    pub average_playtime_forever: Option<i64>,
}

impl SourceGame {
    /// Document payload for this row, `NULL`s replaced by defaults.
    pub fn to_new_game(&self) -> NewGame {
        NewGame {
            app_id: self.app_id,
            name: self.name.clone(),
            release_date: self.release_date,
            price: self.price.unwrap_or(0.0),
            required_age: self.required_age.unwrap_or(0),
            dlc_count: self.dlc_count.unwrap_or(0),
            short_description: self.short_description.clone(),
            header_image: self.header_image.clone(),
            website: self.website.clone(),
            platforms: Platforms {
                windows: self.windows.unwrap_or(false),
                mac: self.mac.unwrap_or(false),
                linux: self.linux.unwrap_or(false),
            },
            metacritic_score: self.metacritic_score.unwrap_or(0),
            recommendations: self.recommendations.unwrap_or(0),
            ratings: Ratings {
                positive: self.positive_ratings.unwrap_or(0),
                negative: self.negative_ratings.unwrap_or(0),
            },
            average_playtime_forever: self.average_playtime_forever.unwrap_or(0),
        }
    }
}
