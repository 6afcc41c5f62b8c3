//! Typed game filters and pagination.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// A platform a game can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Mac,
    Linux,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Mac => "mac",
            Self::Linux => "linux",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" => Ok(Self::Windows),
            "mac" => Ok(Self::Mac),
            "linux" => Ok(Self::Linux),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// What a caller asked to filter games by. Every criterion is optional and
/// all present criteria must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameFilter {
    pub search: Option<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_score: Option<i64>,
    pub platform: Option<Platform>,
}

/// Requested page. Page numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Missing or non-positive values fall back to the defaults.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p > 0 => p as u64,
            _ => DEFAULT_PAGE,
        };
        let limit = match limit {
            Some(l) if l > 0 => l as u64,
            _ => DEFAULT_PAGE_LIMIT,
        };
        Self { page, limit }
    }

    /// Number of matches before this page. Saturates, so a page far past
    /// the end still lies past every match.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total.div_ceil(self.limit),
        }
    }
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}
