//! Store-level game filter and its translation to SQL.

use catalog::{DocumentId, Platform};
use sqlx::{QueryBuilder, Sqlite};

use crate::helpers::ids_json;
use crate::StoreError;

/// Filter over the `games` collection. All present criteria must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameQuery {
    /// Restrict to these documents. `Some(vec![])` matches nothing.
    pub ids: Option<Vec<DocumentId>>,
    /// A game matches when its name contains any of the terms, ignoring
    /// case. Terms are stored lowercased.
    pub search_terms: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_score: Option<i64>,
    pub platform: Option<Platform>,
}

impl GameQuery {
    /// Split free-text search into terms on whitespace.
    pub fn with_search(mut self, search: &str) -> Self {
        self.search_terms = search.split_whitespace().map(str::to_lowercase).collect();
        self
    }

    /// True when the id restriction rules out every document.
    pub fn matches_nothing(&self) -> bool {
        matches!(&self.ids, Some(ids) if ids.is_empty())
    }

    /// Append ` WHERE ...` (or nothing) to `qb`.
    pub(crate) fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) -> Result<(), StoreError> {
        let mut first = true;
        let mut and = |qb: &mut QueryBuilder<'_, Sqlite>| {
            qb.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        if let Some(ids) = &self.ids {
            and(qb);
            qb.push("id IN (SELECT value FROM json_each(")
                .push_bind(ids_json(ids)?)
                .push("))");
        }

        if !self.search_terms.is_empty() {
            and(qb);
            qb.push("(");
            for (i, term) in self.search_terms.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("instr(search_name, ")
                    .push_bind(term.clone())
                    .push(") > 0");
            }
            qb.push(")");
        }

        if let Some(min) = self.min_price {
            and(qb);
            qb.push("price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            and(qb);
            qb.push("price <= ").push_bind(max);
        }
        if let Some(min) = self.min_score {
            and(qb);
            qb.push("metacritic_score >= ").push_bind(min);
        }
        if let Some(platform) = self.platform {
            // Column name comes from a closed enum, never from user input.
            and(qb);
            qb.push(platform.as_str()).push(" = 1");
        }

        Ok(())
    }
}
