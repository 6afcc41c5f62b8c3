//! HTTP routes for the catalog API.
//!
//! Every response uses the same envelope: `{"success": true, "data": ...}`
//! on success (plus `pagination` for lists and `message` for deletes) and
//! `{"success": false, "error": "..."}` on failure.

use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use catalog::{
    DocumentId, Game, GameFilter, GamePatch, GameStats, GameWithRelations, NewGame, PageRequest,
    Pagination, Platform,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            pagination: None,
            message: None,
        }
    }

    fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/games", get(list_games).post(create_game))
        .route("/api/games/stats", get(game_stats))
        .route("/api/games/app/{app_id}", get(get_game_by_app_id))
        .route(
            "/api/games/{id}",
            get(get_game).put(update_game).delete(delete_game),
        )
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "Steam Games API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "games": "/api/games",
            "stats": "/api/games/stats",
            "health": "/health",
        },
    }))
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
    /// Seconds since the server started.
    uptime: f64,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "OK",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Raw query string of `GET /api/games`. Values are kept as text so that a
/// malformed number drops that one criterion instead of failing the request.
#[derive(Debug, Default)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_score: Option<String>,
    pub platform: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_param<T: FromStr>(value: &Option<String>) -> Option<T> {
    non_empty(value)?.parse().ok()
}

impl ListParams {
    /// Picks the known keys out of decoded query pairs. Unknown keys are
    /// dropped and the first value of a repeated key wins.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                "search" => &mut params.search,
                "genre" => &mut params.genre,
                "developer" => &mut params.developer,
                "publisher" => &mut params.publisher,
                "minPrice" => &mut params.min_price,
                "maxPrice" => &mut params.max_price,
                "minScore" => &mut params.min_score,
                "platform" => &mut params.platform,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(parse_param(&self.page), parse_param(&self.limit))
    }

    pub fn filter(&self) -> GameFilter {
        let platform = non_empty(&self.platform).and_then(|raw| match Platform::from_str(raw) {
            Ok(platform) => Some(platform),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring platform filter");
                None
            }
        });

        GameFilter {
            search: non_empty(&self.search).map(str::to_string),
            developer: non_empty(&self.developer).map(str::to_string),
            publisher: non_empty(&self.publisher).map(str::to_string),
            genre: non_empty(&self.genre).map(str::to_string),
            min_price: parse_param(&self.min_price),
            max_price: parse_param(&self.max_price),
            min_score: parse_param(&self.min_score),
            platform,
        }
    }
}

async fn list_games(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Vec<GameWithRelations>> {
    let params = match params {
        Ok(Query(pairs)) => ListParams::from_pairs(pairs),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable query string");
            ListParams::default()
        }
    };
    let filter = params.filter();
    let page = params.page_request();
    tracing::debug!(?filter, page = page.page, limit = page.limit, "GET /api/games");

    let (games, pagination) = state
        .catalog
        .find_games_with_relations(&filter, page)
        .await?;
    Ok(Json(ApiResponse::ok(games).with_pagination(pagination)))
}

async fn game_stats(State(state): State<AppState>) -> ApiResult<GameStats> {
    let stats = state.catalog.statistics().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<GameWithRelations> {
    let game = state
        .catalog
        .find_game_with_relations(&DocumentId::from(id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ApiResponse::ok(game)))
}

async fn get_game_by_app_id(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
) -> ApiResult<GameWithRelations> {
    // A non-numeric app id cannot match any game.
    let app_id: i64 = app_id.trim().parse().map_err(|_| ApiError::NotFound)?;
    let game = state
        .catalog
        .find_game_by_app_id_with_relations(app_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ApiResponse::ok(game)))
}

async fn create_game(
    State(state): State<AppState>,
    payload: Result<Json<NewGame>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Game>>), ApiError> {
    let Json(new_game) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let game = state.catalog.create_game(&new_game).await?;
    tracing::info!(id = %game.id, app_id = game.app_id, "Created game");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(game))))
}

async fn update_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<GamePatch>, JsonRejection>,
) -> ApiResult<Game> {
    let Json(patch) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let game = state
        .catalog
        .update_game(&DocumentId::from(id), patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(id = %game.id, "Updated game");
    Ok(Json(ApiResponse::ok(game)))
}

async fn delete_game(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Game> {
    let game = state
        .catalog
        .delete_game(&DocumentId::from(id))
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(id = %game.id, app_id = game.app_id, "Deleted game");
    Ok(Json(
        ApiResponse::ok(game).with_message("Game deleted successfully"),
    ))
}
