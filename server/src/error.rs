use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use catalog_store::StoreError;
use serde::Serialize;

/// Failure envelope: `{"success": false, "error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Game not found")]
    NotFound,

    #[error("Route not found")]
    RouteNotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(err) => match err {
                StoreError::Duplicate(_) | StoreError::Validation(_) => StatusCode::BAD_REQUEST,
                StoreError::Io(_)
                | StoreError::Sqlx(_)
                | StoreError::Migration(_)
                | StoreError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if code.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (code, Json(body)).into_response()
    }
}
