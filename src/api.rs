//! HTTP query surface.
//!
//! A thin axum router exposing `GET /orders?symbol=S&limit=W`: parse the
//! query, build a snapshot, serialize it. The `limit` is the price-band
//! half-width; a missing or non-positive limit leaves the query
//! unrestricted. Unknown symbols map to 404 and transient store or oracle
//! failures to 503 with a generic message; the underlying error text is
//! logged, never echoed to the client.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::book::{OrderBookSnapshot, SnapshotBuilder};
use crate::error::Error;
use crate::types::Price;

/// Shared state for the query router
#[derive(Clone)]
pub struct ApiState {
    snapshots: Arc<SnapshotBuilder>,
}

impl ApiState {
    /// Wrap a snapshot builder for the router
    #[must_use]
    pub fn new(snapshots: Arc<SnapshotBuilder>) -> Self {
        Self { snapshots }
    }
}

/// Build the query router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/orders", get(order_book))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct DepthParams {
    symbol: String,
    limit: Option<Price>,
}

async fn order_book(
    State(state): State<ApiState>,
    Query(params): Query<DepthParams>,
) -> Result<Json<OrderBookSnapshot>, ApiError> {
    if params.symbol.is_empty() {
        return Err(ApiError::BadRequest("symbol must not be empty".to_string()));
    }
    let snapshot = state.snapshots.build(&params.symbol, params.limit).await?;
    Ok(Json(snapshot))
}

/// Errors surfaced by the query API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing query parameters
    #[error("{0}")]
    BadRequest(String),

    /// Symbol unknown to the price oracle
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Store or oracle temporarily unavailable
    #[error("snapshot temporarily unavailable")]
    Unavailable,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::SymbolNotFound(symbol) => ApiError::UnknownSymbol(symbol),
            err => {
                error!(error = %err, "snapshot query failed");
                ApiError::Unavailable
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::UnknownSymbol(_) => (StatusCode::NOT_FOUND, "unknown_symbol"),
            ApiError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        };
        let body = Json(json!({
            "error": code,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
