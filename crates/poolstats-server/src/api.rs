//! REST API endpoints for poolstats
//!
//! Request and response bodies are JSON with camelCase field names.

use crate::schema::{FieldError, PoolQueryBody, PoolUpsertBody};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use poolstats_core::{PoolError, UpsertStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Upsert response
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PoolUpsertResponse {
    pub status: UpsertStatus,
}

/// Quantile query response
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolQueryResponse {
    pub quantile: f64,
    pub total_count: usize,
}

/// Service status response
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub pool_count: usize,
}

/// Errors surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request body failed validation")]
    Validation(Vec<FieldError>),

    #[error("Pool not found")]
    PoolNotFound,

    #[error("Pool is empty")]
    EmptyPool,

    #[error("Percentile must be in the range (0, 100]")]
    InvalidPercentile,
}

impl From<PoolError> for ApiError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::NotFound(_) => ApiError::PoolNotFound,
            PoolError::OutOfRange(_) => ApiError::EmptyPool,
            PoolError::InvalidArgument(_) => ApiError::InvalidPercentile,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": errors })),
            )
                .into_response(),
            ApiError::PoolNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": message })),
            )
                .into_response(),
            ApiError::EmptyPool | ApiError::InvalidPercentile => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": message })),
            )
                .into_response(),
        }
    }
}

/// POST /pools/upsert
///
/// Creates the pool or appends to it. Answers 201 in both cases, with status
/// `inserted` or `appended`.
pub async fn upsert_pool(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<PoolUpsertResponse>), ApiError> {
    let body = PoolUpsertBody::parse(&body).map_err(ApiError::Validation)?;
    let count = body.pool_values.len();

    let status = state.pools.upsert(body.pool_id, body.pool_values);
    tracing::debug!(pool_id = body.pool_id, count, ?status, "Upsert");

    Ok((StatusCode::CREATED, Json(PoolUpsertResponse { status })))
}

/// POST /pools/query
///
/// Returns the nearest-rank quantile and the pool size it was taken from.
pub async fn query_quantile(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PoolQueryResponse>, ApiError> {
    let body = PoolQueryBody::parse(&body).map_err(ApiError::Validation)?;

    let summary = state
        .pools
        .query(body.pool_id, body.percentile)
        .inspect_err(|e| tracing::debug!(pool_id = body.pool_id, error = %e, "Query failed"))?;

    Ok(Json(PoolQueryResponse {
        quantile: summary.quantile,
        total_count: summary.total_count,
    }))
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(StatusResponse {
        version: poolstats_core::VERSION.to_string(),
        uptime_seconds: uptime,
        pool_count: state.pools.pool_count(),
    })
}
