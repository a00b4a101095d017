use axum::body::{to_bytes, Body};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use pod_types::Digest;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::router::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResponse {
    pub digest: Digest,
    pub size: usize,
}

fn parse_digest(raw: &str) -> ServerResult<Digest> {
    Digest::from_hex(raw).map_err(|e| ServerError::InvalidDigest(e.to_string()))
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// `PUT /objects`
pub async fn put_object(
    State(state): State<AppState>,
    body: Body,
) -> ServerResult<Json<PutResponse>> {
    let bytes = to_bytes(body, state.max_object_size)
        .await
        .map_err(|_| ServerError::PayloadTooLarge {
            max: state.max_object_size,
        })?;
    let digest = state.store.put(&bytes).await?;
    tracing::debug!(digest = %digest.short_hex(), size = bytes.len(), "object stored");
    Ok(Json(PutResponse {
        digest,
        size: bytes.len(),
    }))
}

/// `GET /objects/{digest}`; also answers `HEAD`.
pub async fn get_object(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let digest = parse_digest(&raw)?;
    let bytes = state.store.get(&digest).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}

/// `POST /pins/{digest}`
pub async fn pin_object(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ServerResult<StatusCode> {
    let digest = parse_digest(&raw)?;
    state.store.pin(&digest).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /pins/{digest}`
pub async fn unpin_object(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ServerResult<StatusCode> {
    let digest = parse_digest(&raw)?;
    state.store.unpin(&digest).await?;
    Ok(StatusCode::NO_CONTENT)
}
