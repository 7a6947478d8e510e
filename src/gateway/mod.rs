//! HTTP gateway (Axum) over the matching engine.
//!
//! This module is primarily used by the `clipstore` server binary.

#![allow(missing_docs)]

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, GatewayError};
pub use handler::{
    add_image_handler, image_status_handler, match_feature_handler, match_image_handler,
    match_text_handler, remove_image_handler, text_feature_handler,
};
pub use state::HandlerState;

use crate::encoder::Encoder;
use crate::scoring::ScoreTransform;
use crate::storage::DurableLog;

/// Response header carrying a short machine-readable status.
pub const CLIPSTORE_STATUS_HEADER: &str = "x-clipstore-status";

pub fn create_router_with_state<L, E>(state: HandlerState<L, E>) -> Router
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<L, E>))
        .route("/v1/images", post(add_image_handler::<L, E>))
        .route(
            "/v1/images/{key}",
            get(image_status_handler::<L, E>).delete(remove_image_handler::<L, E>),
        )
        .route("/v1/match/text", post(match_text_handler::<L, E>))
        .route("/v1/match/image", post(match_image_handler::<L, E>))
        .route("/v1/match/feature", post(match_feature_handler::<L, E>))
        .route("/v1/features/text", post(text_feature_handler::<L, E>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub records: usize,
    pub feature_dim: usize,
    pub family: &'static str,
    pub transform: &'static str,
    pub encoder_mode: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(CLIPSTORE_STATUS_HEADER, HeaderValue::from_static("healthy"));

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler<L, E>(State(state): State<HandlerState<L, E>>) -> Response
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    let engine = &state.engine;
    let transform = match engine.transform() {
        ScoreTransform::Softmax { .. } => "softmax",
        ScoreTransform::Sigmoid { .. } => "sigmoid",
    };
    let encoder_mode = if engine.encoder().is_stub() {
        "stub"
    } else {
        "real"
    };

    let mut headers = HeaderMap::new();
    headers.insert(CLIPSTORE_STATUS_HEADER, HeaderValue::from_static("ready"));

    (
        StatusCode::OK,
        headers,
        Json(ReadyResponse {
            status: "ok",
            records: engine.len(),
            feature_dim: engine.feature_dim(),
            family: engine.family().as_str(),
            transform,
            encoder_mode,
        }),
    )
        .into_response()
}
