use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, instrument};

use crate::constants::DEFAULT_TOP_K;
use crate::encoder::{ClipImage, Encoder};
use crate::engine::{EngineResult, MatchEngine};
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::scoring::MatchResult;
use crate::storage::DurableLog;

#[derive(Debug, Deserialize)]
pub struct AddImageRequest {
    pub key: String,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub feature: Option<Vec<f32>>,
    #[serde(default)]
    pub image: Option<ClipImage>,
}

#[derive(Debug, Serialize)]
pub struct AddImageResponse {
    pub key: String,
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
pub struct ImageStatusResponse {
    pub key: String,
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
pub struct TextMatchRequest {
    pub text: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ImageMatchRequest {
    pub image: ClipImage,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FeatureMatchRequest {
    pub feature: Vec<f32>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub results: Vec<MatchResult>,
    pub elapsed_ms: f64,
}

#[derive(Debug, Deserialize)]
pub struct TextFeatureRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TextFeatureResponse {
    pub feature: Vec<f32>,
}

pub(crate) fn parse_request<T: DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, GatewayError> {
    serde_json::from_value(value)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))
}

/// Runs a blocking engine call off the async runtime.
async fn run_engine<L, E, T, F>(state: &HandlerState<L, E>, op: F) -> Result<T, GatewayError>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
    T: Send + 'static,
    F: FnOnce(&MatchEngine<L, E>) -> EngineResult<T> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || op(&engine))
        .await
        .map_err(|e| GatewayError::InternalError(format!("Engine task failed: {}", e)))?
        .map_err(GatewayError::from)
}

fn match_response(results: Vec<MatchResult>, started: Instant) -> Response {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(returned = results.len(), elapsed_ms, "Match request served");
    (
        StatusCode::OK,
        Json(MatchResponse {
            results,
            elapsed_ms,
        }),
    )
        .into_response()
}

#[instrument(skip(state, request), fields(key = tracing::field::Empty))]
pub async fn add_image_handler<L, E>(
    State(state): State<HandlerState<L, E>>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    let request: AddImageRequest = parse_request(request)?;
    tracing::Span::current().record("key", tracing::field::display(&request.key));

    let AddImageRequest {
        key,
        overwrite,
        feature,
        image,
    } = request;

    let stored_key = key.clone();
    match (feature, image) {
        (Some(feature), None) => {
            run_engine(&state, move |engine| {
                engine.add_feature(&stored_key, &feature, overwrite)
            })
            .await?
        }
        (None, Some(image)) => {
            run_engine(&state, move |engine| {
                engine.add_image(&stored_key, &image, overwrite)
            })
            .await?
        }
        _ => {
            return Err(GatewayError::InvalidRequest(
                "exactly one of 'feature' or 'image' is required".to_string(),
            ));
        }
    }

    info!(key = %key, overwrite, "Image stored");
    Ok((
        StatusCode::CREATED,
        Json(AddImageResponse { key, overwrite }),
    )
        .into_response())
}

#[instrument(skip(state))]
pub async fn image_status_handler<L, E>(
    State(state): State<HandlerState<L, E>>,
    Path(key): Path<String>,
) -> Response
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    let exists = state.engine.contains(&key);
    (StatusCode::OK, Json(ImageStatusResponse { key, exists })).into_response()
}

#[instrument(skip(state))]
pub async fn remove_image_handler<L, E>(
    State(state): State<HandlerState<L, E>>,
    Path(key): Path<String>,
) -> Result<Response, GatewayError>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    let removed_key = key.clone();
    run_engine(&state, move |engine| engine.remove(&removed_key)).await?;

    info!(key = %key, "Image removed");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[instrument(skip(state, request))]
pub async fn match_text_handler<L, E>(
    State(state): State<HandlerState<L, E>>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    let request: TextMatchRequest = parse_request(request)?;
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
    let started = Instant::now();

    let results = run_engine(&state, move |engine| {
        engine.match_by_text(&request.text, top_k)
    })
    .await?;

    Ok(match_response(results, started))
}

#[instrument(skip(state, request))]
pub async fn match_image_handler<L, E>(
    State(state): State<HandlerState<L, E>>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    let request: ImageMatchRequest = parse_request(request)?;
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
    let started = Instant::now();

    let results = run_engine(&state, move |engine| {
        engine.match_by_image(&request.image, top_k)
    })
    .await?;

    Ok(match_response(results, started))
}

#[instrument(skip(state, request))]
pub async fn match_feature_handler<L, E>(
    State(state): State<HandlerState<L, E>>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    let request: FeatureMatchRequest = parse_request(request)?;
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
    let started = Instant::now();

    let results = run_engine(&state, move |engine| {
        engine.match_by_feature(&request.feature, top_k)
    })
    .await?;

    Ok(match_response(results, started))
}

#[instrument(skip(state, request))]
pub async fn text_feature_handler<L, E>(
    State(state): State<HandlerState<L, E>>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    let request: TextFeatureRequest = parse_request(request)?;

    let feature = run_engine(&state, move |engine| engine.get_text_feature(&request.text)).await?;

    Ok((StatusCode::OK, Json(TextFeatureResponse { feature })).into_response())
}
