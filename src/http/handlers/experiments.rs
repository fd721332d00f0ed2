use crate::domain::experiment::EventType;
use crate::domain::targeting::UserAttributes;
use crate::experiments::registry::CreateExperimentInput;
use crate::http::error::engine_error;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

pub async fn create_experiment(
    State(state): State<AppState>,
    Json(input): Json<CreateExperimentInput>,
) -> impl IntoResponse {
    match state.experiments.create(input).await {
        Ok(experiment) => (axum::http::StatusCode::CREATED, Json(experiment)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn start_experiment(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.experiments.start(experiment_id).await {
        Ok(experiment) => (axum::http::StatusCode::OK, Json(experiment)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn pause_experiment(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.experiments.pause(experiment_id).await {
        Ok(experiment) => (axum::http::StatusCode::OK, Json(experiment)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn resume_experiment(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.experiments.resume(experiment_id).await {
        Ok(experiment) => (axum::http::StatusCode::OK, Json(experiment)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn complete_experiment(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.experiments.complete(experiment_id).await {
        Ok(experiment) => (axum::http::StatusCode::OK, Json(experiment)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn list_experiments(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.experiments.list().await)
}

pub async fn get_results(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.experiments.results(experiment_id).await {
        Ok(results) => (axum::http::StatusCode::OK, Json(results)).into_response(),
        Err(err) => engine_error(&err),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct VariantQuery {
    pub user_id: String,
}

/// Sticky variant lookup for the storefront. Always 200; a user outside
/// the experiment gets `variant_id: null`.
pub async fn get_variant(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
    Query(query): Query<VariantQuery>,
) -> impl IntoResponse {
    let attrs = state
        .identity
        .lookup(&query.user_id)
        .await
        .unwrap_or_else(|| UserAttributes::anonymous(&query.user_id));

    let variant_id = state.experiments.assign(experiment_id, &attrs).await;
    let config = match &variant_id {
        Some(id) => state.experiments.variant_config(experiment_id, id).await,
        None => None,
    };

    Json(serde_json::json!({
        "experiment_id": experiment_id,
        "user_id": query.user_id,
        "variant_id": variant_id,
        "config": config,
    }))
}

pub async fn get_variant_config(
    State(state): State<AppState>,
    Path((experiment_id, variant_id)): Path<(Uuid, String)>,
) -> impl IntoResponse {
    match state
        .experiments
        .variant_config(experiment_id, &variant_id)
        .await
    {
        Some(config) => (axum::http::StatusCode::OK, Json(config)).into_response(),
        None => (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "unknown experiment or variant"})),
        )
            .into_response(),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct TrackEventRequest {
    pub user_id: String,
    pub event_type: EventType,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Telemetry never fails the caller: 202 whether or not an assignment
/// exists.
pub async fn track_event(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
    Json(req): Json<TrackEventRequest>,
) -> impl IntoResponse {
    state
        .experiments
        .track(experiment_id, &req.user_id, req.event_type, req.metadata)
        .await;
    axum::http::StatusCode::ACCEPTED
}
