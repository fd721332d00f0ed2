use crate::http::error::engine_error;
use crate::seasonal::orchestrator::CreateSeasonalEventInput;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

pub async fn create_event(
    State(state): State<AppState>,
    Json(input): Json<CreateSeasonalEventInput>,
) -> impl IntoResponse {
    match state.seasonal.create(input).await {
        Ok(event) => (axum::http::StatusCode::CREATED, Json(event)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn list_events(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.seasonal.list().await)
}

/// Materializes the event's promotion templates. Safe to call twice;
/// already-spawned promotions are reported but not duplicated.
pub async fn activate_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.seasonal.activate(event_id).await {
        Ok(spawned) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({"spawned": spawned.len(), "promotions": spawned})),
        )
            .into_response(),
        Err(err) => engine_error(&err),
    }
}
