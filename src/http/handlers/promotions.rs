use crate::domain::promotion::PackageData;
use crate::domain::targeting::UserAttributes;
use crate::http::error::engine_error;
use crate::promotions::registry::CreatePromotionInput;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

pub async fn create_promotion(
    State(state): State<AppState>,
    Json(input): Json<CreatePromotionInput>,
) -> impl IntoResponse {
    match state.promotions.create(input).await {
        Ok(promotion) => (axum::http::StatusCode::CREATED, Json(promotion)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn list_promotions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.promotions.list().await)
}

#[derive(Debug, serde::Deserialize)]
pub struct ActiveQuery {
    pub package_id: Option<String>,
    pub user_id: Option<String>,
}

pub async fn list_active(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> impl IntoResponse {
    let attrs = match &query.user_id {
        Some(user_id) => Some(
            state
                .identity
                .lookup(user_id)
                .await
                .unwrap_or_else(|| UserAttributes::anonymous(user_id)),
        ),
        None => None,
    };

    Json(
        state
            .promotions
            .list_active(query.package_id.as_deref(), attrs.as_ref())
            .await,
    )
}

#[derive(Debug, serde::Deserialize)]
pub struct ApplyRequest {
    pub amount: f64,
    pub package: PackageData,
    pub user_id: Option<String>,
}

/// Redemption endpoint. Ineligible outcomes are 200 with a typed body so
/// the storefront can fall back to full price without special-casing.
pub async fn apply_promotion(
    State(state): State<AppState>,
    Path(promotion_id): Path<String>,
    Json(req): Json<ApplyRequest>,
) -> impl IntoResponse {
    let attrs = match &req.user_id {
        Some(user_id) => Some(
            state
                .identity
                .lookup(user_id)
                .await
                .unwrap_or_else(|| UserAttributes::anonymous(user_id)),
        ),
        None => None,
    };

    match state
        .promotions
        .apply(&promotion_id, req.amount, &req.package, attrs.as_ref())
        .await
    {
        Ok(outcome) => (axum::http::StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn pause_promotion(
    State(state): State<AppState>,
    Path(promotion_id): Path<String>,
) -> impl IntoResponse {
    match state.promotions.pause(&promotion_id).await {
        Ok(promotion) => (axum::http::StatusCode::OK, Json(promotion)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn resume_promotion(
    State(state): State<AppState>,
    Path(promotion_id): Path<String>,
) -> impl IntoResponse {
    match state.promotions.resume(&promotion_id).await {
        Ok(promotion) => (axum::http::StatusCode::OK, Json(promotion)).into_response(),
        Err(err) => engine_error(&err),
    }
}
