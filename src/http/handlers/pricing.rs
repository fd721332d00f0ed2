use crate::domain::pricing::{MarketState, PricingRule};
use crate::http::error::engine_error;
use crate::pricing::engine::CreatePricingInput;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

pub async fn create_pricing(
    State(state): State<AppState>,
    Json(input): Json<CreatePricingInput>,
) -> impl IntoResponse {
    match state.pricing.create(input).await {
        Ok(entry) => (axum::http::StatusCode::CREATED, Json(entry)).into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn list_pricing(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.pricing.list().await)
}

/// Storefront price lookup: `price` is null for unknown or inactive
/// packages so the caller falls back to its static price.
pub async fn get_price(
    State(state): State<AppState>,
    Path(package_id): Path<String>,
) -> impl IntoResponse {
    let price = state.pricing.current_price(&package_id).await;
    Json(serde_json::json!({
        "package_id": package_id,
        "price": price,
    }))
}

pub async fn get_pricing(
    State(state): State<AppState>,
    Path(package_id): Path<String>,
) -> impl IntoResponse {
    match state.pricing.get(&package_id).await {
        Some(entry) => (axum::http::StatusCode::OK, Json(entry)).into_response(),
        None => (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("pricing for package {package_id} not found")})),
        )
            .into_response(),
    }
}

pub async fn add_rule(
    State(state): State<AppState>,
    Path(package_id): Path<String>,
    Json(rule): Json<PricingRule>,
) -> impl IntoResponse {
    match state.pricing.add_rule(&package_id, rule).await {
        Ok(entry) => (axum::http::StatusCode::OK, Json(entry)).into_response(),
        Err(err) => engine_error(&err),
    }
}

/// On-demand recalculation, same evaluation the scheduler runs.
pub async fn recalculate(
    State(state): State<AppState>,
    Path(package_id): Path<String>,
) -> impl IntoResponse {
    let now = state.clock.now();
    let mut market = state.pricing.market_snapshot().await;
    market.active_seasonal_categories = state.seasonal.active_categories(now).await;

    match state.pricing.recalculate(&package_id, &market).await {
        Ok(change) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({"changed": change.is_some(), "change": change})),
        )
            .into_response(),
        Err(err) => engine_error(&err),
    }
}

pub async fn set_market(
    State(state): State<AppState>,
    Json(market): Json<MarketState>,
) -> impl IntoResponse {
    state.pricing.set_market(market).await;
    axum::http::StatusCode::NO_CONTENT
}
