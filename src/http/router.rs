use crate::http::handlers::{experiments, ops, pricing, promotions, seasonal};
use crate::http::middleware::admin_auth::require_internal_api_key;
use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;

/// Assembles the full surface: storefront endpoints stay open, everything
/// else (creation, lifecycle, listings, market input) sits behind the
/// internal API key.
pub fn build(state: AppState, admin_key: String) -> Router {
    let admin = Router::new()
        .route(
            "/experiments",
            post(experiments::create_experiment).get(experiments::list_experiments),
        )
        .route("/experiments/:id/start", post(experiments::start_experiment))
        .route("/experiments/:id/pause", post(experiments::pause_experiment))
        .route("/experiments/:id/resume", post(experiments::resume_experiment))
        .route(
            "/experiments/:id/complete",
            post(experiments::complete_experiment),
        )
        .route("/experiments/:id/results", get(experiments::get_results))
        .route(
            "/promotions",
            post(promotions::create_promotion).get(promotions::list_promotions),
        )
        .route("/promotions/:id/pause", post(promotions::pause_promotion))
        .route("/promotions/:id/resume", post(promotions::resume_promotion))
        .route(
            "/pricing",
            post(pricing::create_pricing).get(pricing::list_pricing),
        )
        .route("/pricing/:package_id/rules", post(pricing::add_rule))
        .route("/pricing/:package_id/recalculate", post(pricing::recalculate))
        .route("/pricing/:package_id/detail", get(pricing::get_pricing))
        .route("/pricing/market", put(pricing::set_market))
        .route(
            "/seasonal-events",
            post(seasonal::create_event).get(seasonal::list_events),
        )
        .route("/seasonal-events/:id/activate", post(seasonal::activate_event))
        .layer(from_fn_with_state(admin_key, require_internal_api_key));

    Router::new()
        .route("/health", get(ops::liveness))
        .route("/experiments/:id/variant", get(experiments::get_variant))
        .route(
            "/experiments/:id/variants/:variant_id/config",
            get(experiments::get_variant_config),
        )
        .route("/experiments/:id/events", post(experiments::track_event))
        .route("/promotions/active", get(promotions::list_active))
        .route("/promotions/:id/apply", post(promotions::apply_promotion))
        .route("/pricing/:package_id", get(pricing::get_price))
        .route("/ops/readiness", get(ops::readiness))
        .route("/ops/liveness", get(ops::liveness))
        .merge(admin)
        .with_state(state)
}
