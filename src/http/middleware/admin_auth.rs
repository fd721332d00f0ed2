use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub const ADMIN_KEY_HEADER: &str = "X-Internal-Api-Key";

/// Gate for the admin surface. Rejections use the same JSON error
/// envelope as `http::error`, never a bare text body.
pub async fn require_internal_api_key(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    if provided != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": format!("missing or invalid {ADMIN_KEY_HEADER} header"),
            })),
        )
            .into_response();
    }

    next.run(request).await
}
