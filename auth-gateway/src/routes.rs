use crate::middleware::{verify_skill_request, SkillRequestGuard};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cached_certificates: usize,
}

/// Gateway router: `GET /health` plus the signature-guarded skill endpoint at `skill_route`
pub fn router(guard: SkillRequestGuard, skill_route: &str) -> Router {
    let health_guard = guard.clone();

    let skill = Router::new()
        .route(skill_route, post(acknowledge))
        .route_layer(from_fn_with_state(guard, verify_skill_request));

    Router::new()
        .route(
            "/health",
            get(move || async move {
                Json(HealthResponse {
                    status: "healthy",
                    version: env!("CARGO_PKG_VERSION"),
                    cached_certificates: health_guard.authenticator().cache().len(),
                })
            }),
        )
        .merge(skill)
        .layer(TraceLayer::new_for_http())
}

/// Minimal skill response ending the session; handling the request itself is left to downstream services
async fn acknowledge() -> Json<Value> {
    Json(json!({
        "version": "1.0",
        "response": {
            "shouldEndSession": true
        }
    }))
}
