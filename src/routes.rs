// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{audit, health, scoring},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Scoring and audit routes are scoped by project.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let project_routes = Router::new()
        .route(
            "/{project_id}/courses/{course}/score",
            post(scoring::score_course),
        )
        .route("/{project_id}/audit", post(audit::audit_project));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/projects", project_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
