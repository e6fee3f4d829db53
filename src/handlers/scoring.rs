// src/handlers/scoring.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::Config,
    engine::run_scoring,
    error::AppError,
    models::requests::{CoursePath, TargetParams},
    store::Stores,
};

/// Scores every candidate of a project for one course.
///
/// * Candidates that already have a score for the course are left alone.
/// * Per-candidate problems are counted in the report, not returned as errors.
/// * An unreachable database answers 503 and writes nothing.
pub async fn score_course(
    State(stores): State<Stores>,
    State(config): State<Config>,
    Path(path): Path<CoursePath>,
    Query(params): Query<TargetParams>,
) -> Result<impl IntoResponse, AppError> {
    path.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let store = stores.get(params.target)?;
    let report = run_scoring(store, path.project_id, path.course.trim(), config.worker_pool_size)
        .await
        .map_err(|e| {
            tracing::error!(project_id = path.project_id, "Scoring batch aborted: {}", e);
            AppError::from(e)
        })?;

    Ok(Json(report))
}
