// src/handlers/audit.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    engine::run_audit,
    error::AppError,
    models::requests::{AuditRequest, TargetParams},
    store::Stores,
};

/// Runs the requested audit checks over a project and stores new flags.
/// An empty `checks` list runs all of them.
pub async fn audit_project(
    State(stores): State<Stores>,
    Path(project_id): Path<i64>,
    Query(params): Query<TargetParams>,
    Json(payload): Json<AuditRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let store = stores.get(params.target)?;
    let report = run_audit(store.as_ref(), project_id, &payload.checks)
        .await
        .map_err(|e| {
            tracing::error!(project_id, "Audit aborted: {}", e);
            AppError::from(e)
        })?;

    Ok(Json(report))
}
