// src/models/requests.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::audit::AuditCheck;

/// Which database a batch runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Local,
    Online,
}

/// Query string shared by the batch endpoints (`?target=online`).
#[derive(Debug, Default, Deserialize)]
pub struct TargetParams {
    #[serde(default)]
    pub target: Target,
}

/// DTO for requesting an audit run. An empty list runs every check.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AuditRequest {
    #[serde(default)]
    #[validate(length(max = 6, message = "At most 6 checks can be requested."))]
    pub checks: Vec<AuditCheck>,
}

/// Path segment validation for the scoring endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct CoursePath {
    pub project_id: i64,
    #[validate(length(min = 1, max = 64, message = "Course must be between 1 and 64 characters."))]
    pub course: String,
}
