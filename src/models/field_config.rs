// src/models/field_config.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Validation attributes of one record field within a project.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub field_name: String,
    pub min_range: Option<f64>,
    pub max_range: Option<f64>,
    pub allowed_responses: Option<Vec<String>>,
}

impl FieldConfig {
    pub fn range(field_name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            field_name: field_name.into(),
            min_range: Some(min),
            max_range: Some(max),
            allowed_responses: None,
        }
    }

    pub fn options<I, S>(field_name: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_name: field_name.into(),
            min_range: None,
            max_range: None,
            allowed_responses: Some(allowed.into_iter().map(Into::into).collect()),
        }
    }

    pub fn has_range(&self) -> bool {
        self.min_range.is_some() || self.max_range.is_some()
    }

    pub fn has_allowed_responses(&self) -> bool {
        self.allowed_responses
            .as_ref()
            .is_some_and(|allowed| !allowed.is_empty())
    }

    /// Missing bounds are open.
    pub fn in_range(&self, value: f64) -> bool {
        self.min_range.is_none_or(|min| value >= min)
            && self.max_range.is_none_or(|max| value <= max)
    }

    pub fn allows(&self, value: &str) -> bool {
        let value = value.trim();
        self.allowed_responses
            .as_ref()
            .is_some_and(|allowed| allowed.iter().any(|a| a.trim().eq_ignore_ascii_case(value)))
    }
}
