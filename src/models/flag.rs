// src/models/flag.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'flags' table in the database.
/// An anomaly pointing at one candidate field for human correction.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Flag {
    pub id: i64,
    pub barcode: String,
    pub field: String,
    pub field_value: String,
    pub remark: String,
    pub project_id: i64,
    pub corrected: bool,
    pub corrected_by_user_id: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A flag raised by a check, before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewFlag {
    pub barcode: String,
    pub field: String,
    pub field_value: String,
    pub remark: String,
}

impl NewFlag {
    pub fn new(
        barcode: impl Into<String>,
        field: impl Into<String>,
        field_value: impl Into<String>,
        remark: impl Into<String>,
    ) -> Self {
        Self {
            barcode: barcode.into(),
            field: field.into(),
            field_value: field_value.into(),
            remark: remark.into(),
        }
    }

    /// Identity used for duplicate suppression.
    pub fn dedup_key(&self) -> (String, String) {
        (self.barcode.clone(), self.remark.clone())
    }
}
