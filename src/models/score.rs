// src/models/score.rs

use serde::{Deserialize, Serialize};

/// Per-section breakdown of a candidate's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    pub name: String,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub sub_score: f64,
}

/// Computed result for one (roll number, course, project).
/// Written at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub roll_number: String,
    pub course: String,
    pub project_id: i64,
    pub total_score: f64,
    pub sections: Vec<SectionResult>,
}

impl Score {
    pub fn correct_count(&self) -> u32 {
        self.sections.iter().map(|s| s.correct_count).sum()
    }

    pub fn wrong_count(&self) -> u32 {
        self.sections.iter().map(|s| s.wrong_count).sum()
    }
}
