// src/models/answer_key.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// One question of a booklet set together with its accepted answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyQuestion {
    pub question_no: u32,

    /// Either a single option or a comma-separated list of accepted options.
    pub correct_answer: String,
}

impl KeyQuestion {
    pub fn new(question_no: u32, correct_answer: impl Into<String>) -> Self {
        Self {
            question_no,
            correct_answer: correct_answer.into(),
        }
    }

    pub fn accepted_options(&self) -> impl Iterator<Item = &str> {
        self.correct_answer
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
    }

    /// Case-insensitive match against any accepted option.
    pub fn accepts(&self, given: &str) -> bool {
        let given = given.trim();
        self.accepted_options()
            .any(|option| option.eq_ignore_ascii_case(given))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKeySet {
    pub set_code: String,
    pub questions: Vec<KeyQuestion>,
}

/// Answer key of one course, with one entry per booklet set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerKey {
    pub course: String,
    pub sets: Vec<AnswerKeySet>,
}

/// Represents the 'answer_keys' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerKeyRow {
    pub course: String,
    pub sets: Json<Vec<AnswerKeySet>>,
}

impl From<AnswerKeyRow> for AnswerKey {
    fn from(row: AnswerKeyRow) -> Self {
        Self {
            course: row.course,
            sets: row.sets.0,
        }
    }
}
