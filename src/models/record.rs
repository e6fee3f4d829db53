// src/models/record.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::error::AuditError;

/// The sentinel the scanner writes when it sees more than one mark.
pub const MULTI_MARK: &str = "*";

/// Name of the answers field. It never takes part in field-level checks.
pub const ANSWERS_FIELD: &str = "Answers";

/// Untyped string map of a scanned or registration record.
///
/// A missing key and an empty value mean different things: a missing key
/// skips a check, an empty value is a blank response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON object stored for a record. Scalars are kept in their
    /// textual form and `null` reads as blank.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|e| e.to_string())?;
        let Value::Object(object) = value else {
            return Err("expected a JSON object".to_string());
        };

        let mut map = BTreeMap::new();
        for (key, value) in object {
            map.insert(key.clone(), scalar_text(&key, value)?);
        }
        Ok(Self(map))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get-or-absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Get-or-blank: absence reads as the empty string.
    pub fn get_or_blank(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overwrites entries with the ones present in `overlay`.
    pub fn apply_overlay(&mut self, overlay: &FieldMap) {
        for (key, value) in &overlay.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn scalar_text(key: &str, value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) | Value::Object(_) => Err(format!("field '{key}' is not a scalar")),
    }
}

/// A single question's response as read from an answer sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer<'a> {
    Absent,
    Blank,
    MultiMark,
    Marked(&'a str),
}

impl Answer<'_> {
    /// Anything other than absent or blank counts as an attempt.
    pub fn is_attempted(&self) -> bool {
        matches!(self, Answer::MultiMark | Answer::Marked(_))
    }
}

/// Answers keyed by question number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet(BTreeMap<u32, String>);

impl AnswerSheet {
    /// Keys may be bare numbers (`"12"`) or prefixed (`"Q12"`).
    pub fn from_json(text: &str) -> Result<Self, String> {
        let fields = FieldMap::from_json(text)?;
        let mut answers = BTreeMap::new();
        for (key, value) in fields.iter() {
            let number = parse_question_no(key)
                .ok_or_else(|| format!("answer key '{key}' is not a question number"))?;
            answers.insert(number, value.to_string());
        }
        Ok(Self(answers))
    }

    pub fn insert(&mut self, question_no: u32, value: impl Into<String>) {
        self.0.insert(question_no, value.into());
    }

    pub fn raw(&self, question_no: u32) -> Option<&str> {
        self.0.get(&question_no).map(String::as_str)
    }

    pub fn answer(&self, question_no: u32) -> Answer<'_> {
        match self.raw(question_no) {
            None => Answer::Absent,
            Some(v) if v.trim().is_empty() => Answer::Blank,
            Some(v) if v.trim() == MULTI_MARK => Answer::MultiMark,
            Some(v) => Answer::Marked(v.trim()),
        }
    }

    pub fn question_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    pub fn apply_overlay(&mut self, overlay: &AnswerSheet) {
        for (q, value) in &overlay.0 {
            self.0.insert(*q, value.clone());
        }
    }
}

impl<V: Into<String>> FromIterator<(u32, V)> for AnswerSheet {
    fn from_iter<T: IntoIterator<Item = (u32, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(q, v)| (q, v.into())).collect())
    }
}

pub fn parse_question_no(key: &str) -> Option<u32> {
    let key = key.trim();
    let digits = key
        .strip_prefix('Q')
        .or_else(|| key.strip_prefix('q'))
        .unwrap_or(key);
    digits.parse().ok()
}

/// Processing status of a scanned record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Unprocessed,
    Active,
    Completed,
    NeedsReview,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Unprocessed => "unprocessed",
            RecordStatus::Active => "active",
            RecordStatus::Completed => "completed",
            RecordStatus::NeedsReview => "needs_review",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, RecordStatus::Completed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unprocessed" => Ok(RecordStatus::Unprocessed),
            "active" => Ok(RecordStatus::Active),
            "completed" => Ok(RecordStatus::Completed),
            "needs_review" => Ok(RecordStatus::NeedsReview),
            other => Err(format!("unknown record status '{other}'")),
        }
    }
}

/// Raw row of the scanned, corrected or re-keyed record tables.
/// `fields` and `answers` hold JSON text as written by the scanner.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CandidateRow {
    pub barcode: String,
    pub roll_number: String,
    pub fields: String,
    pub answers: String,
    pub status: String,
}

/// A parsed scanned response record.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub barcode: String,
    pub roll_number: String,
    pub fields: FieldMap,
    pub answers: AnswerSheet,
    pub status: RecordStatus,
}

impl CandidateRecord {
    /// Applies a corrected overlay: the overlay's roll number wins and its
    /// field and answer entries replace the original ones.
    pub fn with_overlay(mut self, overlay: &CandidateRecord) -> Self {
        if !overlay.roll_number.trim().is_empty() {
            self.roll_number = overlay.roll_number.clone();
        }
        self.fields.apply_overlay(&overlay.fields);
        self.answers.apply_overlay(&overlay.answers);
        self
    }
}

impl TryFrom<CandidateRow> for CandidateRecord {
    type Error = AuditError;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        let fields = FieldMap::from_json(&row.fields)
            .map_err(|e| AuditError::malformed(&row.barcode, format!("fields: {e}")))?;
        let answers = AnswerSheet::from_json(&row.answers)
            .map_err(|e| AuditError::malformed(&row.barcode, format!("answers: {e}")))?;
        let status = row
            .status
            .parse()
            .map_err(|e: String| AuditError::malformed(&row.barcode, e))?;

        Ok(Self {
            barcode: row.barcode.trim().to_string(),
            roll_number: row.roll_number.trim().to_string(),
            fields,
            answers,
            status,
        })
    }
}

/// Raw row of the registration table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RegistrationRow {
    pub roll_number: String,
    pub fields: String,
}

/// Authoritative enrollment data for one roll number.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRecord {
    pub roll_number: String,
    pub fields: FieldMap,
}

impl TryFrom<RegistrationRow> for RegistrationRecord {
    type Error = AuditError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let fields = FieldMap::from_json(&row.fields)
            .map_err(|e| AuditError::malformed(&row.roll_number, format!("registration: {e}")))?;
        Ok(Self {
            roll_number: row.roll_number.trim().to_string(),
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_blank_are_distinct() {
        let fields = FieldMap::from_json(r#"{"Class": "", "Gender": "M"}"#).unwrap();
        assert_eq!(fields.get("Class"), Some(""));
        assert_eq!(fields.get("Missing"), None);
        assert_eq!(fields.get_or_blank("Missing"), "");
    }

    #[test]
    fn test_scalar_values_are_stringified() {
        let fields = FieldMap::from_json(r#"{"Class": 11, "Paid": true, "Note": null}"#).unwrap();
        assert_eq!(fields.get("Class"), Some("11"));
        assert_eq!(fields.get("Paid"), Some("true"));
        assert_eq!(fields.get("Note"), Some(""));
    }

    #[test]
    fn test_nested_values_are_rejected() {
        assert!(FieldMap::from_json(r#"{"Class": [1, 2]}"#).is_err());
        assert!(FieldMap::from_json("[1, 2]").is_err());
        assert!(FieldMap::from_json("{not json").is_err());
    }

    #[test]
    fn test_answer_classification() {
        let sheet = AnswerSheet::from_json(r#"{"1": "B", "Q2": "", "3": "*"}"#).unwrap();
        assert_eq!(sheet.answer(1), Answer::Marked("B"));
        assert_eq!(sheet.answer(2), Answer::Blank);
        assert_eq!(sheet.answer(3), Answer::MultiMark);
        assert_eq!(sheet.answer(4), Answer::Absent);
        assert!(Answer::MultiMark.is_attempted());
        assert!(!Answer::Blank.is_attempted());
    }

    #[test]
    fn test_non_numeric_answer_key_is_malformed() {
        let row = CandidateRow {
            barcode: "B1".into(),
            roll_number: "R1".into(),
            fields: "{}".into(),
            answers: r#"{"first": "A"}"#.into(),
            status: "active".into(),
        };
        let err = CandidateRecord::try_from(row).unwrap_err();
        assert!(matches!(err, AuditError::MalformedRecord { ref barcode, .. } if barcode == "B1"));
    }

    #[test]
    fn test_overlay_takes_precedence() {
        let original = CandidateRecord {
            barcode: "B1".into(),
            roll_number: "R1".into(),
            fields: [("Class", "10"), ("Gender", "M")].into_iter().collect(),
            answers: [(1, "A"), (2, "B")].into_iter().collect(),
            status: RecordStatus::Completed,
        };
        let corrected = CandidateRecord {
            barcode: "B1".into(),
            roll_number: "R2".into(),
            fields: [("Class", "9")].into_iter().collect(),
            answers: [(2, "C")].into_iter().collect(),
            status: RecordStatus::Active,
        };

        let merged = original.with_overlay(&corrected);
        assert_eq!(merged.roll_number, "R2");
        assert_eq!(merged.fields.get("Class"), Some("9"));
        assert_eq!(merged.fields.get("Gender"), Some("M"));
        assert_eq!(merged.answers.raw(1), Some("A"));
        assert_eq!(merged.answers.raw(2), Some("C"));
        assert_eq!(merged.status, RecordStatus::Completed);
    }
}
