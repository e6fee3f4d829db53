// src/models/settings.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::record::FieldMap;

/// Booklet set assumed when a project does not record one.
pub const DEFAULT_SET_CODE: &str = "A";

/// How a multi-marked answer without an ambiguity override is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiMarkScoring {
    /// Counts as a wrong answer.
    #[default]
    Wrong,
    /// Counts as neither correct nor wrong, like a blank.
    Ignore,
}

/// Per-project engine settings stored next to the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    pub booklet_set_field: Option<String>,
    pub roll_number_field: String,
    pub subject_code_field: Option<String>,
    pub subject_choice_field: Option<String>,
    pub disallowed_characters: String,
    /// Field name -> (raw value -> normalized value).
    pub value_aliases: HashMap<String, HashMap<String, String>>,
    pub mismatch_fields: Option<Vec<String>>,
    pub multi_mark_scoring: MultiMarkScoring,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            booklet_set_field: None,
            roll_number_field: "Roll Number".to_string(),
            subject_code_field: None,
            subject_choice_field: None,
            disallowed_characters: "*".to_string(),
            value_aliases: HashMap::new(),
            mismatch_fields: None,
            multi_mark_scoring: MultiMarkScoring::default(),
        }
    }
}

impl ProjectSettings {
    /// The candidate's booklet set. `None` means the configured field is
    /// missing or blank on this record.
    pub fn booklet_set<'a>(&self, fields: &'a FieldMap) -> Option<&'a str> {
        match &self.booklet_set_field {
            None => Some(DEFAULT_SET_CODE),
            Some(field) => fields.get(field).map(str::trim).filter(|v| !v.is_empty()),
        }
    }

    pub fn subject_choice<'a>(&self, fields: &'a FieldMap) -> Option<&'a str> {
        self.subject_choice_field
            .as_deref()
            .and_then(|field| fields.get(field))
    }

    /// Maps a raw value through the field's alias table, if any.
    pub fn normalize<'a>(&'a self, field: &str, value: &'a str) -> &'a str {
        self.value_aliases
            .get(field)
            .and_then(|aliases| aliases.get(value.trim()))
            .map(String::as_str)
            .unwrap_or(value)
    }

    pub fn is_disallowed(&self, c: char) -> bool {
        c.is_whitespace() || self.disallowed_characters.contains(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_booklet_field_defaults_to_a() {
        let settings = ProjectSettings::default();
        assert_eq!(settings.booklet_set(&FieldMap::new()), Some("A"));
    }

    #[test]
    fn test_configured_booklet_field_must_be_present() {
        let settings = ProjectSettings {
            booklet_set_field: Some("Series".into()),
            ..Default::default()
        };
        let fields: FieldMap = [("Series", " B ")].into_iter().collect();
        assert_eq!(settings.booklet_set(&fields), Some("B"));
        assert_eq!(settings.booklet_set(&FieldMap::new()), None);
    }

    #[test]
    fn test_value_aliases() {
        let mut settings = ProjectSettings::default();
        settings.value_aliases.insert(
            "Class".into(),
            [("11".to_string(), "1".to_string()), ("12".to_string(), "2".to_string())]
                .into_iter()
                .collect(),
        );
        assert_eq!(settings.normalize("Class", "11"), "1");
        assert_eq!(settings.normalize("Class", "7"), "7");
        assert_eq!(settings.normalize("Stream", "11"), "11");
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: ProjectSettings =
            serde_json::from_str(r#"{"bookletSetField":"Series","multiMarkScoring":"ignore"}"#)
                .unwrap();
        assert_eq!(settings.roll_number_field, "Roll Number");
        assert_eq!(settings.multi_mark_scoring, MultiMarkScoring::Ignore);
    }
}
