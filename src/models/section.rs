// src/models/section.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Identifies a section, optionally restricted to one subject choice.
///
/// Older configurations encode the restriction in the name as
/// `"Name:Choice"`; both forms deserialize into this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SectionKeyRepr")]
pub struct SectionKey {
    pub name: String,
    pub discriminator: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SectionKeyRepr {
    Legacy(String),
    Typed {
        name: String,
        #[serde(default)]
        discriminator: Option<String>,
    },
}

impl From<SectionKeyRepr> for SectionKey {
    fn from(repr: SectionKeyRepr) -> Self {
        match repr {
            SectionKeyRepr::Legacy(label) => SectionKey::parse(&label),
            SectionKeyRepr::Typed {
                name,
                discriminator: None,
            } => SectionKey::parse(&name),
            SectionKeyRepr::Typed {
                name,
                discriminator,
            } => SectionKey::new(name, discriminator),
        }
    }
}

impl SectionKey {
    pub fn new(name: impl Into<String>, discriminator: Option<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            discriminator: discriminator
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    /// Splits a legacy `"Name:Choice"` label.
    pub fn parse(label: &str) -> Self {
        match label.split_once(':') {
            Some((name, choice)) => Self::new(name, Some(choice.to_string())),
            None => Self::new(label, None),
        }
    }

    /// A plain section applies to everyone; a restricted one only to
    /// candidates whose subject choice matches.
    pub fn applies_to(&self, subject_choice: Option<&str>) -> bool {
        match &self.discriminator {
            None => true,
            Some(wanted) => subject_choice
                .map(|choice| choice.trim().eq_ignore_ascii_case(wanted))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discriminator {
            Some(d) => write!(f, "{}:{}", self.name, d),
            None => f.write_str(&self.name),
        }
    }
}

/// Marking parameters of one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(flatten)]
    pub key: SectionKey,
    pub start_question: u32,
    pub end_question: u32,
    pub marks_correct: f64,
    pub marks_wrong: f64,
    #[serde(default)]
    pub negative_marking: bool,
}

impl Section {
    pub fn contains(&self, question_no: u32) -> bool {
        (self.start_question..=self.end_question).contains(&question_no)
    }

    pub fn score(&self, correct: u32, wrong: u32) -> f64 {
        let penalty = if self.negative_marking {
            f64::from(wrong) * self.marks_wrong
        } else {
            0.0
        };
        f64::from(correct) * self.marks_correct - penalty
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub course: String,
    pub sections: Vec<Section>,
}

/// Represents the 'section_configs' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct SectionConfigRow {
    pub course: String,
    pub sections: Json<Vec<Section>>,
}

impl From<SectionConfigRow> for SectionConfig {
    fn from(row: SectionConfigRow) -> Self {
        Self {
            course: row.course,
            sections: row.sections.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_label_is_split() {
        let key = SectionKey::parse("Part B:Biology");
        assert_eq!(key.name, "Part B");
        assert_eq!(key.discriminator.as_deref(), Some("Biology"));
        assert_eq!(key.to_string(), "Part B:Biology");
    }

    #[test]
    fn test_section_deserializes_both_forms() {
        let legacy: Section = serde_json::from_str(
            r#"{"name":"Part B:Maths","startQuestion":1,"endQuestion":10,"marksCorrect":4,"marksWrong":1,"negativeMarking":true}"#,
        )
        .unwrap();
        assert_eq!(legacy.key.discriminator.as_deref(), Some("Maths"));

        let typed: Section = serde_json::from_str(
            r#"{"name":"Part A","startQuestion":1,"endQuestion":10,"marksCorrect":1,"marksWrong":0}"#,
        )
        .unwrap();
        assert_eq!(typed.key, SectionKey::plain("Part A"));
        assert!(!typed.negative_marking);
    }

    #[test]
    fn test_discriminated_section_applicability() {
        let key = SectionKey::parse("Part B:Biology");
        assert!(key.applies_to(Some("biology")));
        assert!(!key.applies_to(Some("Maths")));
        assert!(!key.applies_to(None));
        assert!(SectionKey::plain("All").applies_to(None));
    }

    #[test]
    fn test_section_score_with_and_without_negative_marking() {
        let mut section = Section {
            key: SectionKey::plain("All"),
            start_question: 1,
            end_question: 2,
            marks_correct: 1.0,
            marks_wrong: 0.25,
            negative_marking: true,
        };
        assert_eq!(section.score(1, 1), 0.75);
        section.negative_marking = false;
        assert_eq!(section.score(1, 1), 1.0);
    }
}
