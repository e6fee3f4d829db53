// src/engine/answer_keys.rs

use std::collections::HashMap;

use crate::{
    error::AuditError,
    models::{
        answer_key::{AnswerKey, KeyQuestion},
        section::Section,
    },
};

/// The questions of one booklet set, ordered by question number.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedSet {
    pub set_code: String,
    pub questions: Vec<KeyQuestion>,
}

impl KeyedSet {
    /// Key questions that fall inside a section's range.
    pub fn questions_in<'a>(
        &'a self,
        section: &'a Section,
    ) -> impl Iterator<Item = &'a KeyQuestion> + 'a {
        self.questions
            .iter()
            .filter(move |q| section.contains(q.question_no))
    }
}

/// (course, booklet set) -> ordered answer list. Read-only once built.
#[derive(Debug, Default)]
pub struct AnswerKeyIndex {
    courses: HashMap<String, Vec<KeyedSet>>,
}

impl AnswerKeyIndex {
    pub fn build(keys: impl IntoIterator<Item = AnswerKey>) -> Self {
        let mut courses: HashMap<String, Vec<KeyedSet>> = HashMap::new();
        for key in keys {
            let sets = courses.entry(normalize_course(&key.course)).or_default();
            for set in key.sets {
                let mut questions = set.questions;
                questions.sort_by_key(|q| q.question_no);
                questions.dedup_by_key(|q| q.question_no);
                sets.push(KeyedSet {
                    set_code: set.set_code.trim().to_string(),
                    questions,
                });
            }
        }
        Self { courses }
    }

    /// Picks the set for a candidate's booklet code. An exact label wins;
    /// otherwise a prefixed label ("SET-A") matches on its trailing code.
    pub fn select(&self, course: &str, set_code: &str) -> Result<&KeyedSet, AuditError> {
        let not_found = || AuditError::KeyNotFound {
            course: course.to_string(),
            set_code: set_code.to_string(),
        };
        let sets = self.courses.get(&normalize_course(course)).ok_or_else(not_found)?;

        sets.iter()
            .find(|s| s.set_code.eq_ignore_ascii_case(set_code.trim()))
            .or_else(|| sets.iter().find(|s| set_codes_match(&s.set_code, set_code)))
            .ok_or_else(not_found)
    }
}

pub(crate) fn normalize_course(course: &str) -> String {
    course.trim().to_lowercase()
}

/// Set labels may carry a prefix ("Series A", "SET-A"), so labels match
/// when they are equal or share their final character.
pub fn set_codes_match(label: &str, code: &str) -> bool {
    let label = label.trim();
    let code = code.trim();
    if label.is_empty() || code.is_empty() {
        return false;
    }
    if label.eq_ignore_ascii_case(code) {
        return true;
    }
    match (label.chars().last(), code.chars().last()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
        _ => false,
    }
}
