// src/engine/ambiguity.rs

use std::collections::HashMap;

use super::answer_keys::{normalize_course, set_codes_match};
use crate::models::ambiguity::{AmbiguityPolicy, AmbiguousQuestion};

/// (course, set, question) -> crediting policy for contested questions.
#[derive(Debug, Default)]
pub struct AmbiguityResolver {
    by_question: HashMap<(String, u32), Vec<(String, AmbiguityPolicy)>>,
}

impl AmbiguityResolver {
    pub fn build(questions: impl IntoIterator<Item = AmbiguousQuestion>) -> Self {
        let mut resolver = Self::default();
        for question in questions {
            let overrides = resolver
                .by_question
                .entry((normalize_course(&question.course), question.question_no))
                .or_default();
            let set_code = question.set_code.trim().to_string();
            // Last entry for the same set wins.
            overrides.retain(|(code, _)| !code.eq_ignore_ascii_case(&set_code));
            overrides.push((set_code, question.policy));
        }
        resolver
    }

    pub fn policy(
        &self,
        course: &str,
        set_code: &str,
        question_no: u32,
    ) -> Option<AmbiguityPolicy> {
        let overrides = self
            .by_question
            .get(&(normalize_course(course), question_no))?;
        overrides
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(set_code.trim()))
            .or_else(|| overrides.iter().find(|(code, _)| set_codes_match(code, set_code)))
            .map(|(_, policy)| *policy)
    }
}
