// src/engine/sections.rs

use std::collections::HashMap;

use super::answer_keys::{KeyedSet, normalize_course};
use crate::{
    error::AuditError,
    models::section::{Section, SectionConfig},
};

/// (course, section) -> marking parameters. Read-only once built.
#[derive(Debug, Default)]
pub struct SectionConfigIndex {
    courses: HashMap<String, Vec<Section>>,
}

impl SectionConfigIndex {
    pub fn build(configs: impl IntoIterator<Item = SectionConfig>) -> Self {
        let mut courses: HashMap<String, Vec<Section>> = HashMap::new();
        for config in configs {
            courses
                .entry(normalize_course(&config.course))
                .or_default()
                .extend(config.sections);
        }
        Self { courses }
    }

    pub fn sections(&self, course: &str) -> Result<&[Section], AuditError> {
        self.courses
            .get(&normalize_course(course))
            .filter(|sections| !sections.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| AuditError::ConfigNotFound {
                course: course.to_string(),
                reason: "no sections configured".to_string(),
            })
    }

    /// Sections that overlap the key's questions and apply to the
    /// candidate's subject choice, in configuration order.
    pub fn applicable<'a>(
        &'a self,
        course: &str,
        key_set: &KeyedSet,
        subject_choice: Option<&str>,
    ) -> Result<Vec<&'a Section>, AuditError> {
        let sections: Vec<&Section> = self
            .sections(course)?
            .iter()
            .filter(|s| s.key.applies_to(subject_choice))
            .filter(|s| key_set.questions_in(s).next().is_some())
            .collect();

        if sections.is_empty() {
            return Err(AuditError::ConfigNotFound {
                course: course.to_string(),
                reason: format!("no section covers booklet set '{}'", key_set.set_code),
            });
        }
        Ok(sections)
    }
}
