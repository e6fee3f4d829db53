// src/store/memory.rs

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::RecordStore;
use crate::{
    error::AuditError,
    models::{
        ambiguity::AmbiguousQuestion,
        answer_key::AnswerKey,
        field_config::FieldConfig,
        flag::{Flag, NewFlag},
        record::{CandidateRow, RecordStatus, RegistrationRow},
        score::Score,
        section::SectionConfig,
        settings::ProjectSettings,
    },
};

#[derive(Debug, Clone)]
struct StoredCandidate {
    row: CandidateRow,
    active: bool,
}

#[derive(Debug, Default)]
struct ProjectData {
    candidates: Vec<StoredCandidate>,
    corrected: Vec<CandidateRow>,
    rekeyed: Vec<CandidateRow>,
    registrations: Vec<RegistrationRow>,
    absentees: Vec<String>,
    answer_keys: Vec<AnswerKey>,
    section_configs: Vec<SectionConfig>,
    ambiguous: Vec<AmbiguousQuestion>,
    field_configs: Vec<FieldConfig>,
    settings: Option<ProjectSettings>,
    scores: Vec<Score>,
    flags: Vec<Flag>,
}

/// Process-local Record Store with the same upsert semantics as the
/// Postgres one. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    projects: RwLock<HashMap<i64, ProjectData>>,
    next_flag_id: AtomicI64,
    unavailable: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `SourceUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert_candidate(&self, project_id: i64, row: CandidateRow, active: bool) {
        self.seed(project_id, |p| p.candidates.push(StoredCandidate { row, active }));
    }

    pub fn insert_corrected(&self, project_id: i64, row: CandidateRow) {
        self.seed(project_id, |p| p.corrected.push(row));
    }

    pub fn insert_rekeyed(&self, project_id: i64, row: CandidateRow) {
        self.seed(project_id, |p| p.rekeyed.push(row));
    }

    pub fn insert_registration(&self, project_id: i64, row: RegistrationRow) {
        self.seed(project_id, |p| p.registrations.push(row));
    }

    pub fn insert_absentee(&self, project_id: i64, roll_number: impl Into<String>) {
        let roll_number = roll_number.into();
        self.seed(project_id, |p| p.absentees.push(roll_number));
    }

    pub fn insert_answer_key(&self, project_id: i64, key: AnswerKey) {
        self.seed(project_id, |p| {
            p.answer_keys.retain(|k| k.course != key.course);
            p.answer_keys.push(key);
        });
    }

    pub fn insert_section_config(&self, project_id: i64, config: SectionConfig) {
        self.seed(project_id, |p| {
            p.section_configs.retain(|c| c.course != config.course);
            p.section_configs.push(config);
        });
    }

    pub fn insert_ambiguous_question(&self, project_id: i64, question: AmbiguousQuestion) {
        self.seed(project_id, |p| p.ambiguous.push(question));
    }

    pub fn insert_field_config(&self, project_id: i64, config: FieldConfig) {
        self.seed(project_id, |p| p.field_configs.push(config));
    }

    pub fn set_settings(&self, project_id: i64, settings: ProjectSettings) {
        self.seed(project_id, |p| p.settings = Some(settings));
    }

    /// Snapshot of stored scores, in insertion order.
    pub fn scores(&self, project_id: i64) -> Vec<Score> {
        self.peek(project_id, |p| p.scores.clone())
    }

    /// Snapshot of stored flags, in insertion order.
    pub fn flags(&self, project_id: i64) -> Vec<Flag> {
        self.peek(project_id, |p| p.flags.clone())
    }

    pub fn record_status(&self, project_id: i64, barcode: &str) -> Option<String> {
        self.peek(project_id, |p| {
            p.candidates
                .iter()
                .find(|c| c.row.barcode == barcode)
                .map(|c| c.row.status.clone())
        })
    }

    fn seed(&self, project_id: i64, f: impl FnOnce(&mut ProjectData)) {
        let mut projects = self.projects.write().unwrap_or_else(|e| e.into_inner());
        f(projects.entry(project_id).or_default());
    }

    fn peek<T: Default>(&self, project_id: i64, f: impl FnOnce(&ProjectData) -> T) -> T {
        let projects = self.projects.read().unwrap_or_else(|e| e.into_inner());
        projects.get(&project_id).map(f).unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), AuditError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuditError::SourceUnavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<i64, ProjectData>>, AuditError> {
        self.check_available()?;
        self.projects
            .read()
            .map_err(|_| AuditError::SourceUnavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<i64, ProjectData>>, AuditError> {
        self.check_available()?;
        self.projects
            .write()
            .map_err(|_| AuditError::SourceUnavailable("memory store lock poisoned".to_string()))
    }

    fn query<T: Default>(
        &self,
        project_id: i64,
        f: impl FnOnce(&ProjectData) -> T,
    ) -> Result<T, AuditError> {
        let projects = self.read()?;
        Ok(projects.get(&project_id).map(f).unwrap_or_default())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_candidate_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<CandidateRow>, AuditError> {
        self.query(project_id, |p| {
            p.candidates
                .iter()
                .filter(|c| c.active)
                .map(|c| c.row.clone())
                .collect()
        })
    }

    async fn list_corrected_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<CandidateRow>, AuditError> {
        self.query(project_id, |p| p.corrected.clone())
    }

    async fn list_rekeyed_records(&self, project_id: i64) -> Result<Vec<CandidateRow>, AuditError> {
        self.query(project_id, |p| p.rekeyed.clone())
    }

    async fn list_registration_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<RegistrationRow>, AuditError> {
        self.query(project_id, |p| p.registrations.clone())
    }

    async fn list_absentee_roll_numbers(&self, project_id: i64) -> Result<Vec<String>, AuditError> {
        self.query(project_id, |p| p.absentees.clone())
    }

    async fn list_courses(&self, project_id: i64) -> Result<Vec<String>, AuditError> {
        self.query(project_id, |p| {
            let mut courses: Vec<String> = p.answer_keys.iter().map(|k| k.course.clone()).collect();
            courses.sort();
            courses
        })
    }

    async fn get_answer_key(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Option<AnswerKey>, AuditError> {
        self.query(project_id, |p| {
            p.answer_keys.iter().find(|k| k.course == course).cloned()
        })
    }

    async fn get_section_config(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Option<SectionConfig>, AuditError> {
        self.query(project_id, |p| {
            p.section_configs.iter().find(|c| c.course == course).cloned()
        })
    }

    async fn list_ambiguous_questions(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Vec<AmbiguousQuestion>, AuditError> {
        self.query(project_id, |p| {
            p.ambiguous
                .iter()
                .filter(|q| q.course == course)
                .cloned()
                .collect()
        })
    }

    async fn list_field_configs(&self, project_id: i64) -> Result<Vec<FieldConfig>, AuditError> {
        self.query(project_id, |p| p.field_configs.clone())
    }

    async fn get_project_settings(
        &self,
        project_id: i64,
    ) -> Result<Option<ProjectSettings>, AuditError> {
        self.query(project_id, |p| p.settings.clone())
    }

    async fn existing_score_roll_numbers(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Vec<String>, AuditError> {
        self.query(project_id, |p| {
            p.scores
                .iter()
                .filter(|s| s.course == course)
                .map(|s| s.roll_number.clone())
                .collect()
        })
    }

    async fn list_flags(&self, project_id: i64) -> Result<Vec<Flag>, AuditError> {
        self.query(project_id, |p| p.flags.clone())
    }

    async fn write_scores(&self, project_id: i64, scores: &[Score]) -> Result<u64, AuditError> {
        let mut projects = self.write()?;
        let project = projects.entry(project_id).or_default();

        let mut existing: HashSet<(String, String)> = project
            .scores
            .iter()
            .map(|s| (s.course.clone(), s.roll_number.clone()))
            .collect();

        let mut inserted = 0;
        for score in scores {
            if existing.insert((score.course.clone(), score.roll_number.clone())) {
                project.scores.push(Score {
                    project_id,
                    ..score.clone()
                });
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn write_flags(&self, project_id: i64, flags: &[NewFlag]) -> Result<u64, AuditError> {
        let mut projects = self.write()?;
        let project = projects.entry(project_id).or_default();

        let mut existing: HashSet<(String, String)> = project
            .flags
            .iter()
            .map(|f| (f.barcode.clone(), f.remark.clone()))
            .collect();

        let mut inserted = 0;
        for flag in flags {
            if existing.insert(flag.dedup_key()) {
                project.flags.push(Flag {
                    id: self.next_flag_id.fetch_add(1, Ordering::SeqCst) + 1,
                    barcode: flag.barcode.clone(),
                    field: flag.field.clone(),
                    field_value: flag.field_value.clone(),
                    remark: flag.remark.clone(),
                    project_id,
                    corrected: false,
                    corrected_by_user_id: None,
                    created_at: Some(chrono::Utc::now()),
                });
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn update_record_status(
        &self,
        project_id: i64,
        barcode: &str,
        status: RecordStatus,
    ) -> Result<(), AuditError> {
        let mut projects = self.write()?;
        if let Some(project) = projects.get_mut(&project_id) {
            for candidate in project.candidates.iter_mut().filter(|c| c.row.barcode == barcode) {
                candidate.row.status = status.as_str().to_string();
            }
        }
        Ok(())
    }
}
