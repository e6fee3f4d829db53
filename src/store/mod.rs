// src/store/mod.rs

//! Data-access layer the engine reads its sources from and writes results to.
//!
//! One implementation serves both the local and the online database; the
//! [`Stores`] registry picks the instance for a request's [`Target`].

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AuditError,
    models::{
        ambiguity::AmbiguousQuestion,
        answer_key::AnswerKey,
        field_config::FieldConfig,
        flag::{Flag, NewFlag},
        record::{CandidateRow, RecordStatus, RegistrationRow},
        requests::Target,
        score::Score,
        section::SectionConfig,
        settings::ProjectSettings,
    },
};

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

/// Typed read/write operations over one project database.
///
/// Every error surfaced here is a [`AuditError::SourceUnavailable`] unless
/// stored data failed to decode. Writes are upserts: rows that already
/// exist are left untouched and not counted.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Active scanned records.
    async fn list_candidate_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<CandidateRow>, AuditError>;

    /// Corrected overlays, at most one per barcode.
    async fn list_corrected_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<CandidateRow>, AuditError>;

    /// Independently re-keyed copies of scanned records.
    async fn list_rekeyed_records(&self, project_id: i64) -> Result<Vec<CandidateRow>, AuditError>;

    async fn list_registration_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<RegistrationRow>, AuditError>;

    async fn list_absentee_roll_numbers(&self, project_id: i64) -> Result<Vec<String>, AuditError>;

    async fn list_courses(&self, project_id: i64) -> Result<Vec<String>, AuditError>;

    async fn get_answer_key(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Option<AnswerKey>, AuditError>;

    async fn get_section_config(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Option<SectionConfig>, AuditError>;

    async fn list_ambiguous_questions(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Vec<AmbiguousQuestion>, AuditError>;

    async fn list_field_configs(&self, project_id: i64) -> Result<Vec<FieldConfig>, AuditError>;

    async fn get_project_settings(
        &self,
        project_id: i64,
    ) -> Result<Option<ProjectSettings>, AuditError>;

    async fn existing_score_roll_numbers(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Vec<String>, AuditError>;

    async fn list_flags(&self, project_id: i64) -> Result<Vec<Flag>, AuditError>;

    /// Returns the number of scores actually inserted.
    async fn write_scores(&self, project_id: i64, scores: &[Score]) -> Result<u64, AuditError>;

    /// Returns the number of flags actually inserted.
    async fn write_flags(&self, project_id: i64, flags: &[NewFlag]) -> Result<u64, AuditError>;

    async fn update_record_status(
        &self,
        project_id: i64,
        barcode: &str,
        status: RecordStatus,
    ) -> Result<(), AuditError>;
}

/// Record stores keyed by database target.
#[derive(Clone)]
pub struct Stores {
    local: Arc<dyn RecordStore>,
    online: Option<Arc<dyn RecordStore>>,
}

impl Stores {
    pub fn new(local: Arc<dyn RecordStore>, online: Option<Arc<dyn RecordStore>>) -> Self {
        Self { local, online }
    }

    pub fn local_only(local: Arc<dyn RecordStore>) -> Self {
        Self::new(local, None)
    }

    /// An unconfigured online target is reported as an unavailable source.
    pub fn get(&self, target: Target) -> Result<Arc<dyn RecordStore>, AuditError> {
        match target {
            Target::Local => Ok(self.local.clone()),
            Target::Online => self.online.clone().ok_or_else(|| {
                AuditError::SourceUnavailable("online database is not configured".to_string())
            }),
        }
    }
}
