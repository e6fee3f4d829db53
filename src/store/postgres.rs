// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use super::RecordStore;
use crate::{
    error::AuditError,
    models::{
        ambiguity::{AmbiguousQuestion, AmbiguousQuestionRow},
        answer_key::{AnswerKey, AnswerKeyRow},
        field_config::FieldConfig,
        flag::{Flag, NewFlag},
        record::{CandidateRow, RecordStatus, RegistrationRow},
        score::Score,
        section::{SectionConfig, SectionConfigRow},
        settings::ProjectSettings,
    },
};

/// Column list shared by the scanned, corrected and re-keyed tables.
const CANDIDATE_COLUMNS: &str = "barcode, roll_number, fields, answers, status";

const FLAG_COLUMNS: &str = "\
    id, barcode, field, field_value, remark, project_id, \
    corrected, corrected_by_user_id, created_at";

/// Rows per multi-row INSERT, well under the Postgres bind limit.
const WRITE_CHUNK: usize = 500;

/// Record Store over a Postgres database laid out by `migrations/`.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_rows(
        &self,
        table: &str,
        active_only: bool,
        project_id: i64,
    ) -> Result<Vec<CandidateRow>, AuditError> {
        let filter = if active_only { "AND is_active" } else { "" };
        let query = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM {table} \
             WHERE project_id = $1 {filter} ORDER BY barcode"
        );
        let rows = sqlx::query_as::<_, CandidateRow>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(table, project_id, "Failed to list records: {:?}", e);
                AuditError::from(e)
            })?;
        Ok(rows)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list_candidate_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<CandidateRow>, AuditError> {
        self.list_rows("candidate_records", true, project_id).await
    }

    async fn list_corrected_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<CandidateRow>, AuditError> {
        self.list_rows("corrected_records", false, project_id).await
    }

    async fn list_rekeyed_records(&self, project_id: i64) -> Result<Vec<CandidateRow>, AuditError> {
        self.list_rows("rekeyed_records", false, project_id).await
    }

    async fn list_registration_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<RegistrationRow>, AuditError> {
        let rows = sqlx::query_as::<_, RegistrationRow>(
            "SELECT roll_number, fields FROM registration_records \
             WHERE project_id = $1 ORDER BY roll_number",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_absentee_roll_numbers(&self, project_id: i64) -> Result<Vec<String>, AuditError> {
        let rolls = sqlx::query_scalar::<_, String>(
            "SELECT roll_number FROM absentees WHERE project_id = $1 ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rolls)
    }

    async fn list_courses(&self, project_id: i64) -> Result<Vec<String>, AuditError> {
        let courses = sqlx::query_scalar::<_, String>(
            "SELECT course FROM answer_keys WHERE project_id = $1 ORDER BY course",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn get_answer_key(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Option<AnswerKey>, AuditError> {
        let row = sqlx::query_as::<_, AnswerKeyRow>(
            "SELECT course, sets FROM answer_keys WHERE project_id = $1 AND course = $2",
        )
        .bind(project_id)
        .bind(course)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AnswerKey::from))
    }

    async fn get_section_config(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Option<SectionConfig>, AuditError> {
        let row = sqlx::query_as::<_, SectionConfigRow>(
            "SELECT course, sections FROM section_configs WHERE project_id = $1 AND course = $2",
        )
        .bind(project_id)
        .bind(course)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SectionConfig::from))
    }

    async fn list_ambiguous_questions(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Vec<AmbiguousQuestion>, AuditError> {
        let rows = sqlx::query_as::<_, AmbiguousQuestionRow>(
            "SELECT course, set_code, question_no, policy FROM ambiguous_questions \
             WHERE project_id = $1 AND course = $2 ORDER BY set_code, question_no",
        )
        .bind(project_id)
        .bind(course)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AmbiguousQuestion::try_from).collect()
    }

    async fn list_field_configs(&self, project_id: i64) -> Result<Vec<FieldConfig>, AuditError> {
        let configs = sqlx::query_as::<_, FieldConfig>(
            "SELECT field_name, min_range, max_range, allowed_responses FROM field_configs \
             WHERE project_id = $1 ORDER BY field_name",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(configs)
    }

    async fn get_project_settings(
        &self,
        project_id: i64,
    ) -> Result<Option<ProjectSettings>, AuditError> {
        let settings = sqlx::query_scalar::<_, Json<ProjectSettings>>(
            "SELECT settings FROM project_settings WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(settings.map(|s| s.0))
    }

    async fn existing_score_roll_numbers(
        &self,
        project_id: i64,
        course: &str,
    ) -> Result<Vec<String>, AuditError> {
        let rolls = sqlx::query_scalar::<_, String>(
            "SELECT roll_number FROM scores WHERE project_id = $1 AND course = $2",
        )
        .bind(project_id)
        .bind(course)
        .fetch_all(&self.pool)
        .await?;
        Ok(rolls)
    }

    async fn list_flags(&self, project_id: i64) -> Result<Vec<Flag>, AuditError> {
        let query = format!("SELECT {FLAG_COLUMNS} FROM flags WHERE project_id = $1 ORDER BY id");
        let flags = sqlx::query_as::<_, Flag>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(flags)
    }

    async fn write_scores(&self, project_id: i64, scores: &[Score]) -> Result<u64, AuditError> {
        // All chunks land in one transaction or none do.
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in scores.chunks(WRITE_CHUNK) {
            // Use QueryBuilder for the multi-row VALUES list
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO scores (project_id, course, roll_number, total_score, sections) ",
            );
            query_builder.push_values(chunk, |mut row, score| {
                row.push_bind(project_id)
                    .push_bind(&score.course)
                    .push_bind(&score.roll_number)
                    .push_bind(score.total_score)
                    .push_bind(Json(&score.sections));
            });
            query_builder.push(" ON CONFLICT (project_id, course, roll_number) DO NOTHING");

            let result = query_builder.build().execute(&mut *tx).await.map_err(|e| {
                tracing::error!(project_id, "Failed to write scores: {:?}", e);
                AuditError::from(e)
            })?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn write_flags(&self, project_id: i64, flags: &[NewFlag]) -> Result<u64, AuditError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in flags.chunks(WRITE_CHUNK) {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO flags (project_id, barcode, field, field_value, remark) ",
            );
            query_builder.push_values(chunk, |mut row, flag| {
                row.push_bind(project_id)
                    .push_bind(&flag.barcode)
                    .push_bind(&flag.field)
                    .push_bind(&flag.field_value)
                    .push_bind(&flag.remark);
            });
            query_builder.push(" ON CONFLICT (project_id, barcode, remark) DO NOTHING");

            let result = query_builder.build().execute(&mut *tx).await.map_err(|e| {
                tracing::error!(project_id, "Failed to write flags: {:?}", e);
                AuditError::from(e)
            })?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn update_record_status(
        &self,
        project_id: i64,
        barcode: &str,
        status: RecordStatus,
    ) -> Result<(), AuditError> {
        sqlx::query(
            "UPDATE candidate_records SET status = $1 \
             WHERE project_id = $2 AND barcode = $3",
        )
        .bind(status.as_str())
        .bind(project_id)
        .bind(barcode)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
