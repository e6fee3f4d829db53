// src/engine/sink.rs

//! Idempotent writes of computed scores and flags.
//!
//! Both writers drop anything the store already holds before writing, and
//! the store itself ignores conflicting rows, so a batch can be re-run.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    error::AuditError,
    models::{flag::NewFlag, score::Score},
    store::RecordStore,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSummary {
    /// Rows the store reports as inserted.
    pub written: u64,
    /// Rows dropped because they were already stored or repeated in the batch.
    pub suppressed: usize,
}

/// Writes scores that do not exist yet for (roll number, course, project).
pub async fn write_scores(
    store: &dyn RecordStore,
    project_id: i64,
    course: &str,
    scores: Vec<Score>,
) -> Result<WriteSummary, AuditError> {
    let mut seen: HashSet<String> = store
        .existing_score_roll_numbers(project_id, course)
        .await?
        .into_iter()
        .collect();

    let total = scores.len();
    let fresh: Vec<Score> = scores
        .into_iter()
        .filter(|score| {
            let is_new = seen.insert(score.roll_number.clone());
            if !is_new {
                tracing::debug!(roll_number = %score.roll_number, course, "Score already recorded");
            }
            is_new
        })
        .collect();

    let written = if fresh.is_empty() {
        0
    } else {
        store.write_scores(project_id, &fresh).await?
    };

    Ok(WriteSummary {
        written,
        suppressed: total - fresh.len(),
    })
}

/// Outcome of a flag write. `inserted` lists the flags that passed
/// suppression and were handed to the store.
#[derive(Debug, Default)]
pub struct FlagWrite {
    pub summary: WriteSummary,
    pub inserted: Vec<NewFlag>,
}

/// Writes flags whose (barcode, remark) pair is not stored yet.
pub async fn write_flags(
    store: &dyn RecordStore,
    project_id: i64,
    flags: Vec<NewFlag>,
) -> Result<FlagWrite, AuditError> {
    let mut seen: HashSet<(String, String)> = store
        .list_flags(project_id)
        .await?
        .into_iter()
        .map(|f| (f.barcode, f.remark))
        .collect();

    let total = flags.len();
    let fresh: Vec<NewFlag> = flags
        .into_iter()
        .filter(|flag| seen.insert(flag.dedup_key()))
        .collect();

    let written = if fresh.is_empty() {
        0
    } else {
        store.write_flags(project_id, &fresh).await?
    };

    Ok(FlagWrite {
        summary: WriteSummary {
            written,
            suppressed: total - fresh.len(),
        },
        inserted: fresh,
    })
}
