// src/models/ambiguity.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AuditError;

/// How a contested question is credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Everyone is credited as correct.
    AwardAll = 1,
    /// Credited as correct when the answer is not blank, whatever its value.
    AwardIfAttempted = 2,
    /// Counted as neither correct nor wrong.
    AwardNone = 3,
    /// Not scored; multi-marks are reported by the audit instead.
    FlagAsMultiple = 4,
}

impl TryFrom<i16> for AmbiguityPolicy {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(AmbiguityPolicy::AwardAll),
            2 => Ok(AmbiguityPolicy::AwardIfAttempted),
            3 => Ok(AmbiguityPolicy::AwardNone),
            4 => Ok(AmbiguityPolicy::FlagAsMultiple),
            other => Err(format!("unknown ambiguity policy code {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguousQuestion {
    pub course: String,
    pub set_code: String,
    pub question_no: u32,
    pub policy: AmbiguityPolicy,
}

/// Represents the 'ambiguous_questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct AmbiguousQuestionRow {
    pub course: String,
    pub set_code: String,
    pub question_no: i32,
    pub policy: i16,
}

impl TryFrom<AmbiguousQuestionRow> for AmbiguousQuestion {
    type Error = AuditError;

    fn try_from(row: AmbiguousQuestionRow) -> Result<Self, Self::Error> {
        let label = format!("{}/{}/Q{}", row.course, row.set_code, row.question_no);
        let question_no = u32::try_from(row.question_no)
            .map_err(|_| AuditError::malformed(&label, "negative question number"))?;
        let policy = AmbiguityPolicy::try_from(row.policy)
            .map_err(|e| AuditError::malformed(&label, e))?;

        Ok(Self {
            course: row.course,
            set_code: row.set_code,
            question_no,
            policy,
        })
    }
}
