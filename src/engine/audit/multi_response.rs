// src/engine/audit/multi_response.rs

use super::{AuditInputs, Findings};
use crate::{
    engine::answer_keys::set_codes_match,
    models::{
        flag::NewFlag,
        record::{Answer, MULTI_MARK},
    },
};

/// Reports multi-marked answers on contested questions, for the records of
/// the booklet set each contested question belongs to.
pub fn check(inputs: &AuditInputs) -> Findings {
    let mut findings = Findings::default();

    for question in &inputs.ambiguous {
        for effective in &inputs.records {
            let record = &effective.record;
            let Some(set_code) = inputs.settings.booklet_set(&record.fields) else {
                continue;
            };
            if !set_codes_match(&question.set_code, set_code) {
                continue;
            }
            if record.answers.answer(question.question_no) == Answer::MultiMark {
                findings.push(NewFlag::new(
                    &record.barcode,
                    format!("Q{}", question.question_no),
                    MULTI_MARK,
                    format!(
                        "multiple responses for question {} in booklet series {}",
                        question.question_no,
                        question.set_code.trim()
                    ),
                ));
            }
        }
    }

    findings
}
