// src/engine/audit/mismatch.rs

use std::collections::{BTreeSet, HashMap};

use super::{AuditInputs, Findings};
use crate::models::{
    flag::NewFlag,
    record::{ANSWERS_FIELD, CandidateRecord},
};

const ABSENT: &str = "<absent>";

fn differs(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x.trim() != y.trim(),
        (None, None) => false,
        _ => true,
    }
}

fn describe(value: Option<&str>) -> &str {
    value.map(str::trim).unwrap_or(ABSENT)
}

/// Compares a post-correction record with its re-keyed copy.
pub fn compare(
    inputs: &AuditInputs,
    record: &CandidateRecord,
    rekeyed: &CandidateRecord,
) -> Vec<NewFlag> {
    let mut flags = Vec::new();
    let roll_field = inputs.roll_field();

    if record.roll_number.trim() != rekeyed.roll_number.trim()
        && !record.fields.contains_key(roll_field)
    {
        flags.push(NewFlag::new(
            &record.barcode,
            roll_field,
            record.roll_number.trim(),
            format!(
                "{roll_field} mismatch: scanned '{}' vs re-keyed '{}'",
                record.roll_number.trim(),
                rekeyed.roll_number.trim()
            ),
        ));
    }

    let fields: BTreeSet<&str> = match &inputs.settings.mismatch_fields {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => record.fields.keys().chain(rekeyed.fields.keys()).collect(),
    };
    for field in fields.into_iter().filter(|f| *f != ANSWERS_FIELD) {
        let ours = record.fields.get(field);
        let theirs = rekeyed.fields.get(field);
        if differs(ours, theirs) {
            flags.push(NewFlag::new(
                &record.barcode,
                field,
                ours.unwrap_or(""),
                format!(
                    "{field} mismatch: scanned '{}' vs re-keyed '{}'",
                    describe(ours),
                    describe(theirs)
                ),
            ));
        }
    }

    let questions: BTreeSet<u32> = record
        .answers
        .question_numbers()
        .chain(rekeyed.answers.question_numbers())
        .collect();
    for question_no in questions {
        let ours = record.answers.raw(question_no);
        let theirs = rekeyed.answers.raw(question_no);
        if differs(ours, theirs) {
            flags.push(NewFlag::new(
                &record.barcode,
                format!("Q{question_no}"),
                ours.unwrap_or(""),
                format!(
                    "Answer mismatch for question {question_no}: scanned '{}' vs re-keyed '{}'",
                    describe(ours),
                    describe(theirs)
                ),
            ));
        }
    }

    flags
}

/// Field-by-field comparison against independently re-keyed data. Records
/// without a re-keyed copy are not compared.
pub fn check(inputs: &AuditInputs) -> Findings {
    let rekeyed: HashMap<&str, &CandidateRecord> = inputs
        .rekeyed
        .iter()
        .map(|r| (r.barcode.as_str(), r))
        .collect();

    let mut findings = Findings::default();
    for effective in &inputs.records {
        let record = &effective.record;
        if let Some(other) = rekeyed.get(record.barcode.as_str()) {
            for flag in compare(inputs, record, other) {
                findings.push(flag);
            }
        }
    }
    findings
}
