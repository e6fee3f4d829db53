// tests/common/mod.rs

#![allow(dead_code)]

use omr_audit::models::{
    answer_key::{AnswerKey, AnswerKeySet, KeyQuestion},
    record::{CandidateRow, RegistrationRow},
    section::{Section, SectionConfig, SectionKey},
};
use omr_audit::store::MemoryRecordStore;

pub const PROJECT: i64 = 7;

pub fn row(barcode: &str, roll: &str, fields: &str, answers: &str) -> CandidateRow {
    CandidateRow {
        barcode: barcode.to_string(),
        roll_number: roll.to_string(),
        fields: fields.to_string(),
        answers: answers.to_string(),
        status: String::new(),
    }
}

pub fn registration(roll: &str) -> RegistrationRow {
    RegistrationRow {
        roll_number: roll.to_string(),
        fields: "{}".to_string(),
    }
}

/// Course "Math": set A = {1: B, 2: C or D}, one section "All" over Q1-Q2
/// scoring +1 / -0.25.
pub fn seed_math(store: &MemoryRecordStore) {
    store.insert_answer_key(
        PROJECT,
        AnswerKey {
            course: "Math".to_string(),
            sets: vec![AnswerKeySet {
                set_code: "A".to_string(),
                questions: vec![KeyQuestion::new(1, "B"), KeyQuestion::new(2, "C,D")],
            }],
        },
    );
    store.insert_section_config(
        PROJECT,
        SectionConfig {
            course: "Math".to_string(),
            sections: vec![Section {
                key: SectionKey::plain("All"),
                start_question: 1,
                end_question: 2,
                marks_correct: 1.0,
                marks_wrong: 0.25,
                negative_marking: true,
            }],
        },
    );
}
