// tests/scoring_tests.rs

mod common;

use std::sync::Arc;

use common::{PROJECT, row, seed_math};
use omr_audit::engine::run_scoring;
use omr_audit::error::AuditError;
use omr_audit::models::record::RegistrationRow;
use omr_audit::store::{MemoryRecordStore, RecordStore};

fn setup() -> Arc<MemoryRecordStore> {
    let store = Arc::new(MemoryRecordStore::new());
    seed_math(&store);
    store
}

#[tokio::test]
async fn scores_candidate_with_negative_marking() {
    // Arrange
    let store = setup();
    store.insert_candidate(PROJECT, row("B1", "R1", "{}", r#"{"1":"B","2":"A"}"#), true);

    // Act
    let report = run_scoring(store.clone(), PROJECT, "Math", 2).await.unwrap();

    // Assert
    assert_eq!(report.scored, 1);
    assert_eq!(report.written, 1);
    let scores = store.scores(PROJECT);
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].roll_number, "R1");
    assert!((scores[0].total_score - 0.75).abs() < 1e-9);
    assert_eq!(scores[0].correct_count(), 1);
    assert_eq!(scores[0].wrong_count(), 1);
}

#[tokio::test]
async fn multi_mark_counts_as_wrong_without_override() {
    let store = setup();
    store.insert_candidate(PROJECT, row("B1", "R1", "{}", r#"{"1":"*","2":"C"}"#), true);

    run_scoring(store.clone(), PROJECT, "Math", 1).await.unwrap();

    let scores = store.scores(PROJECT);
    assert!((scores[0].total_score - 0.75).abs() < 1e-9);
}

#[tokio::test]
async fn rerun_writes_nothing_new() {
    let store = setup();
    store.insert_candidate(PROJECT, row("B1", "R1", "{}", r#"{"1":"B","2":"D"}"#), true);
    store.insert_candidate(PROJECT, row("B2", "R2", "{}", r#"{"1":"A"}"#), true);

    let first = run_scoring(store.clone(), PROJECT, "Math", 4).await.unwrap();
    let second = run_scoring(store.clone(), PROJECT, "Math", 4).await.unwrap();

    assert_eq!(first.written, 2);
    assert_eq!(second.written, 0);
    assert_eq!(second.already_scored, 2);
    assert_eq!(store.scores(PROJECT).len(), 2);
}

#[tokio::test]
async fn corrected_overlay_takes_precedence() {
    let store = setup();
    store.insert_candidate(PROJECT, row("B1", "R1", "{}", r#"{"1":"A","2":"A"}"#), true);
    store.insert_corrected(PROJECT, row("B1", "R1", "{}", r#"{"1":"B"}"#));

    run_scoring(store.clone(), PROJECT, "Math", 2).await.unwrap();

    // Q1 corrected to B (right), Q2 still A (wrong)
    let scores = store.scores(PROJECT);
    assert!((scores[0].total_score - 0.75).abs() < 1e-9);
}

#[tokio::test]
async fn inactive_and_malformed_records_are_skipped() {
    let store = setup();
    store.insert_candidate(PROJECT, row("B1", "R1", "{}", r#"{"1":"B","2":"C"}"#), true);
    store.insert_candidate(PROJECT, row("B2", "R2", "{}", r#"{"1":"B"}"#), false);
    store.insert_candidate(PROJECT, row("B3", "R3", "not json", "{}"), true);

    let report = run_scoring(store.clone(), PROJECT, "Math", 2).await.unwrap();

    assert_eq!(report.scored, 1);
    assert_eq!(report.malformed, 1);
    let scores = store.scores(PROJECT);
    assert_eq!(scores.len(), 1);
    assert!((scores[0].total_score - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn unknown_booklet_set_is_counted_not_fatal() {
    let store = setup();
    store.set_settings(
        PROJECT,
        serde_json::from_value(serde_json::json!({ "bookletSetField": "Series" })).unwrap(),
    );
    store.insert_candidate(PROJECT, row("B1", "R1", r#"{"Series":"A"}"#, r#"{"1":"B"}"#), true);
    store.insert_candidate(PROJECT, row("B2", "R2", r#"{"Series":"Z"}"#, r#"{"1":"B"}"#), true);

    let report = run_scoring(store.clone(), PROJECT, "Math", 2).await.unwrap();

    assert_eq!(report.scored, 1);
    assert_eq!(report.key_not_found, 1);
    assert_eq!(store.scores(PROJECT)[0].roll_number, "R1");
}

#[tokio::test]
async fn unavailable_source_aborts_before_writing() {
    let store = setup();
    store.insert_candidate(PROJECT, row("B1", "R1", "{}", r#"{"1":"B"}"#), true);
    store.set_unavailable(true);

    let result = run_scoring(store.clone(), PROJECT, "Math", 2).await;

    assert!(matches!(result, Err(AuditError::SourceUnavailable(_))));
    store.set_unavailable(false);
    assert!(store.scores(PROJECT).is_empty());
    assert!(store.existing_score_roll_numbers(PROJECT, "Math").await.unwrap().is_empty());
}

#[tokio::test]
async fn broken_registration_row_is_reported() {
    let store = setup();
    store.set_settings(
        PROJECT,
        serde_json::from_value(serde_json::json!({ "subjectCodeField": "Subjects" })).unwrap(),
    );
    store.insert_registration(
        PROJECT,
        RegistrationRow {
            roll_number: "R1".to_string(),
            fields: "{broken".to_string(),
        },
    );
    store.insert_candidate(PROJECT, row("B1", "R1", "{}", r#"{"1":"B"}"#), true);

    let report = run_scoring(store.clone(), PROJECT, "Math", 2).await.unwrap();

    assert_eq!(report.malformed_registrations, 1);
    assert_eq!(report.malformed, 0);
    assert_eq!(report.scored, 1);
}

#[tokio::test]
async fn shared_roll_number_keeps_the_first_record() {
    for _ in 0..20 {
        let fresh = setup();
        fresh.insert_candidate(PROJECT, row("B1", "R1", "{}", r#"{"1":"B","2":"C"}"#), true);
        fresh.insert_candidate(PROJECT, row("B2", "R1", "{}", r#"{"1":"A","2":"A"}"#), true);

        let report = run_scoring(fresh.clone(), PROJECT, "Math", 2).await.unwrap();

        assert_eq!(report.written, 1);
        let scores = fresh.scores(PROJECT);
        assert_eq!(scores.len(), 1);
        assert!((scores[0].total_score - 2.0).abs() < 1e-9);
    }
}
