// src/engine/scoring.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use super::{
    ambiguity::AmbiguityResolver,
    answer_keys::AnswerKeyIndex,
    records::{apply_overlays, is_readable_roll, parse_candidates, parse_registrations},
    sections::SectionConfigIndex,
    sink,
};
use crate::{
    error::AuditError,
    models::{
        ambiguity::AmbiguityPolicy,
        record::{Answer, CandidateRecord, RegistrationRecord},
        score::{Score, SectionResult},
        settings::{MultiMarkScoring, ProjectSettings},
    },
    store::RecordStore,
};

/// Everything needed to score one course of one project. Built once per
/// batch and only read afterwards, so workers share it without locking.
#[derive(Debug)]
pub struct ScoringContext {
    pub project_id: i64,
    pub course: String,
    pub settings: ProjectSettings,
    pub keys: AnswerKeyIndex,
    pub sections: SectionConfigIndex,
    pub ambiguity: AmbiguityResolver,
    pub registrations: HashMap<String, RegistrationRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Scored(Score),
    /// The candidate's registration lists subject codes without this course.
    Ineligible,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    correct: u32,
    wrong: u32,
}

impl ScoringContext {
    /// Registration decides eligibility only when it lists subject codes.
    pub fn is_eligible(&self, roll_number: &str) -> bool {
        let Some(field) = self.settings.subject_code_field.as_deref() else {
            return true;
        };
        let Some(registration) = self.registrations.get(roll_number) else {
            return true;
        };
        match registration.fields.get(field).map(str::trim) {
            None | Some("") => true,
            Some(codes) => codes
                .split(',')
                .any(|code| code.trim().eq_ignore_ascii_case(self.course.trim())),
        }
    }

    /// Scores one candidate against the key for its booklet set.
    pub fn score_candidate(
        &self,
        record: &CandidateRecord,
    ) -> Result<CandidateOutcome, AuditError> {
        if !is_readable_roll(&record.roll_number) {
            return Err(AuditError::malformed(
                &record.barcode,
                format!("unusable roll number '{}'", record.roll_number),
            ));
        }
        if !self.is_eligible(&record.roll_number) {
            return Ok(CandidateOutcome::Ineligible);
        }

        let set_code = self
            .settings
            .booklet_set(&record.fields)
            .ok_or_else(|| AuditError::KeyNotFound {
                course: self.course.clone(),
                set_code: String::new(),
            })?;
        let key_set = self.keys.select(&self.course, set_code)?;
        let subject_choice = self.settings.subject_choice(&record.fields);
        let sections = self.sections.applicable(&self.course, key_set, subject_choice)?;

        let mut results = Vec::with_capacity(sections.len());
        for section in sections {
            let mut tally = Tally::default();
            for question in key_set.questions_in(section) {
                let given = record.answers.answer(question.question_no);
                match self
                    .ambiguity
                    .policy(&self.course, &key_set.set_code, question.question_no)
                {
                    Some(policy) => apply_override(policy, given, &mut tally),
                    None => match given {
                        Answer::Absent | Answer::Blank => {}
                        Answer::MultiMark => {
                            if self.settings.multi_mark_scoring == MultiMarkScoring::Wrong {
                                tally.wrong += 1;
                            }
                        }
                        Answer::Marked(value) if question.accepts(value) => tally.correct += 1,
                        Answer::Marked(_) => tally.wrong += 1,
                    },
                }
            }

            results.push(SectionResult {
                name: section.key.to_string(),
                correct_count: tally.correct,
                wrong_count: tally.wrong,
                sub_score: section.score(tally.correct, tally.wrong),
            });
        }

        Ok(CandidateOutcome::Scored(Score {
            roll_number: record.roll_number.clone(),
            course: self.course.clone(),
            project_id: self.project_id,
            total_score: results.iter().map(|r| r.sub_score).sum(),
            sections: results,
        }))
    }
}

fn apply_override(policy: AmbiguityPolicy, given: Answer<'_>, tally: &mut Tally) {
    match policy {
        AmbiguityPolicy::AwardAll => tally.correct += 1,
        AmbiguityPolicy::AwardIfAttempted => {
            if given.is_attempted() {
                tally.correct += 1;
            }
        }
        // Neither tally moves; multi-marks are the audit's business.
        AmbiguityPolicy::AwardNone | AmbiguityPolicy::FlagAsMultiple => {}
    }
}

/// Counts reported back to the caller of a scoring batch.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub project_id: i64,
    pub course: String,
    pub candidates: usize,
    pub scored: usize,
    pub written: u64,
    pub already_scored: usize,
    pub ineligible: usize,
    pub key_not_found: usize,
    pub config_not_found: usize,
    pub malformed: usize,
    /// Registration rows that failed to parse. Their candidates are scored
    /// as if unregistered.
    pub malformed_registrations: usize,
    pub failed: usize,
}

impl ScoreReport {
    fn count_skip(&mut self, barcode: &str, err: &AuditError) {
        tracing::warn!(barcode, "Skipping candidate: {}", err);
        match err {
            AuditError::KeyNotFound { .. } => self.key_not_found += 1,
            AuditError::ConfigNotFound { .. } => self.config_not_found += 1,
            _ => self.malformed += 1,
        }
    }
}

/// Scores every candidate of a project for one course.
///
/// * Loads all sources first; an unavailable source aborts before any write.
/// * Candidates whose score already exists are skipped.
/// * Remaining candidates are scored in chunks on up to `workers` blocking
///   tasks, and the resulting scores are written in one idempotent batch.
pub async fn run_scoring(
    store: Arc<dyn RecordStore>,
    project_id: i64,
    course: &str,
    workers: usize,
) -> Result<ScoreReport, AuditError> {
    let workers = workers.max(1);
    let mut report = ScoreReport {
        project_id,
        course: course.to_string(),
        ..Default::default()
    };

    let settings = store.get_project_settings(project_id).await?.unwrap_or_default();
    let answer_key = store.get_answer_key(project_id, course).await?;
    let section_config = store.get_section_config(project_id, course).await?;
    let ambiguous = store.list_ambiguous_questions(project_id, course).await?;
    let scanned_rows = store.list_candidate_records(project_id).await?;
    let corrected_rows = store.list_corrected_records(project_id).await?;
    let registration_rows = store.list_registration_records(project_id).await?;
    let existing: HashSet<String> = store
        .existing_score_roll_numbers(project_id, course)
        .await?
        .into_iter()
        .collect();

    if answer_key.is_none() {
        tracing::warn!(project_id, course, "No answer key stored for course");
    }

    let mut malformed = 0;
    let scanned = parse_candidates(scanned_rows, &mut malformed);
    let corrected = parse_candidates(corrected_rows, &mut malformed);
    let registrations = parse_registrations(registration_rows, &mut report.malformed_registrations)
        .into_iter()
        .map(|r| (r.roll_number.clone(), r))
        .collect();
    report.malformed = malformed;

    let context = Arc::new(ScoringContext {
        project_id,
        course: course.to_string(),
        settings,
        keys: AnswerKeyIndex::build(answer_key),
        sections: SectionConfigIndex::build(section_config),
        ambiguity: AmbiguityResolver::build(ambiguous),
        registrations,
    });

    let pending: Vec<CandidateRecord> = apply_overlays(&scanned, &corrected)
        .into_iter()
        .map(|e| e.record)
        .filter(|record| {
            if existing.contains(&record.roll_number) {
                report.already_scored += 1;
                false
            } else {
                true
            }
        })
        .collect();
    report.candidates = pending.len() + report.already_scored;

    let chunk_size = pending.len().div_ceil(workers).max(1);
    let chunks: Vec<Vec<CandidateRecord>> = pending.chunks(chunk_size).map(<[_]>::to_vec).collect();

    let results: Vec<_> = stream::iter(chunks)
        .map(|chunk| {
            let context = context.clone();
            let size = chunk.len();
            let handle = tokio::task::spawn_blocking(move || {
                chunk
                    .iter()
                    .map(|record| (record.barcode.clone(), context.score_candidate(record)))
                    .collect::<Vec<_>>()
            });
            async move { (size, handle.await) }
        })
        .buffered(workers)
        .collect()
        .await;

    let mut scores = Vec::new();
    for (size, joined) in results {
        let outcomes = match joined {
            Ok(outcomes) => outcomes,
            Err(e) => {
                tracing::error!(project_id, course, "Scoring worker failed: {:?}", e);
                report.failed += size;
                continue;
            }
        };
        for (barcode, outcome) in outcomes {
            match outcome {
                Ok(CandidateOutcome::Scored(score)) => scores.push(score),
                Ok(CandidateOutcome::Ineligible) => report.ineligible += 1,
                Err(e) => report.count_skip(&barcode, &e),
            }
        }
    }
    report.scored = scores.len();

    // Chunks come back in record order and the sort is stable, so when two
    // records share a roll number the one earlier in record order is kept.
    scores.sort_by(|a, b| a.roll_number.cmp(&b.roll_number));
    let write = sink::write_scores(store.as_ref(), project_id, course, scores).await?;
    report.written = write.written;

    tracing::info!(
        project_id,
        course,
        candidates = report.candidates,
        scored = report.scored,
        written = report.written,
        already_scored = report.already_scored,
        skipped = report.key_not_found + report.config_not_found + report.malformed,
        malformed_registrations = report.malformed_registrations,
        "Scoring batch finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ambiguity::AmbiguousQuestion,
        answer_key::{AnswerKey, AnswerKeySet, KeyQuestion},
        record::{AnswerSheet, FieldMap, RecordStatus},
        section::{Section, SectionConfig, SectionKey},
    };

    fn context(ambiguous: Vec<AmbiguousQuestion>) -> ScoringContext {
        ScoringContext {
            project_id: 1,
            course: "Math".into(),
            settings: ProjectSettings::default(),
            keys: AnswerKeyIndex::build([AnswerKey {
                course: "Math".into(),
                sets: vec![AnswerKeySet {
                    set_code: "A".into(),
                    questions: vec![KeyQuestion::new(1, "B"), KeyQuestion::new(2, "C,D")],
                }],
            }]),
            sections: SectionConfigIndex::build([SectionConfig {
                course: "Math".into(),
                sections: vec![Section {
                    key: SectionKey::plain("All"),
                    start_question: 1,
                    end_question: 2,
                    marks_correct: 1.0,
                    marks_wrong: 0.25,
                    negative_marking: true,
                }],
            }]),
            ambiguity: AmbiguityResolver::build(ambiguous),
            registrations: HashMap::new(),
        }
    }

    fn candidate(answers: &[(u32, &str)]) -> CandidateRecord {
        CandidateRecord {
            barcode: "B1".into(),
            roll_number: "R1".into(),
            fields: FieldMap::new(),
            answers: answers.iter().map(|(q, a)| (*q, *a)).collect::<AnswerSheet>(),
            status: RecordStatus::Active,
        }
    }

    fn scored(outcome: Result<CandidateOutcome, AuditError>) -> Score {
        match outcome.unwrap() {
            CandidateOutcome::Scored(score) => score,
            other => panic!("expected a score, got {:?}", other),
        }
    }

    fn override_q1(policy: AmbiguityPolicy) -> Vec<AmbiguousQuestion> {
        vec![AmbiguousQuestion {
            course: "Math".into(),
            set_code: "A".into(),
            question_no: 1,
            policy,
        }]
    }

    #[test]
    fn test_one_right_one_wrong_with_negative_marking() {
        let score = scored(context(vec![]).score_candidate(&candidate(&[(1, "B"), (2, "A")])));
        assert_eq!(score.total_score, 0.75);
        assert_eq!(score.sections[0].correct_count, 1);
        assert_eq!(score.sections[0].wrong_count, 1);
    }

    #[test]
    fn test_any_accepted_option_counts_case_insensitively() {
        let score = scored(context(vec![]).score_candidate(&candidate(&[(1, "b"), (2, "d")])));
        assert_eq!(score.total_score, 2.0);
    }

    #[test]
    fn test_blank_and_absent_are_neither_right_nor_wrong() {
        let score = scored(context(vec![]).score_candidate(&candidate(&[(1, "")])));
        assert_eq!(score.correct_count(), 0);
        assert_eq!(score.wrong_count(), 0);
        assert_eq!(score.total_score, 0.0);
    }

    #[test]
    fn test_multi_mark_without_override_is_wrong() {
        let score = scored(context(vec![]).score_candidate(&candidate(&[(1, "*"), (2, "C")])));
        assert_eq!(score.correct_count(), 1);
        assert_eq!(score.wrong_count(), 1);
        assert_eq!(score.total_score, 0.75);
    }

    #[test]
    fn test_multi_mark_can_be_ignored_by_setting() {
        let mut ctx = context(vec![]);
        ctx.settings.multi_mark_scoring = MultiMarkScoring::Ignore;
        let score = scored(ctx.score_candidate(&candidate(&[(1, "*"), (2, "C")])));
        assert_eq!(score.wrong_count(), 0);
        assert_eq!(score.total_score, 1.0);
    }

    #[test]
    fn test_award_all_credits_any_answer() {
        let ctx = context(override_q1(AmbiguityPolicy::AwardAll));
        for given in ["A", "", "*"] {
            let score = scored(ctx.score_candidate(&candidate(&[(1, given)])));
            assert_eq!(score.correct_count(), 1, "answer {given:?}");
            assert_eq!(score.wrong_count(), 0);
        }
        let score = scored(ctx.score_candidate(&candidate(&[])));
        assert_eq!(score.correct_count(), 1);
    }

    #[test]
    fn test_award_if_attempted_requires_non_blank() {
        let ctx = context(override_q1(AmbiguityPolicy::AwardIfAttempted));
        assert_eq!(scored(ctx.score_candidate(&candidate(&[(1, "D")]))).correct_count(), 1);
        assert_eq!(scored(ctx.score_candidate(&candidate(&[(1, "")]))).correct_count(), 0);
    }

    #[test]
    fn test_award_none_excludes_question() {
        let ctx = context(override_q1(AmbiguityPolicy::AwardNone));
        for given in ["B", "A", "", "*"] {
            let score = scored(ctx.score_candidate(&candidate(&[(1, given)])));
            assert_eq!(score.correct_count(), 0);
            assert_eq!(score.wrong_count(), 0);
        }
    }

    #[test]
    fn test_flag_as_multiple_is_not_scored() {
        let ctx = context(override_q1(AmbiguityPolicy::FlagAsMultiple));
        let score = scored(ctx.score_candidate(&candidate(&[(1, "*"), (2, "C")])));
        assert_eq!(score.correct_count(), 1);
        assert_eq!(score.wrong_count(), 0);
    }

    #[test]
    fn test_unknown_booklet_set_is_key_not_found() {
        let mut ctx = context(vec![]);
        ctx.settings.booklet_set_field = Some("Series".into());
        let mut record = candidate(&[(1, "B")]);
        record.fields.insert("Series", "C");
        let err = ctx.score_candidate(&record).unwrap_err();
        assert!(matches!(err, AuditError::KeyNotFound { ref set_code, .. } if set_code == "C"));
    }

    #[test]
    fn test_subject_codes_exclude_other_courses() {
        let mut ctx = context(vec![]);
        ctx.settings.subject_code_field = Some("Subjects".into());
        ctx.registrations.insert(
            "R1".into(),
            RegistrationRecord {
                roll_number: "R1".into(),
                fields: [("Subjects", "Physics, Chemistry")].into_iter().collect(),
            },
        );
        assert_eq!(
            ctx.score_candidate(&candidate(&[(1, "B")])).unwrap(),
            CandidateOutcome::Ineligible
        );

        ctx.registrations.insert(
            "R1".into(),
            RegistrationRecord {
                roll_number: "R1".into(),
                fields: [("Subjects", "Physics, math")].into_iter().collect(),
            },
        );
        assert!(matches!(
            ctx.score_candidate(&candidate(&[(1, "B")])).unwrap(),
            CandidateOutcome::Scored(_)
        ));
    }

    #[test]
    fn test_unregistered_or_codeless_candidates_are_eligible() {
        let mut ctx = context(vec![]);
        ctx.settings.subject_code_field = Some("Subjects".into());
        assert!(ctx.is_eligible("R1"));

        ctx.registrations.insert(
            "R1".into(),
            RegistrationRecord {
                roll_number: "R1".into(),
                fields: FieldMap::new(),
            },
        );
        assert!(ctx.is_eligible("R1"));
    }

    #[test]
    fn test_unreadable_roll_is_malformed() {
        let mut record = candidate(&[(1, "B")]);
        record.roll_number = "1*3".into();
        let err = context(vec![]).score_candidate(&record).unwrap_err();
        assert!(matches!(err, AuditError::MalformedRecord { .. }));
    }
}
