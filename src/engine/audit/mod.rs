// src/engine/audit/mod.rs

//! Data-quality checks over the raw record sources.
//!
//! Every check reads the same [`AuditInputs`], loaded in full before any
//! check runs, and returns the flags it would raise. Writing goes through
//! the sink, which suppresses (barcode, remark) pairs already stored.

pub mod characters;
pub mod duplicates;
pub mod mismatch;
pub mod missing;
pub mod multi_response;
pub mod range;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    records::{
        EffectiveRecord, apply_overlays, is_readable_roll, parse_candidates, parse_registrations,
    },
    sink,
};
use crate::{
    error::AuditError,
    models::{
        ambiguity::AmbiguousQuestion,
        field_config::FieldConfig,
        flag::NewFlag,
        record::{CandidateRecord, RecordStatus, RegistrationRecord},
        settings::ProjectSettings,
    },
    store::RecordStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCheck {
    FieldRange,
    DuplicateRollNumber,
    MissingRollNumber,
    SourceMismatch,
    MultipleResponse,
    InvalidCharacter,
}

impl AuditCheck {
    pub const ALL: [AuditCheck; 6] = [
        AuditCheck::FieldRange,
        AuditCheck::DuplicateRollNumber,
        AuditCheck::MissingRollNumber,
        AuditCheck::SourceMismatch,
        AuditCheck::MultipleResponse,
        AuditCheck::InvalidCharacter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCheck::FieldRange => "field_range",
            AuditCheck::DuplicateRollNumber => "duplicate_roll_number",
            AuditCheck::MissingRollNumber => "missing_roll_number",
            AuditCheck::SourceMismatch => "source_mismatch",
            AuditCheck::MultipleResponse => "multiple_response",
            AuditCheck::InvalidCharacter => "invalid_character",
        }
    }

    pub fn run(&self, inputs: &AuditInputs) -> Findings {
        match self {
            AuditCheck::FieldRange => range::check(inputs),
            AuditCheck::DuplicateRollNumber => duplicates::check(inputs),
            AuditCheck::MissingRollNumber => missing::check(inputs),
            AuditCheck::SourceMismatch => mismatch::check(inputs),
            AuditCheck::MultipleResponse => multi_response::check(inputs),
            AuditCheck::InvalidCharacter => characters::check(inputs),
        }
    }
}

impl fmt::Display for AuditCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All record sources of one project, parsed.
#[derive(Debug, Default)]
pub struct AuditInputs {
    pub project_id: i64,
    pub settings: ProjectSettings,
    /// Active scanned records after corrected overlays were applied.
    pub records: Vec<EffectiveRecord>,
    pub rekeyed: Vec<CandidateRecord>,
    pub registrations: Vec<RegistrationRecord>,
    pub absentees: Vec<String>,
    pub field_configs: Vec<FieldConfig>,
    pub ambiguous: Vec<AmbiguousQuestion>,
    pub malformed: usize,
}

impl AuditInputs {
    /// Reads every source. Any store failure aborts before a check runs.
    pub async fn load(store: &dyn RecordStore, project_id: i64) -> Result<Self, AuditError> {
        let settings = store.get_project_settings(project_id).await?.unwrap_or_default();
        let scanned_rows = store.list_candidate_records(project_id).await?;
        let corrected_rows = store.list_corrected_records(project_id).await?;
        let rekeyed_rows = store.list_rekeyed_records(project_id).await?;
        let registration_rows = store.list_registration_records(project_id).await?;
        let absentees = store.list_absentee_roll_numbers(project_id).await?;
        let field_configs = store.list_field_configs(project_id).await?;

        let mut ambiguous = Vec::new();
        for course in store.list_courses(project_id).await? {
            ambiguous.extend(store.list_ambiguous_questions(project_id, &course).await?);
        }

        let mut malformed = 0;
        let scanned = parse_candidates(scanned_rows, &mut malformed);
        let corrected = parse_candidates(corrected_rows, &mut malformed);
        let rekeyed = parse_candidates(rekeyed_rows, &mut malformed);
        let registrations = parse_registrations(registration_rows, &mut malformed);

        Ok(Self {
            project_id,
            records: apply_overlays(&scanned, &corrected),
            settings,
            rekeyed,
            registrations,
            absentees: absentees.into_iter().map(|r| r.trim().to_string()).collect(),
            field_configs,
            ambiguous,
            malformed,
        })
    }

    pub fn roll_field(&self) -> &str {
        &self.settings.roll_number_field
    }

    pub fn field_config(&self, field: &str) -> Option<&FieldConfig> {
        self.field_configs.iter().find(|c| c.field_name == field)
    }

    /// A roll number takes part in identifier checks when it is readable
    /// and, if a Roll-Number range is configured, numeric and inside it.
    pub fn is_countable_roll(&self, roll_number: &str) -> bool {
        if !is_readable_roll(roll_number) {
            return false;
        }
        match self.field_config(self.roll_field()).filter(|c| c.has_range()) {
            None => true,
            Some(config) => roll_number
                .trim()
                .parse::<f64>()
                .is_ok_and(|n| n.is_finite() && config.in_range(n)),
        }
    }
}

/// Flags raised by one check, plus the barcodes whose status should move
/// to `NeedsReview` once their flag is stored.
#[derive(Debug, Default)]
pub struct Findings {
    pub flags: Vec<NewFlag>,
    pub escalate: HashSet<String>,
    /// Fields or inputs the check could not validate for lack of configuration.
    pub skipped: usize,
}

impl Findings {
    pub fn push(&mut self, flag: NewFlag) {
        self.flags.push(flag);
    }

    /// Records a `ValidationSkipped` outcome. Not an error for the batch.
    pub fn skip(&mut self, field: &str, reason: impl Into<String>) {
        let skipped = AuditError::ValidationSkipped {
            field: field.to_string(),
            reason: reason.into(),
        };
        tracing::debug!("{}", skipped);
        self.skipped += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    pub check: AuditCheck,
    pub raised: usize,
    pub written: u64,
    pub suppressed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub project_id: i64,
    pub malformed_records: usize,
    pub escalated: usize,
    pub checks: Vec<CheckSummary>,
}

impl AuditReport {
    pub fn written(&self) -> u64 {
        self.checks.iter().map(|c| c.written).sum()
    }
}

/// Runs the requested checks (all of them when `checks` is empty).
pub async fn run_audit(
    store: &dyn RecordStore,
    project_id: i64,
    checks: &[AuditCheck],
) -> Result<AuditReport, AuditError> {
    let inputs = AuditInputs::load(store, project_id).await?;

    let mut selected: Vec<AuditCheck> = if checks.is_empty() {
        AuditCheck::ALL.to_vec()
    } else {
        checks.to_vec()
    };
    let mut seen = HashSet::new();
    selected.retain(|c| seen.insert(*c));

    let mut report = AuditReport {
        project_id,
        malformed_records: inputs.malformed,
        ..Default::default()
    };

    // Every check runs before anything is written, and all of their flags
    // go to the store in one write.
    let findings: Vec<(AuditCheck, Findings)> = selected
        .into_iter()
        .map(|check| (check, check.run(&inputs)))
        .collect();

    let mut owner: HashMap<(String, String), usize> = HashMap::new();
    let mut flags = Vec::new();
    for (i, (_, found)) in findings.iter().enumerate() {
        for flag in &found.flags {
            owner.entry(flag.dedup_key()).or_insert(i);
            flags.push(flag.clone());
        }
    }
    let write = sink::write_flags(store, project_id, flags).await?;

    let mut inserted: Vec<Vec<&NewFlag>> = vec![Vec::new(); findings.len()];
    for flag in &write.inserted {
        if let Some(&i) = owner.get(&flag.dedup_key()) {
            inserted[i].push(flag);
        }
    }

    let mut escalate: BTreeSet<&str> = BTreeSet::new();
    for ((check, found), stored) in findings.iter().zip(&inserted) {
        let raised = found.flags.len();
        let written = stored.len() as u64;
        escalate.extend(
            stored
                .iter()
                .map(|f| f.barcode.as_str())
                .filter(|b| found.escalate.contains(*b)),
        );

        tracing::info!(
            project_id,
            check = %check,
            raised,
            written,
            skipped = found.skipped,
            "Audit check finished"
        );
        report.checks.push(CheckSummary {
            check: *check,
            raised,
            written,
            suppressed: raised - stored.len(),
            skipped: found.skipped,
        });
    }

    for barcode in escalate {
        store
            .update_record_status(project_id, barcode, RecordStatus::NeedsReview)
            .await?;
        report.escalated += 1;
    }

    Ok(report)
}
