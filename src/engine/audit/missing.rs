// src/engine/audit/missing.rs

use std::collections::HashSet;

use super::{AuditInputs, Findings};
use crate::{engine::records::is_readable_roll, models::flag::NewFlag};

/// Compares the roll numbers seen on paper (scanned with overlays applied,
/// plus absentees) against registration.
///
/// * Registered but never seen: "Missing Roll Number".
/// * Seen on a record but not registered: "Unmatched Roll Number".
pub fn check(inputs: &AuditInputs) -> Findings {
    let mut findings = Findings::default();
    if inputs.registrations.is_empty() {
        findings.skip(inputs.roll_field(), "no registration records to compare against");
        return findings;
    }

    let registered: HashSet<&str> = inputs
        .registrations
        .iter()
        .map(|r| r.roll_number.trim())
        .filter(|r| !r.is_empty())
        .collect();

    let present: HashSet<&str> = inputs
        .records
        .iter()
        .map(|e| e.record.roll_number.trim())
        .chain(inputs.absentees.iter().map(|r| r.trim()))
        .filter(|r| !r.is_empty())
        .collect();

    let mut reported = HashSet::new();
    for registration in &inputs.registrations {
        let roll = registration.roll_number.trim();
        if roll.is_empty() || present.contains(roll) || !reported.insert(roll) {
            continue;
        }
        findings.push(NewFlag::new(
            roll,
            inputs.roll_field(),
            roll,
            format!("Missing Roll Number {roll}"),
        ));
    }

    for effective in &inputs.records {
        let record = &effective.record;
        let roll = record.roll_number.trim();
        if !is_readable_roll(roll) || registered.contains(roll) {
            continue;
        }
        findings.push(NewFlag::new(
            &record.barcode,
            inputs.roll_field(),
            roll,
            format!("Unmatched Roll Number {roll}"),
        ));
    }

    findings
}
