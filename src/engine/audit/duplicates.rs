// src/engine/audit/duplicates.rs

use std::borrow::Cow;
use std::collections::HashMap;

use super::{AuditInputs, Findings};
use crate::models::flag::NewFlag;

pub const ABSENTEE_TAG: &str = "AbsenteeList";

struct Occurrence<'a> {
    barcode: Cow<'a, str>,
    roll_number: &'a str,
    tag: &'static str,
}

/// Flags every occurrence of a roll number seen more than once across the
/// scanned, corrected and absentee sources. Absentee entries carry no
/// barcode, so their flags are keyed by the roll number itself; a roll
/// repeated within the absentee list gets `#2`, `#3`.. on later entries so
/// every occurrence keeps its own flag.
pub fn check(inputs: &AuditInputs) -> Findings {
    let mut occurrences: Vec<Occurrence<'_>> = inputs
        .records
        .iter()
        .map(|e| Occurrence {
            barcode: Cow::Borrowed(e.record.barcode.as_str()),
            roll_number: e.record.roll_number.as_str(),
            tag: e.source.tag(),
        })
        .collect();
    let mut absentee_seen: HashMap<&str, usize> = HashMap::new();
    occurrences.extend(inputs.absentees.iter().map(|roll| {
        let nth = absentee_seen.entry(roll.trim()).or_default();
        *nth += 1;
        let barcode = if *nth == 1 {
            Cow::Borrowed(roll.as_str())
        } else {
            Cow::Owned(format!("{}#{}", roll.trim(), nth))
        };
        Occurrence {
            barcode,
            roll_number: roll,
            tag: ABSENTEE_TAG,
        }
    }));
    occurrences.retain(|o| inputs.is_countable_roll(o.roll_number));

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for occurrence in &occurrences {
        *counts.entry(occurrence.roll_number.trim()).or_default() += 1;
    }

    let mut findings = Findings::default();
    for occurrence in occurrences {
        let roll = occurrence.roll_number.trim();
        if counts.get(roll).copied().unwrap_or(0) > 1 {
            findings.push(NewFlag::new(
                occurrence.barcode,
                inputs.roll_field(),
                roll,
                format!("Duplicate Roll Number found with {roll} in {}", occurrence.tag),
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{corrected, record, remarks, scanned};
    use super::*;
    use crate::models::field_config::FieldConfig;

    #[test]
    fn test_scanned_and_absentee_duplicate() {
        let inputs = AuditInputs {
            records: vec![scanned(record("B5", "R5", &[])), scanned(record("B6", "R6", &[]))],
            absentees: vec!["R5".into()],
            ..Default::default()
        };

        let findings = check(&inputs);
        assert_eq!(
            remarks(&findings),
            vec![
                "Duplicate Roll Number found with R5 in OMRData",
                "Duplicate Roll Number found with R5 in AbsenteeList",
            ]
        );
        assert_eq!(findings.flags[0].barcode, "B5");
        assert_eq!(findings.flags[1].barcode, "R5");
    }

    #[test]
    fn test_corrected_records_are_tagged() {
        let inputs = AuditInputs {
            records: vec![
                scanned(record("B1", "R1", &[])),
                corrected(record("B2", "R1", &[])),
            ],
            ..Default::default()
        };
        let findings = check(&inputs);
        assert_eq!(
            remarks(&findings),
            vec![
                "Duplicate Roll Number found with R1 in OMRData",
                "Duplicate Roll Number found with R1 in CorrectedOMRData",
            ]
        );
    }

    #[test]
    fn test_unreadable_and_out_of_range_rolls_are_ignored() {
        let inputs = AuditInputs {
            records: vec![
                scanned(record("B1", "1*00", &[])),
                scanned(record("B2", "1*00", &[])),
                scanned(record("B3", "5000", &[])),
                scanned(record("B4", "5000", &[])),
            ],
            field_configs: vec![FieldConfig::range("Roll Number", 1000.0, 1999.0)],
            ..Default::default()
        };
        assert!(check(&inputs).flags.is_empty());
    }

    #[test]
    fn test_repeated_absentee_entries_keep_distinct_flags() {
        let inputs = AuditInputs {
            absentees: vec!["R5".into(), "R5".into()],
            ..Default::default()
        };

        let findings = check(&inputs);
        let barcodes: Vec<&str> = findings.flags.iter().map(|f| f.barcode.as_str()).collect();
        assert_eq!(barcodes, vec!["R5", "R5#2"]);
        assert_ne!(findings.flags[0].dedup_key(), findings.flags[1].dedup_key());
    }
}
