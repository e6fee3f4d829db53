// src/engine/audit/characters.rs

use super::{AuditInputs, Findings};
use crate::models::{flag::NewFlag, record::ANSWERS_FIELD};

/// Flags field values holding a disallowed character or any whitespace.
/// The answers field is exempt.
pub fn check(inputs: &AuditInputs) -> Findings {
    let settings = &inputs.settings;
    let mut findings = Findings::default();

    for effective in &inputs.records {
        let record = &effective.record;
        let roll_field = inputs.roll_field();

        let mut values: Vec<(&str, &str)> = record
            .fields
            .iter()
            .filter(|(field, _)| *field != ANSWERS_FIELD)
            .collect();
        if !record.fields.contains_key(roll_field) {
            values.push((roll_field, record.roll_number.as_str()));
        }

        for (field, value) in values {
            if value.chars().any(|c| settings.is_disallowed(c)) {
                findings.push(NewFlag::new(
                    &record.barcode,
                    field,
                    value,
                    format!("{field} contains an invalid character"),
                ));
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{record, remarks, scanned};
    use super::*;

    #[test]
    fn test_star_and_whitespace_are_flagged() {
        let inputs = AuditInputs {
            records: vec![scanned(record(
                "B1",
                "R1",
                &[("Class", "1*"), ("Name", "A B"), ("Gender", "M"), ("Answers", "* *")],
            ))],
            ..Default::default()
        };
        assert_eq!(
            remarks(&check(&inputs)),
            vec!["Class contains an invalid character", "Name contains an invalid character"]
        );
    }

    #[test]
    fn test_roll_number_column_is_checked() {
        let inputs = AuditInputs {
            records: vec![scanned(record("B1", "12 4", &[]))],
            ..Default::default()
        };
        assert_eq!(
            remarks(&check(&inputs)),
            vec!["Roll Number contains an invalid character"]
        );
    }

    #[test]
    fn test_custom_disallowed_characters() {
        let mut inputs = AuditInputs {
            records: vec![scanned(record("B1", "R1", &[("Class", "1#")]))],
            ..Default::default()
        };
        assert!(check(&inputs).flags.is_empty());
        inputs.settings.disallowed_characters = "*#".into();
        assert_eq!(check(&inputs).flags.len(), 1);
    }
}
