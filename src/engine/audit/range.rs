// src/engine/audit/range.rs

use super::{AuditInputs, Findings};
use crate::models::{
    field_config::FieldConfig,
    flag::NewFlag,
    record::{ANSWERS_FIELD, MULTI_MARK},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Blank,
    OutOfRange,
    NotAnOption,
}

/// Judges a single present value against its field's configuration.
/// At most one violation is reported per value.
pub fn evaluate(config: &FieldConfig, value: &str) -> Option<Violation> {
    let value = value.trim();
    if value.is_empty() {
        return Some(Violation::Blank);
    }
    if value.contains(MULTI_MARK) {
        return None;
    }
    if config.allows(value) {
        return None;
    }
    if config.has_range() {
        if let Ok(number) = value.parse::<f64>() {
            if number.is_finite() {
                return (!config.in_range(number)).then_some(Violation::OutOfRange);
            }
        }
    }
    Some(Violation::NotAnOption)
}

fn remark(field: &str, value: &str, violation: Violation) -> String {
    match violation {
        Violation::Blank => format!("{field} is Blank"),
        Violation::OutOfRange => format!("{field} {value} is out of range"),
        Violation::NotAnOption => format!("{field} {value} is not a correct option"),
    }
}

/// Range and allowed-value validation of every configured field.
pub fn check(inputs: &AuditInputs) -> Findings {
    let mut findings = Findings::default();

    for config in &inputs.field_configs {
        let field = config.field_name.as_str();
        if field == ANSWERS_FIELD {
            continue;
        }
        if !config.has_range() && !config.has_allowed_responses() {
            findings.skip(field, "no range or allowed responses configured");
            continue;
        }

        for effective in &inputs.records {
            let record = &effective.record;
            let raw = if field == inputs.roll_field() && !record.fields.contains_key(field) {
                Some(record.roll_number.as_str())
            } else {
                record.fields.get(field)
            };
            let Some(raw) = raw else {
                continue;
            };

            let value = inputs.settings.normalize(field, raw);
            if let Some(violation) = evaluate(config, value) {
                findings.push(NewFlag::new(
                    &record.barcode,
                    field,
                    raw,
                    remark(field, raw.trim(), violation),
                ));
                if record.status.is_complete() {
                    findings.escalate.insert(record.barcode.clone());
                }
            }
        }
    }

    findings
}
