// src/engine/records.rs

use std::collections::HashMap;

use crate::models::record::{CandidateRecord, CandidateRow, RegistrationRecord, RegistrationRow};

/// Where an effective record's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Scanned,
    Corrected,
}

impl RecordSource {
    /// Tag used in flag remarks.
    pub fn tag(&self) -> &'static str {
        match self {
            RecordSource::Scanned => "OMRData",
            RecordSource::Corrected => "CorrectedOMRData",
        }
    }
}

/// A candidate record after its corrected overlay, if any, was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveRecord {
    pub record: CandidateRecord,
    pub source: RecordSource,
}

/// Parses raw rows, logging and counting the ones that fail.
pub fn parse_candidates(rows: Vec<CandidateRow>, malformed: &mut usize) -> Vec<CandidateRecord> {
    rows.into_iter()
        .filter_map(|row| match CandidateRecord::try_from(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping record: {}", e);
                *malformed += 1;
                None
            }
        })
        .collect()
}

pub fn parse_registrations(
    rows: Vec<RegistrationRow>,
    malformed: &mut usize,
) -> Vec<RegistrationRecord> {
    rows.into_iter()
        .filter_map(|row| match RegistrationRecord::try_from(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping registration: {}", e);
                *malformed += 1;
                None
            }
        })
        .collect()
}

/// Merges corrected overlays into their originals. An overlay without an
/// active original stands on its own.
pub fn apply_overlays(
    scanned: &[CandidateRecord],
    corrected: &[CandidateRecord],
) -> Vec<EffectiveRecord> {
    let mut overlays: HashMap<&str, &CandidateRecord> = HashMap::new();
    for overlay in corrected {
        if overlays.insert(overlay.barcode.as_str(), overlay).is_some() {
            tracing::warn!(
                barcode = %overlay.barcode,
                "More than one corrected record; using the last"
            );
        }
    }

    let mut effective = Vec::with_capacity(scanned.len());
    for record in scanned {
        match overlays.remove(record.barcode.as_str()) {
            Some(overlay) => effective.push(EffectiveRecord {
                record: record.clone().with_overlay(overlay),
                source: RecordSource::Corrected,
            }),
            None => effective.push(EffectiveRecord {
                record: record.clone(),
                source: RecordSource::Scanned,
            }),
        }
    }

    // Keep the remaining overlays in their stored order.
    for overlay in corrected {
        if overlays.remove(overlay.barcode.as_str()).is_some() {
            effective.push(EffectiveRecord {
                record: overlay.clone(),
                source: RecordSource::Corrected,
            });
        }
    }
    effective
}

/// Roll numbers that identify nobody: blank or carrying the multi-mark sentinel.
pub fn is_readable_roll(roll_number: &str) -> bool {
    let roll = roll_number.trim();
    !roll.is_empty() && !roll.contains('*')
}
