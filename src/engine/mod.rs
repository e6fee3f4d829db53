// src/engine/mod.rs

//! Scoring and auditing of scanned examination records.
//!
//! Per (project, course) batch the engine builds the answer key, section
//! and ambiguity indexes once, then scores each candidate independently.
//! The audit runs over the same sources and only produces flags.

pub mod ambiguity;
pub mod answer_keys;
pub mod audit;
pub mod records;
pub mod scoring;
pub mod sections;
pub mod sink;

pub use audit::{AuditCheck, AuditReport, run_audit};
pub use scoring::{ScoreReport, run_scoring};
