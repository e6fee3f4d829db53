// src/models/mod.rs

pub mod ambiguity;
pub mod answer_key;
pub mod field_config;
pub mod flag;
pub mod record;
pub mod requests;
pub mod score;
pub mod section;
pub mod settings;
