// src/handlers/mod.rs

pub mod audit;
pub mod health;
pub mod scoring;
