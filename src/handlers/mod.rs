// src/handlers/mod.rs
pub mod error;
pub mod report;
pub mod snapshot;
pub mod valuation;
