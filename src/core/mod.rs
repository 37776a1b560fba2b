// src/core/mod.rs

/// Data structures shared by every stage of a scan: targets, parsed
/// documents, verdicts and reports.
pub mod models;

/// The probe/parse/validate workflow and its stages.
pub mod scanner;

/// Static catalogue of findings used to word alerts.
pub mod knowledge_base;

/// Verdict persistence and alert emission.
pub mod sink;
