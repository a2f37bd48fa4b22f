//! Domain layer for Workflow Guardian
//!
//! CDD Principle: Domain Model - Pure vocabulary of rules, outcomes and runs
//! - Contains the outcome taxonomy and the run report aggregate
//! - Independent of file systems, YAML parsing and terminal output

pub mod outcomes;

// Re-export main domain types for convenience
pub use outcomes::*;
