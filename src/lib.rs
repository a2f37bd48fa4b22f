//! Workflow Guardian - Static validation of an AppImage build and release pipeline
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Rules are pure assertions over read-only documents
//! - Configuration supplies every expectation; nothing about the project is hard-coded in rules
//! - The evaluator and reporter stay independent of how results are presented

pub mod config;
pub mod document;
pub mod domain;
pub mod evaluator;
pub mod guide;
pub mod report;
pub mod rules;

#[cfg(test)]
mod fixtures;

// Re-export main types for convenient access
pub use domain::{
    FailureKind, GuardError, GuardResult, Outcome, OutcomeCounts, RuleCategory, RuleFailure,
    RuleOutcome, RuleResult, RunReport, RunSummary,
};

pub use config::{GuardConfig, DEFAULT_CONFIG_FILES};

pub use document::{ConfigDocument, DocumentLoader, LoadError};

pub use evaluator::{Evaluator, RuleStats};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use rules::{Rule, RuleContext, RuleRegistry};

use std::path::Path;

/// Main entry point combining evaluation and reporting
pub struct WorkflowGuardian {
    evaluator: Evaluator,
    report_formatter: ReportFormatter,
}

impl WorkflowGuardian {
    /// Create a guardian with the given configuration
    pub fn new_with_config(config: GuardConfig) -> GuardResult<Self> {
        Ok(Self {
            evaluator: Evaluator::new(config)?,
            report_formatter: ReportFormatter::default(),
        })
    }

    /// Create a guardian with default configuration
    pub fn new() -> GuardResult<Self> {
        Self::new_with_config(GuardConfig::default())
    }

    /// Create a guardian loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        Self::new_with_config(GuardConfig::load_from_file(path)?)
    }

    /// Create a guardian for a project directory, discovering its configuration
    pub fn for_project<P: AsRef<Path>>(root: P) -> GuardResult<Self> {
        let root = root.as_ref();
        Self::new_with_config(GuardConfig::discover(root)?.with_root(root))
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        self.evaluator.config()
    }

    /// Load the configured files and run every enabled rule
    pub fn validate(&self) -> RunReport {
        self.evaluator.evaluate()
    }

    /// Run every enabled rule against in-memory documents
    ///
    /// A `None` builder behaves like a missing file. Project rules still
    /// look at the configured root.
    pub fn validate_sources(&self, workflow: &str, builder: Option<&str>) -> RunReport {
        let ctx = RuleContext::from_sources(self.config(), Some(workflow), builder);
        self.evaluator.evaluate_with(&ctx)
    }

    /// Format a run report for output
    pub fn format_report(&self, report: &RunReport, format: OutputFormat) -> GuardResult<String> {
        self.report_formatter.format_report(report, format)
    }

    /// Format a run report straight into a writer
    pub fn write_report<W: std::io::Write>(
        &self,
        report: &RunReport,
        format: OutputFormat,
        writer: W,
    ) -> GuardResult<()> {
        self.report_formatter.write_report(report, format, writer)
    }

    /// Registered rules in report order
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.evaluator.registry().iter()
    }

    /// Look up a registered rule by id
    pub fn rule(&self, id: &str) -> Option<&dyn Rule> {
        self.evaluator.registry().get(id)
    }

    /// Enabled and disabled rule counts for the current configuration
    pub fn rule_statistics(&self) -> RuleStats {
        self.evaluator.rule_stats()
    }
}

/// Convenience function to validate a project directory with its discovered configuration
pub fn validate_project<P: AsRef<Path>>(root: P) -> GuardResult<RunReport> {
    Ok(WorkflowGuardian::for_project(root)?.validate())
}
