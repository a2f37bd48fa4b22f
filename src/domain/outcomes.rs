//! Core domain models for rule outcomes and validation runs
//!
//! Architecture: Rich Domain Models - Outcomes classify themselves and the report aggregates them
//! - RuleFailure is what a rule returns; Outcome is what the report records
//! - RunReport acts as an aggregate root over the ordered rule outcomes
//! - Counts are derived when an outcome is recorded, never recomputed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Concern a rule belongs to, in the order rules are registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Structure,
    Triggers,
    Permissions,
    Jobs,
    Environment,
    Dependencies,
    Artifacts,
    Release,
    Concurrency,
    References,
    Builder,
    Project,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Triggers => "triggers",
            Self::Permissions => "permissions",
            Self::Jobs => "jobs",
            Self::Environment => "environment",
            Self::Dependencies => "dependencies",
            Self::Artifacts => "artifacts",
            Self::Release => "release",
            Self::Concurrency => "concurrency",
            Self::References => "references",
            Self::Builder => "builder",
            Self::Project => "project",
        }
    }

    /// Parse a category from its display name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        Self::all().iter().copied().find(|c| c.as_str() == name)
    }

    pub fn all() -> &'static [RuleCategory] {
        &[
            Self::Structure,
            Self::Triggers,
            Self::Permissions,
            Self::Jobs,
            Self::Environment,
            Self::Dependencies,
            Self::Artifacts,
            Self::Release,
            Self::Concurrency,
            Self::References,
            Self::Builder,
            Self::Project,
        ]
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a rule could not pass, as returned from `Rule::evaluate`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleFailure {
    /// An input file the rule needs does not exist
    #[error("missing file: {}", .0.display())]
    MissingFile(PathBuf),

    /// An input file exists but is not well-formed
    #[error("cannot parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The document was read but the asserted property does not hold
    #[error("{0}")]
    Assertion(String),

    /// The document has an unexpected shape, so the check could not run
    #[error("{0}")]
    Shape(String),
}

impl RuleFailure {
    pub fn assertion(reason: impl Into<String>) -> Self {
        Self::Assertion(reason.into())
    }

    pub fn shape(cause: impl Into<String>) -> Self {
        Self::Shape(cause.into())
    }

    pub fn missing_file(path: impl AsRef<Path>) -> Self {
        Self::MissingFile(path.as_ref().to_path_buf())
    }
}

/// Result type returned by rules
pub type RuleResult<T = ()> = Result<T, RuleFailure>;

/// Classification of a failed outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingFile,
    ParseError,
    Assertion,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingFile => "missing file",
            Self::ParseError => "parse error",
            Self::Assertion => "assertion",
        }
    }
}

/// Result of evaluating one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail { kind: FailureKind, reason: String },
    /// The rule itself could not complete
    Error { cause: String },
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail { .. } => "FAIL",
            Self::Error { .. } => "ERROR",
        }
    }

    /// Failure reason or error cause, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Pass => None,
            Self::Fail { reason, .. } => Some(reason),
            Self::Error { cause } => Some(cause),
        }
    }
}

impl From<RuleResult> for Outcome {
    fn from(result: RuleResult) -> Self {
        match result {
            Ok(()) => Self::Pass,
            Err(RuleFailure::MissingFile(path)) => Self::Fail {
                kind: FailureKind::MissingFile,
                reason: format!("{} does not exist", path.display()),
            },
            Err(RuleFailure::Parse { path, message }) => Self::Fail {
                kind: FailureKind::ParseError,
                reason: format!("{} is not valid YAML: {message}", path.display()),
            },
            Err(RuleFailure::Assertion(reason)) => Self::Fail { kind: FailureKind::Assertion, reason },
            Err(RuleFailure::Shape(cause)) => Self::Error { cause },
        }
    }
}

/// The outcome of one registered rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub category: RuleCategory,
    pub description: String,
    pub outcome: Outcome,
}

impl RuleOutcome {
    pub fn new(
        rule_id: impl Into<String>,
        category: RuleCategory,
        description: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            category,
            description: description.into(),
            outcome,
        }
    }

    /// Format for single-line display
    pub fn format_display(&self) -> String {
        match self.outcome.detail() {
            Some(detail) => format!("[{}] {}: {}", self.outcome.label(), self.rule_id, detail),
            None => format!("[{}] {}: {}", self.outcome.label(), self.rule_id, self.description),
        }
    }
}

/// Pass/fail counts for one category or the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub passed: usize,
    /// Fail and Error outcomes together
    pub failed: usize,
    /// The subset of `failed` that were Error outcomes
    pub errors: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn add(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Pass => self.passed += 1,
            Outcome::Fail { .. } => self.failed += 1,
            Outcome::Error { .. } => {
                self.failed += 1;
                self.errors += 1;
            }
        }
    }
}

/// Summary statistics for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub counts: OutcomeCounts,
    pub by_category: BTreeMap<RuleCategory, OutcomeCounts>,
    pub execution_time_ms: u64,
    pub validated_at: DateTime<Utc>,
}

/// Complete report of one validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// One entry per evaluated rule, in registration order
    pub outcomes: Vec<RuleOutcome>,
    pub summary: RunSummary,
    pub config_fingerprint: Option<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            summary: RunSummary {
                validated_at: Utc::now(),
                ..Default::default()
            },
            config_fingerprint: None,
        }
    }

    pub fn record(&mut self, outcome: RuleOutcome) {
        self.summary.counts.add(&outcome.outcome);
        self.summary
            .by_category
            .entry(outcome.category)
            .or_default()
            .add(&outcome.outcome);
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.summary.counts.total()
    }

    pub fn passed(&self) -> usize {
        self.summary.counts.passed
    }

    pub fn failed(&self) -> usize {
        self.summary.counts.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Process exit status for this report
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn outcome_for(&self, rule_id: &str) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.rule_id == rule_id)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_pass())
    }

    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that stop a run before or after rule evaluation
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Report could not be rendered
    #[error("Report error: {message}")]
    Report { message: String },
}

impl GuardError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

/// Result type for Guardian operations
pub type GuardResult<T> = Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, category: RuleCategory, outcome: Outcome) -> RuleOutcome {
        RuleOutcome::new(id, category, "test rule", outcome)
    }

    #[test]
    fn test_rule_failure_mapping() {
        let missing: Outcome = Err(RuleFailure::missing_file("a.yml")).into();
        assert_eq!(
            missing,
            Outcome::Fail {
                kind: FailureKind::MissingFile,
                reason: "a.yml does not exist".to_string()
            }
        );

        let shape: Outcome = Err(RuleFailure::shape("`jobs` is not a mapping")).into();
        assert!(shape.is_error());

        let pass: Outcome = Ok(()).into();
        assert!(pass.is_pass());
    }

    #[test]
    fn test_errors_count_as_failures() {
        let mut report = RunReport::new();
        report.record(outcome("a", RuleCategory::Jobs, Outcome::Pass));
        report.record(outcome(
            "b",
            RuleCategory::Jobs,
            Outcome::Fail { kind: FailureKind::Assertion, reason: "nope".into() },
        ));
        report.record(outcome("c", RuleCategory::Builder, Outcome::Error { cause: "shape".into() }));

        assert_eq!(report.total(), 3);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.summary.counts.errors, 1);
        assert_eq!(report.summary.by_category[&RuleCategory::Jobs].total(), 2);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn test_empty_report_succeeds() {
        let report = RunReport::new();
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(RuleCategory::from_name("Permissions"), Some(RuleCategory::Permissions));
        assert_eq!(RuleCategory::from_name("nope"), None);
        assert!(RuleCategory::Structure < RuleCategory::Project);
    }

    #[test]
    fn test_format_display() {
        let line = outcome(
            "permissions_denylist",
            RuleCategory::Permissions,
            Outcome::Fail { kind: FailureKind::Assertion, reason: "grants `admin`".into() },
        )
        .format_display();
        assert_eq!(line, "[FAIL] permissions_denylist: grants `admin`");
    }
}
