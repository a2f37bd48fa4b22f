//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - RunReport (domain) is converted to terminal, JSON, JUnit and GitHub representations
//! - Each formatter encapsulates the rules for its specific output format
//! - Formatting never changes counts or the exit status

use crate::domain::{GuardError, GuardResult, Outcome, RuleOutcome, RunReport};
use colored::Colorize;
use serde_json::Value as JsonValue;
use std::io::Write;

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per rule followed by a summary block
    Human,
    Json,
    /// JUnit XML, one testcase per rule
    Junit,
    /// GitHub Actions workflow commands
    GitHub,
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Only list rules that did not pass; the summary still counts every rule
    pub failures_only: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            failures_only: false,
        }
    }
}

/// Main report formatter that dispatches to specific formatters
pub struct ReportFormatter {
    options: ReportOptions,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a run report in the specified format
    pub fn format_report(&self, report: &RunReport, format: OutputFormat) -> GuardResult<String> {
        let outcomes = self.visible_outcomes(report);

        match format {
            OutputFormat::Human => Ok(self.format_human(report, &outcomes)),
            OutputFormat::Json => self.format_json(report, &outcomes),
            OutputFormat::Junit => Ok(self.format_junit(report, &outcomes)),
            OutputFormat::GitHub => Ok(self.format_github(&outcomes)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &RunReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn visible_outcomes<'a>(&self, report: &'a RunReport) -> Vec<&'a RuleOutcome> {
        report
            .outcomes
            .iter()
            .filter(|o| !self.options.failures_only || !o.outcome.is_pass())
            .collect()
    }

    fn paint(&self, text: &str, outcome: &Outcome) -> String {
        if !self.options.use_colors {
            return text.to_string();
        }
        match outcome {
            Outcome::Pass => text.green().to_string(),
            Outcome::Fail { .. } => text.red().to_string(),
            Outcome::Error { .. } => text.yellow().to_string(),
        }
    }

    fn format_human(&self, report: &RunReport, outcomes: &[&RuleOutcome]) -> String {
        let mut output = String::new();

        for rule in outcomes {
            let icon = match rule.outcome {
                Outcome::Pass => "✅",
                Outcome::Fail { .. } => "❌",
                Outcome::Error { .. } => "⚠️",
            };
            let label = self.paint(rule.outcome.label(), &rule.outcome);
            let message = rule.outcome.detail().unwrap_or(rule.description.as_str());
            output.push_str(&format!("{icon} {label} {}: {message}\n", rule.rule_id));
        }

        if !outcomes.is_empty() {
            output.push('\n');
        }
        output.push_str(&self.format_summary(report));
        output
    }

    /// Totals and the per-category breakdown
    fn format_summary(&self, report: &RunReport) -> String {
        let counts = &report.summary.counts;
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;
        let mut summary = String::new();

        let heading = if self.options.use_colors {
            "Summary:".bold().to_string()
        } else {
            "Summary:".to_string()
        };
        summary.push_str(&format!("📊 {heading} ({execution_time:.1}s)\n"));
        summary.push_str(&format!("  Total:  {}\n", counts.total()));

        let passed = format!("  Passed: {}", counts.passed);
        let mut failed = format!("  Failed: {}", counts.failed);
        if counts.errors > 0 {
            failed.push_str(&format!(" ({} internal errors)", counts.errors));
        }
        if self.options.use_colors {
            summary.push_str(&format!("{}\n", passed.green()));
            if counts.failed > 0 {
                summary.push_str(&format!("{}\n", failed.red()));
            } else {
                summary.push_str(&format!("{failed}\n"));
            }
        } else {
            summary.push_str(&format!("{passed}\n{failed}\n"));
        }

        if !report.summary.by_category.is_empty() {
            summary.push_str("  By category:\n");
            for (category, counts) in &report.summary.by_category {
                summary.push_str(&format!(
                    "    {:<13} {}/{} passed\n",
                    category.as_str(),
                    counts.passed,
                    counts.total()
                ));
            }
        }

        let verdict = if report.is_success() {
            "All checks passed"
        } else {
            "Release configuration has problems"
        };
        summary.push_str(&format!("{verdict}\n"));
        summary
    }

    fn format_json(&self, report: &RunReport, outcomes: &[&RuleOutcome]) -> GuardResult<String> {
        let json_outcomes: Vec<JsonValue> = outcomes
            .iter()
            .map(|o| {
                let mut entry = serde_json::json!({
                    "rule_id": o.rule_id,
                    "category": o.category.as_str(),
                    "description": o.description,
                    "status": o.outcome.label().to_lowercase(),
                    "message": o.outcome.detail(),
                });
                if let Outcome::Fail { kind, .. } = &o.outcome {
                    entry["kind"] = JsonValue::from(kind.as_str());
                }
                entry
            })
            .collect();

        let by_category: serde_json::Map<String, JsonValue> = report
            .summary
            .by_category
            .iter()
            .map(|(category, counts)| {
                (
                    category.as_str().to_string(),
                    serde_json::json!({
                        "passed": counts.passed,
                        "failed": counts.failed,
                        "errors": counts.errors,
                    }),
                )
            })
            .collect();

        let json_report = serde_json::json!({
            "outcomes": json_outcomes,
            "summary": {
                "total": report.total(),
                "passed": report.passed(),
                "failed": report.failed(),
                "errors": report.summary.counts.errors,
                "by_category": by_category,
                "execution_time_ms": report.summary.execution_time_ms,
                "validated_at": report.summary.validated_at.to_rfc3339(),
            },
            "config_fingerprint": report.config_fingerprint,
            "success": report.is_success(),
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| GuardError::report(format!("JSON serialization failed: {e}")))
    }

    fn format_junit(&self, report: &RunReport, outcomes: &[&RuleOutcome]) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let failures = outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Fail { .. }))
            .count();
        let errors = outcomes.iter().filter(|o| o.outcome.is_error()).count();
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        xml.push_str(&format!(
            "<testsuite name=\"workflow-guardian\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.3}\">\n",
            outcomes.len(),
            failures,
            errors,
            execution_time
        ));

        for rule in outcomes {
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\"",
                rule.category.as_str(),
                escape_xml(&rule.rule_id)
            ));

            match &rule.outcome {
                Outcome::Pass => xml.push_str("/>\n"),
                Outcome::Fail { kind, reason } => {
                    xml.push_str(">\n");
                    xml.push_str(&format!(
                        "    <failure message=\"{}\" type=\"{}\"/>\n",
                        escape_xml(reason),
                        kind.as_str()
                    ));
                    xml.push_str("  </testcase>\n");
                }
                Outcome::Error { cause } => {
                    xml.push_str(">\n");
                    xml.push_str(&format!("    <error message=\"{}\"/>\n", escape_xml(cause)));
                    xml.push_str("  </testcase>\n");
                }
            }
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    fn format_github(&self, outcomes: &[&RuleOutcome]) -> String {
        let mut output = String::new();

        for rule in outcomes {
            if let Some(message) = rule.outcome.detail() {
                output.push_str(&format!(
                    "::error title={}::{}\n",
                    rule.rule_id,
                    escape_workflow_command(message)
                ));
            }
        }

        output
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Workflow-command data may not contain raw newlines
fn escape_workflow_command(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}
