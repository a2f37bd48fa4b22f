//! Rule evaluation for one validation run
//!
//! Architecture: Domain Service - The evaluator orchestrates a run end to end
//! - Loads each input document once and shares it read-only with every rule
//! - Runs enabled rules in registration order, one outcome per rule
//! - A rule that fails or panics never stops the remaining rules

use crate::config::GuardConfig;
use crate::domain::{GuardResult, Outcome, RuleOutcome, RunReport};
use crate::rules::{Rule, RuleContext, RuleRegistry};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Runs the registered rules against the configured project
pub struct Evaluator {
    config: GuardConfig,
    registry: RuleRegistry,
}

impl Evaluator {
    /// Create an evaluator with the built-in rules
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        Self::with_registry(config, RuleRegistry::with_builtins())
    }

    /// Create an evaluator over a custom rule set
    pub fn with_registry(config: GuardConfig, registry: RuleRegistry) -> GuardResult<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    pub fn with_defaults() -> GuardResult<Self> {
        Self::new(GuardConfig::default())
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Load the configured documents and evaluate every enabled rule
    pub fn evaluate(&self) -> RunReport {
        let ctx = RuleContext::load(&self.config);
        self.evaluate_with(&ctx)
    }

    /// Evaluate every enabled rule against an already built context
    pub fn evaluate_with(&self, ctx: &RuleContext) -> RunReport {
        let start_time = Instant::now();
        let mut report = RunReport::new();

        for (path, digest) in ctx.document_digests() {
            tracing::debug!("Loaded {} (sha256 {})", path.display(), &digest[..12]);
        }

        for rule in self.registry.iter() {
            if !self.config.is_rule_enabled(rule.id()) {
                tracing::debug!("Skipping disabled rule {}", rule.id());
                continue;
            }

            let outcome = run_rule(rule, ctx);
            match outcome.detail() {
                Some(detail) => tracing::debug!("{} {}: {}", outcome.label(), rule.id(), detail),
                None => tracing::debug!("{} {}", outcome.label(), rule.id()),
            }

            report.record(RuleOutcome::new(
                rule.id(),
                rule.category(),
                rule.description(),
                outcome,
            ));
        }

        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.config.fingerprint());
        report
    }

    /// Counts of enabled and disabled rules
    pub fn rule_stats(&self) -> RuleStats {
        let mut stats = RuleStats::default();
        for rule in self.registry.iter() {
            if self.config.is_rule_enabled(rule.id()) {
                stats.enabled_rules += 1;
            } else {
                stats.disabled_rules += 1;
            }
        }
        stats.categories = self
            .registry
            .iter()
            .map(|r| r.category())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        stats
    }
}

/// Evaluate one rule, turning a panic into an Error outcome
fn run_rule(rule: &dyn Rule, ctx: &RuleContext) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(ctx))) {
        Ok(result) => Outcome::from(result),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!("Rule {} panicked: {}", rule.id(), message);
            Outcome::Error {
                cause: format!("rule panicked: {message}"),
            }
        }
    }
}

/// Statistics about the registered rules
#[derive(Debug, Default)]
pub struct RuleStats {
    pub enabled_rules: usize,
    pub disabled_rules: usize,
    pub categories: usize,
}

impl RuleStats {
    pub fn total_rules(&self) -> usize {
        self.enabled_rules + self.disabled_rules
    }
}
