//! Third-party action references found in the raw workflow text
//!
//! This is the one inherently textual check, so it reads the source rather
//! than the parsed tree and still runs when the YAML is malformed.

use super::{collect_problems, Rule, RuleContext};
use crate::domain::{RuleCategory, RuleResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref USES_LINE: Regex =
        Regex::new(r#"(?m)^\s*(?:-\s+)?uses:\s*['"]?([^\s'"@#]+)"#).unwrap();
}

/// Action names referenced by `uses:` lines, without their refs
pub fn referenced_actions(source: &str) -> BTreeSet<&str> {
    USES_LINE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// The workflow references every expected external action
pub struct ActionReferencesRule;

impl Rule for ActionReferencesRule {
    fn id(&self) -> &'static str {
        "action_references"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::References
    }

    fn description(&self) -> &'static str {
        "Workflow references the checkout, setup-python, upload-artifact and release actions"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let found = referenced_actions(ctx.workflow_text()?);
        tracing::debug!("Workflow references {} actions", found.len());

        let problems = ctx
            .config()
            .workflow
            .referenced_actions
            .iter()
            .filter(|action| !found.contains(action.as_str()))
            .map(|action| format!("`{action}` is not referenced"))
            .collect();

        collect_problems(problems)
    }
}
