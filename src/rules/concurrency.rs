//! Concurrency control for overlapping runs

use super::{collect_problems, is_filled, Rule, RuleContext};
use crate::domain::{RuleCategory, RuleFailure, RuleResult};
use serde_yaml::Value;

/// A concurrency group cancels superseded runs
pub struct ConcurrencyControlRule;

impl Rule for ConcurrencyControlRule {
    fn id(&self) -> &'static str {
        "concurrency_control"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Concurrency
    }

    fn description(&self) -> &'static str {
        "Workflow sets a concurrency group with cancel-in-progress: true"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.workflow()?;

        let concurrency = match doc.get(&["concurrency"]) {
            Some(Value::Mapping(block)) => block,
            Some(Value::String(_)) => {
                return Err(RuleFailure::assertion(
                    "concurrency is a bare group name, cancel-in-progress is not set",
                ))
            }
            Some(_) => return Err(RuleFailure::shape("`concurrency` is not a mapping")),
            None => return Err(RuleFailure::assertion("workflow has no concurrency block")),
        };

        let mut problems = Vec::new();
        if !is_filled(concurrency.get("group")) {
            problems.push("concurrency group is empty".to_string());
        }
        if concurrency.get("cancel-in-progress") != Some(&Value::Bool(true)) {
            problems.push("cancel-in-progress is not true".to_string());
        }

        collect_problems(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_valid_workflow_passes() {
        assert_eq!(ConcurrencyControlRule.evaluate(&fixtures::valid_context()), Ok(()));
    }

    #[test]
    fn test_cancel_in_progress_false() {
        let ctx = fixtures::context(&fixtures::patched(
            "cancel-in-progress: true",
            "cancel-in-progress: false",
        ));
        let err = ConcurrencyControlRule.evaluate(&ctx).unwrap_err();
        assert_eq!(err, RuleFailure::assertion("cancel-in-progress is not true"));
    }

    #[test]
    fn test_bare_group_name() {
        let ctx = fixtures::context(&fixtures::patched(
            "concurrency:\n  group: ${{ github.workflow }}-${{ github.ref }}\n  cancel-in-progress: true\n",
            "concurrency: appimage\n",
        ));
        assert!(matches!(
            ConcurrencyControlRule.evaluate(&ctx),
            Err(RuleFailure::Assertion(_))
        ));
    }

    #[test]
    fn test_missing_block() {
        let err = ConcurrencyControlRule
            .evaluate(&fixtures::context(fixtures::MINIMAL_WORKFLOW))
            .unwrap_err();
        assert!(err.to_string().contains("no concurrency block"));
    }
}
