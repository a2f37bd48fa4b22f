//! Top-level structure of the workflow definition

use super::{collect_problems, Rule, RuleContext};
use crate::domain::{RuleCategory, RuleResult};

/// The workflow declares every required top-level key
pub struct RequiredKeysRule;

impl Rule for RequiredKeysRule {
    fn id(&self) -> &'static str {
        "required_keys"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structure
    }

    fn description(&self) -> &'static str {
        "Workflow declares name, on, jobs and permissions"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.workflow()?;

        let problems = ctx
            .config()
            .workflow
            .required_keys
            .iter()
            .filter(|key| !doc.contains_key(key))
            .map(|key| format!("missing top-level key `{key}`"))
            .collect();

        collect_problems(problems)
    }
}
