//! Trigger rules for the workflow `on` block
//!
//! GitHub accepts `on` as a single event name, a list of names, or a mapping
//! of event name to filters. Only the mapping form can carry filters.

use super::{collect_problems, Rule, RuleContext};
use crate::document::{key_string, string_list, ConfigDocument};
use crate::domain::{RuleCategory, RuleFailure, RuleResult};
use serde_yaml::Value;

/// Event names declared under `on`, whatever form it takes
fn declared_events(doc: &ConfigDocument) -> RuleResult<Vec<String>> {
    match doc.get(&["on"]) {
        Some(Value::Mapping(events)) => Ok(events.keys().map(key_string).collect()),
        Some(value @ (Value::String(_) | Value::Sequence(_))) => Ok(string_list(value)),
        Some(_) => Err(RuleFailure::shape("`on` is neither an event name, a list nor a mapping")),
        None => Err(RuleFailure::shape("workflow has no `on` trigger set")),
    }
}

/// Push and manual-dispatch events are both declared
pub struct TriggerEventsRule;

impl Rule for TriggerEventsRule {
    fn id(&self) -> &'static str {
        "trigger_events"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Triggers
    }

    fn description(&self) -> &'static str {
        "Workflow runs on push and workflow_dispatch"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let declared = declared_events(ctx.workflow()?)?;

        let problems = ctx
            .config()
            .workflow
            .triggers
            .events
            .iter()
            .filter(|event| !declared.contains(event))
            .map(|event| format!("trigger `{event}` is not declared"))
            .collect();

        collect_problems(problems)
    }
}

/// Push filters cover the default branch and version tags
pub struct PushFiltersRule;

impl Rule for PushFiltersRule {
    fn id(&self) -> &'static str {
        "push_filters"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Triggers
    }

    fn description(&self) -> &'static str {
        "Push trigger filters the default branch and version tags"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.workflow()?;
        let triggers = &ctx.config().workflow.triggers;

        // Validates the overall shape of `on` before looking for filters
        declared_events(doc)?;

        let push = match doc.get(&["on", "push"]) {
            Some(Value::Mapping(push)) => push,
            _ => {
                return Err(RuleFailure::assertion(
                    "push trigger declares no branch or tag filters",
                ))
            }
        };

        let mut problems = Vec::new();

        let branches = push.get("branches").map(string_list).unwrap_or_default();
        if !branches.iter().any(|b| *b == triggers.default_branch) {
            problems.push(format!(
                "push branches {:?} do not include `{}`",
                branches, triggers.default_branch
            ));
        }

        let tags = push.get("tags").map(string_list).unwrap_or_default();
        if !tags.iter().any(|t| t.starts_with(&triggers.tag_prefix)) {
            problems.push(format!(
                "push tags {:?} have no filter starting with `{}`",
                tags, triggers.tag_prefix
            ));
        }

        collect_problems(problems)
    }
}

/// Manual dispatch declares its input parameters
pub struct DispatchInputsRule;

impl Rule for DispatchInputsRule {
    fn id(&self) -> &'static str {
        "dispatch_inputs"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Triggers
    }

    fn description(&self) -> &'static str {
        "workflow_dispatch declares its input parameters"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.workflow()?;
        declared_events(doc)?;

        let inputs = match doc.get(&["on", "workflow_dispatch", "inputs"]) {
            Some(Value::Mapping(inputs)) if !inputs.is_empty() => inputs,
            _ => return Err(RuleFailure::assertion("workflow_dispatch declares no inputs")),
        };

        let problems = ctx
            .config()
            .workflow
            .triggers
            .dispatch_inputs
            .iter()
            .filter(|name| !inputs.contains_key(name.as_str()))
            .map(|name| format!("workflow_dispatch input `{name}` is not declared"))
            .collect();

        collect_problems(problems)
    }
}
