//! Step rules: toolchain, checkout, system packages, artifacts and release
//!
//! Each rule looks for a step somewhere in the workflow and passes when at
//! least one matching step carries the expected configuration.

use super::{collect_problems, is_filled, job_body, jobs, Rule, RuleContext};
use crate::config::StepExpectations;
use crate::document::{key_string, scalar_string, ConfigDocument};
use crate::domain::{RuleCategory, RuleFailure, RuleResult};
use serde_yaml::{Mapping, Value};

/// One step of one job
#[derive(Debug, Clone)]
pub struct StepRef<'d> {
    pub job: String,
    /// Zero-based position within the job
    pub index: usize,
    pub step: &'d Mapping,
}

impl<'d> StepRef<'d> {
    pub fn uses(&self) -> Option<&'d str> {
        self.step.get("uses").and_then(Value::as_str)
    }

    pub fn run(&self) -> Option<&'d str> {
        self.step.get("run").and_then(Value::as_str)
    }

    pub fn with(&self, key: &str) -> Option<&'d Value> {
        self.step.get("with").and_then(|with| with.get(key))
    }

    /// Whether this step uses `action`, pinned to any ref
    pub fn uses_action(&self, action: &str) -> bool {
        self.uses().is_some_and(|uses| action_matches(uses, action))
    }

    /// Human-readable location, preferring the step name
    pub fn label(&self) -> String {
        match self.step.get("name").and_then(scalar_string) {
            Some(name) => format!("job `{}` step `{name}`", self.job),
            None => format!("job `{}` step {}", self.job, self.index + 1),
        }
    }
}

/// `uses` value refers to `action` (`owner/repo` or `owner/repo@ref`)
pub fn action_matches(uses: &str, action: &str) -> bool {
    match uses.split_once('@') {
        Some((name, _)) => name == action,
        None => uses == action,
    }
}

/// Every step of every job, in document order
pub fn all_steps(doc: &ConfigDocument) -> RuleResult<Vec<StepRef<'_>>> {
    let mut steps = Vec::new();

    for (name, body) in jobs(doc)? {
        let job = key_string(name);
        let body = job_body(&job, body)?;

        // Jobs that call reusable workflows have no steps
        let Some(list) = body.get("steps") else {
            continue;
        };
        let list = list
            .as_sequence()
            .ok_or_else(|| RuleFailure::shape(format!("job `{job}` steps is not a list")))?;

        for (index, step) in list.iter().enumerate() {
            let step = step.as_mapping().ok_or_else(|| {
                RuleFailure::shape(format!("job `{job}` step {} is not a mapping", index + 1))
            })?;
            steps.push(StepRef { job: job.clone(), index, step });
        }
    }

    Ok(steps)
}

/// Steps that use `action`; none found is an assertion failure
fn action_steps<'d>(doc: &'d ConfigDocument, action: &str) -> RuleResult<Vec<StepRef<'d>>> {
    let steps: Vec<_> = all_steps(doc)?
        .into_iter()
        .filter(|step| step.uses_action(action))
        .collect();

    if steps.is_empty() {
        return Err(RuleFailure::assertion(format!("no step uses `{action}`")));
    }
    Ok(steps)
}

/// Pass when any step passes `check`; otherwise report every step's problem
fn any_step<'d>(
    steps: &[StepRef<'d>],
    check: impl Fn(&StepRef<'d>) -> Result<(), String>,
) -> RuleResult {
    let mut problems = Vec::new();
    for step in steps {
        match check(step) {
            Ok(()) => return Ok(()),
            Err(problem) => problems.push(format!("{}: {problem}", step.label())),
        }
    }
    collect_problems(problems)
}

/// `with` fields of an action step that are missing or empty
fn missing_fields(step: &StepRef<'_>, fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| !is_filled(step.with(field)))
        .cloned()
        .collect()
}

/// A Python setup step pins the expected interpreter version
pub struct PythonToolchainRule;

impl Rule for PythonToolchainRule {
    fn id(&self) -> &'static str {
        "python_toolchain"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Environment
    }

    fn description(&self) -> &'static str {
        "actions/setup-python installs Python 3.10"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let toolchain = &ctx.config().workflow.toolchain;
        let steps = action_steps(ctx.workflow()?, &toolchain.setup_action)?;

        any_step(&steps, |step| match step.with("python-version") {
            None => Err("python-version is not set".to_string()),
            Some(Value::Number(n)) => Err(format!(
                "python-version `{n}` is a number, quote it as \"{}\"",
                toolchain.python_version
            )),
            Some(value) => match scalar_string(value) {
                Some(version) if version == toolchain.python_version => Ok(()),
                other => Err(format!(
                    "python-version is `{}`, expected `{}`",
                    other.unwrap_or_default(),
                    toolchain.python_version
                )),
            },
        })
    }
}

/// Source checkout fetches the full history so version tags are visible
pub struct FullHistoryCheckoutRule;

impl Rule for FullHistoryCheckoutRule {
    fn id(&self) -> &'static str {
        "full_history_checkout"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Environment
    }

    fn description(&self) -> &'static str {
        "actions/checkout fetches full history (fetch-depth: 0)"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let action = &ctx.config().workflow.toolchain.checkout_action;
        let steps = action_steps(ctx.workflow()?, action)?;

        any_step(&steps, |step| {
            match step.with("fetch-depth").and_then(scalar_string).as_deref() {
                Some("0") => Ok(()),
                Some(depth) => Err(format!("fetch-depth is `{depth}`, expected `0`")),
                None => Err("fetch-depth is not set, checkout is shallow".to_string()),
            }
        })
    }
}

/// A package installation step installs every required system library
pub struct SystemPackagesRule;

impl Rule for SystemPackagesRule {
    fn id(&self) -> &'static str {
        "system_packages"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Dependencies
    }

    fn description(&self) -> &'static str {
        "An apt-get install step installs the required system libraries"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let expected = &ctx.config().workflow.system_packages;

        let install_steps: Vec<_> = all_steps(ctx.workflow()?)?
            .into_iter()
            .filter(|step| step.run().is_some_and(|run| run.contains(&expected.install_command)))
            .collect();

        if install_steps.is_empty() {
            return Err(RuleFailure::assertion(format!(
                "no step runs `{}`",
                expected.install_command
            )));
        }

        any_step(&install_steps, |step| {
            let words: Vec<&str> = step
                .run()
                .unwrap_or_default()
                .split_whitespace()
                .map(|word| word.trim_matches(|c| c == '\\' || c == '"' || c == '\''))
                .collect();

            let missing: Vec<&str> = expected
                .packages
                .iter()
                .map(String::as_str)
                .filter(|package| !words.contains(package))
                .collect();

            if missing.is_empty() {
                Ok(())
            } else {
                Err(format!("does not install {}", missing.join(", ")))
            }
        })
    }
}

/// The build output is uploaded as an artifact with a retention period
pub struct ArtifactUploadRule;

impl ArtifactUploadRule {
    fn check_step(step: &StepRef<'_>, expected: &StepExpectations) -> Result<(), String> {
        let missing = missing_fields(step, &expected.required_fields);
        if !missing.is_empty() {
            return Err(format!("missing {}", missing.join(", ")));
        }

        match step.with("retention-days") {
            Some(days) if days.as_u64().is_some_and(|d| d > 0) => Ok(()),
            Some(days) => Err(format!(
                "retention-days `{}` is not a positive integer",
                scalar_string(days).unwrap_or_default()
            )),
            // Not required by this configuration
            None => Ok(()),
        }
    }
}

impl Rule for ArtifactUploadRule {
    fn id(&self) -> &'static str {
        "artifact_upload"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Artifacts
    }

    fn description(&self) -> &'static str {
        "actions/upload-artifact sets name, path and retention-days"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let expected = &ctx.config().workflow.artifact;
        let steps = action_steps(ctx.workflow()?, &expected.action)?;
        any_step(&steps, |step| Self::check_step(step, expected))
    }
}

/// The release step carries tag, title, notes and files
pub struct ReleasePublishRule;

impl Rule for ReleasePublishRule {
    fn id(&self) -> &'static str {
        "release_publish"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Release
    }

    fn description(&self) -> &'static str {
        "softprops/action-gh-release sets tag_name, name, body and files"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let expected = &ctx.config().workflow.release;
        let steps = action_steps(ctx.workflow()?, &expected.action)?;

        any_step(&steps, |step| {
            let mut missing = missing_fields(step, &expected.required_fields);
            if !expected.body_fields.iter().any(|field| is_filled(step.with(field))) {
                missing.push(expected.body_fields.join(" or "));
            }

            if missing.is_empty() {
                Ok(())
            } else {
                Err(format!("missing {}", missing.join(", ")))
            }
        })
    }
}
