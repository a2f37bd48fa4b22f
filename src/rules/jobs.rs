//! Job rules: required jobs, timeouts, runners and release gating

use super::{collect_problems, job_body, jobs, Rule, RuleContext};
use crate::document::{key_string, scalar_string, string_list};
use crate::domain::{RuleCategory, RuleFailure, RuleResult};
use regex::Regex;

/// The fixed set of named jobs exists
pub struct RequiredJobsRule;

impl Rule for RequiredJobsRule {
    fn id(&self) -> &'static str {
        "required_jobs"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Jobs
    }

    fn description(&self) -> &'static str {
        "Workflow defines build-appimage, test-appimage and create-release"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let jobs = jobs(ctx.workflow()?)?;

        let problems = ctx
            .config()
            .workflow
            .jobs
            .required
            .iter()
            .filter(|name| !jobs.contains_key(name.as_str()))
            .map(|name| format!("job `{name}` is not defined"))
            .collect();

        collect_problems(problems)
    }
}

/// Every job has a positive integer timeout
pub struct JobTimeoutsRule;

impl Rule for JobTimeoutsRule {
    fn id(&self) -> &'static str {
        "job_timeouts"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Jobs
    }

    fn description(&self) -> &'static str {
        "Every job sets a positive timeout-minutes"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let mut problems = Vec::new();

        for (name, body) in jobs(ctx.workflow()?)? {
            let name = key_string(name);
            let body = job_body(&name, body)?;

            match body.get("timeout-minutes") {
                None => problems.push(format!("job `{name}` has no timeout-minutes")),
                Some(value) => match value.as_u64() {
                    Some(minutes) if minutes > 0 => {}
                    _ => problems.push(format!(
                        "job `{name}` timeout-minutes `{}` is not a positive integer",
                        scalar_string(value).unwrap_or_default()
                    )),
                },
            }
        }

        collect_problems(problems)
    }
}

/// Every job runs on the expected runner image
pub struct JobRunnersRule;

impl Rule for JobRunnersRule {
    fn id(&self) -> &'static str {
        "job_runners"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Jobs
    }

    fn description(&self) -> &'static str {
        "Every job runs on ubuntu-22.04"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let runner = &ctx.config().workflow.jobs.runner;
        let mut problems = Vec::new();

        for (name, body) in jobs(ctx.workflow()?)? {
            let name = key_string(name);
            let body = job_body(&name, body)?;

            let labels = body.get("runs-on").map(string_list).unwrap_or_default();
            if labels.is_empty() {
                problems.push(format!("job `{name}` has no runs-on"));
            } else if !labels.contains(runner) {
                problems.push(format!(
                    "job `{name}` runs on `{}`, expected `{runner}`",
                    labels.join(", ")
                ));
            }
        }

        collect_problems(problems)
    }
}

/// Dependent jobs wait for their prerequisite and only proceed on success
pub struct JobDependenciesRule;

impl JobDependenciesRule {
    fn success_check(prerequisite: &str) -> RuleResult<Regex> {
        Regex::new(&format!(
            r#"needs\.{}\.result\s*==\s*['"]success['"]"#,
            regex::escape(prerequisite)
        ))
        .map_err(|e| RuleFailure::shape(format!("invalid result check pattern: {e}")))
    }
}

impl Rule for JobDependenciesRule {
    fn id(&self) -> &'static str {
        "job_dependencies"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Jobs
    }

    fn description(&self) -> &'static str {
        "create-release needs build-appimage and runs only when it succeeded"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let jobs = jobs(ctx.workflow()?)?;
        let mut problems = Vec::new();

        for dependency in &ctx.config().workflow.jobs.dependencies {
            let job = &dependency.job;
            let Some(body) = jobs.get(job.as_str()) else {
                problems.push(format!("job `{job}` is not defined"));
                continue;
            };
            let body = job_body(job, body)?;

            let needs = body.get("needs").map(string_list).unwrap_or_default();
            if !needs.contains(&dependency.needs) {
                problems.push(format!("job `{job}` does not need `{}`", dependency.needs));
            }

            let condition = body.get("if").and_then(scalar_string).unwrap_or_default();
            if condition.is_empty() {
                problems.push(format!("job `{job}` has no if condition"));
                continue;
            }
            if dependency.always && !condition.contains("always()") {
                problems.push(format!("job `{job}` condition does not use always()"));
            }
            if !Self::success_check(&dependency.needs)?.is_match(&condition) {
                problems.push(format!(
                    "job `{job}` condition does not check needs.{}.result == 'success'",
                    dependency.needs
                ));
            }
        }

        collect_problems(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use rstest::rstest;

    #[test]
    fn test_valid_workflow_passes_all_job_rules() {
        let ctx = fixtures::valid_context();
        assert_eq!(RequiredJobsRule.evaluate(&ctx), Ok(()));
        assert_eq!(JobTimeoutsRule.evaluate(&ctx), Ok(()));
        assert_eq!(JobRunnersRule.evaluate(&ctx), Ok(()));
        assert_eq!(JobDependenciesRule.evaluate(&ctx), Ok(()));
    }

    #[test]
    fn test_missing_job_is_named() {
        let ctx = fixtures::context(&fixtures::patched("  test-appimage:\n", "  smoke-test:\n"));
        let err = RequiredJobsRule.evaluate(&ctx).unwrap_err();
        assert_eq!(err, RuleFailure::assertion("job `test-appimage` is not defined"));
    }

    #[test]
    fn test_missing_timeout_fails() {
        let ctx = fixtures::context(&fixtures::patched("    timeout-minutes: 20\n", ""));
        let err = JobTimeoutsRule.evaluate(&ctx).unwrap_err();
        assert_eq!(err, RuleFailure::assertion("job `test-appimage` has no timeout-minutes"));
    }

    #[rstest]
    #[case("1", true)]
    #[case("360", true)]
    #[case("0", false)]
    #[case("-5", false)]
    #[case("\"30\"", false)]
    #[case("${{ inputs.timeout }}", false)]
    fn test_timeout_values(#[case] value: &str, #[case] passes: bool) {
        let ctx = fixtures::context(&fixtures::patched(
            "    timeout-minutes: 20\n",
            &format!("    timeout-minutes: {value}\n"),
        ));
        assert_eq!(JobTimeoutsRule.evaluate(&ctx).is_ok(), passes, "{value}");
    }

    #[test]
    fn test_wrong_runner() {
        let ctx = fixtures::context(&fixtures::patched(
            "    runs-on: ubuntu-22.04\n    timeout-minutes: 20\n",
            "    runs-on: ubuntu-latest\n    timeout-minutes: 20\n",
        ));
        let err = JobRunnersRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("`test-appimage` runs on `ubuntu-latest`"));
    }

    #[test]
    fn test_release_without_always_fails() {
        let ctx = fixtures::context(&fixtures::patched(
            "if: always() && needs.build-appimage.result == 'success'",
            "if: needs.build-appimage.result == 'success'",
        ));
        let err = JobDependenciesRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("always()"));
    }

    #[test]
    fn test_release_without_result_check_fails() {
        let ctx = fixtures::context(&fixtures::patched(
            "if: always() && needs.build-appimage.result == 'success'",
            "if: always()",
        ));
        let err = JobDependenciesRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("needs.build-appimage.result"));
    }

    #[test]
    fn test_double_quoted_success_accepted() {
        let ctx = fixtures::context(&fixtures::patched(
            "if: always() && needs.build-appimage.result == 'success'",
            "if: ${{ always() && needs.build-appimage.result==\"success\" }}",
        ));
        assert_eq!(JobDependenciesRule.evaluate(&ctx), Ok(()));
    }

    #[test]
    fn test_needs_list_form() {
        let ctx = fixtures::context(&fixtures::MINIMAL_WORKFLOW.replace(
            "    needs: build-appimage\n",
            "    needs: [build-appimage, test-appimage]\n",
        ));
        assert_eq!(JobDependenciesRule.evaluate(&ctx), Ok(()));
    }

    #[test]
    fn test_jobs_not_a_mapping_is_internal_error() {
        let ctx = fixtures::context("jobs: [build]\n");
        assert!(matches!(JobTimeoutsRule.evaluate(&ctx), Err(RuleFailure::Shape(_))));
    }
}
