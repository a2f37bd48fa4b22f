//! Token permission rules
//!
//! Permissions may be granted as a scope map or as a single scalar such as
//! `write-all`. Scalar grants are never acceptable.

use super::{collect_problems, Rule, RuleContext};
use crate::document::{key_string, scalar_string};
use crate::domain::{RuleCategory, RuleFailure, RuleResult};
use serde_yaml::{Mapping, Value};

/// Top-level permissions as a scope map
fn scope_map<'d>(permissions: Option<&'d Value>) -> RuleResult<&'d Mapping> {
    match permissions {
        Some(Value::Mapping(scopes)) => Ok(scopes),
        Some(other) => Err(RuleFailure::assertion(format!(
            "permissions is `{}`, expected a map of scopes",
            scalar_string(other).unwrap_or_else(|| "a sequence".to_string())
        ))),
        None => Err(RuleFailure::assertion("workflow does not declare permissions")),
    }
}

/// Deny-listed grants found in one permissions value
fn denied_grants(permissions: &Value, deny: &[String]) -> Vec<String> {
    match permissions {
        Value::Mapping(scopes) => scopes
            .keys()
            .map(key_string)
            .filter(|scope| deny.contains(scope))
            .collect(),
        other => scalar_string(other)
            .filter(|grant| deny.contains(grant))
            .into_iter()
            .collect(),
    }
}

/// A top-level permissions map is declared
pub struct PermissionsDeclaredRule;

impl Rule for PermissionsDeclaredRule {
    fn id(&self) -> &'static str {
        "permissions_declared"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Permissions
    }

    fn description(&self) -> &'static str {
        "Workflow declares an explicit permissions map"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.workflow()?;
        scope_map(doc.get(&["permissions"])).map(|_| ())
    }
}

/// Granted scopes are exactly the allow-list
pub struct PermissionsAllowlistRule;

impl Rule for PermissionsAllowlistRule {
    fn id(&self) -> &'static str {
        "permissions_allowlist"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Permissions
    }

    fn description(&self) -> &'static str {
        "Permissions grant exactly contents: write and actions: read"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.workflow()?;
        let scopes = scope_map(doc.get(&["permissions"]))?;
        let allow = &ctx.config().workflow.permissions.allow;

        let mut problems = Vec::new();

        for (scope, level) in allow {
            match scopes.get(scope.as_str()).and_then(scalar_string) {
                Some(granted) if granted == *level => {}
                Some(granted) => {
                    problems.push(format!("scope `{scope}` is `{granted}`, expected `{level}`"))
                }
                None => problems.push(format!("scope `{scope}: {level}` is not granted")),
            }
        }

        for scope in scopes.keys().map(key_string) {
            if !allow.contains_key(&scope) {
                problems.push(format!("scope `{scope}` is not in the allow-list"));
            }
        }

        collect_problems(problems)
    }
}

/// No deny-listed scope is granted anywhere in the workflow
pub struct PermissionsDenylistRule;

impl Rule for PermissionsDenylistRule {
    fn id(&self) -> &'static str {
        "permissions_denylist"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Permissions
    }

    fn description(&self) -> &'static str {
        "No admin, write-all or repo permission is granted"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.workflow()?;
        let deny = &ctx.config().workflow.permissions.deny;

        let mut problems: Vec<String> = doc
            .get(&["permissions"])
            .map(|p| denied_grants(p, deny))
            .unwrap_or_default()
            .into_iter()
            .map(|grant| format!("permissions grant denied scope `{grant}`"))
            .collect();

        // Job-level grants are checked too; a malformed `jobs` belongs to the job rules
        if let Some(Value::Mapping(jobs)) = doc.get(&["jobs"]) {
            for (name, job) in jobs {
                let Some(permissions) = job.get("permissions") else {
                    continue;
                };
                for grant in denied_grants(permissions, deny) {
                    problems.push(format!(
                        "job `{}` grants denied scope `{grant}`",
                        key_string(name)
                    ));
                }
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

    const GRANTS: &str = "permissions:\n  contents: write\n  actions: read\n";

    #[test]
    fn test_valid_workflow_passes() {
        let ctx = fixtures::valid_context();
        assert_eq!(PermissionsDeclaredRule.evaluate(&ctx), Ok(()));
        assert_eq!(PermissionsAllowlistRule.evaluate(&ctx), Ok(()));
        assert_eq!(PermissionsDenylistRule.evaluate(&ctx), Ok(()));
    }

    #[test]
    fn test_admin_grant_is_named() {
        let ctx = fixtures::context(&fixtures::patched(GRANTS, &format!("{GRANTS}  admin: write\n")));
        let err = PermissionsDenylistRule.evaluate(&ctx).unwrap_err();
        assert_eq!(err, RuleFailure::assertion("permissions grant denied scope `admin`"));

        // The allow-list rule also flags the extra scope
        let err = PermissionsAllowlistRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("`admin` is not in the allow-list"));
    }

    #[rstest]
    #[case("permissions: write-all\n")]
    #[case("permissions:\n  contents: write\n  actions: read\n  write-all: write\n")]
    #[case("permissions:\n  contents: read\n  write-all: true\n")]
    fn test_write_all_always_fails(#[case] permissions: &str) {
        let ctx = fixtures::context(&fixtures::patched(GRANTS, permissions));
        let err = PermissionsDenylistRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("`write-all`"), "{err}");
    }

    #[test]
    fn test_job_level_denied_scope() {
        let ctx = fixtures::context(&fixtures::patched(
            "    timeout-minutes: 15\n",
            "    timeout-minutes: 15\n    permissions:\n      repo: write\n",
        ));
        let err = PermissionsDenylistRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("job `create-release` grants denied scope `repo`"));
    }

    #[test]
    fn test_denied_scope_reported_when_jobs_is_malformed() {
        let ctx = fixtures::context(
            "permissions:\n  contents: write\n  admin: write\njobs: [build]\n",
        );
        let err = PermissionsDenylistRule.evaluate(&ctx).unwrap_err();
        assert_eq!(err, RuleFailure::assertion("permissions grant denied scope `admin`"));
    }

    #[test]
    fn test_wrong_level_fails_allowlist() {
        let ctx = fixtures::context(&fixtures::patched("  contents: write\n", "  contents: read\n"));
        let err = PermissionsAllowlistRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("`contents` is `read`, expected `write`"));
    }

    #[test]
    fn test_missing_scope_fails_allowlist() {
        let ctx = fixtures::context(&fixtures::patched("  actions: read\n", ""));
        let err = PermissionsAllowlistRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("`actions: read` is not granted"));
    }

    #[test]
    fn test_scalar_permissions_not_declared_as_map() {
        let ctx = fixtures::context(&fixtures::patched(GRANTS, "permissions: read-all\n"));
        let err = PermissionsDeclaredRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("read-all"));
    }

    #[test]
    fn test_absent_permissions() {
        let ctx = fixtures::context(&fixtures::patched(GRANTS, ""));
        assert!(PermissionsDeclaredRule.evaluate(&ctx).is_err());
        assert_eq!(PermissionsDenylistRule.evaluate(&ctx), Ok(()));
    }
}
