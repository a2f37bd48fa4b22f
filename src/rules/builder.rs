//! Rules for the AppImage-builder configuration file

use super::{collect_problems, is_filled, Rule, RuleContext};
use crate::document::lookup;
use crate::domain::{RuleCategory, RuleFailure, RuleResult};
use serde_yaml::Value;

/// The builder file exists and parses
pub struct BuilderDocumentRule;

impl Rule for BuilderDocumentRule {
    fn id(&self) -> &'static str {
        "builder_document"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Builder
    }

    fn description(&self) -> &'static str {
        "AppImageBuilder.yml exists and is valid YAML"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        ctx.builder().map(|_| ())
    }
}

/// Both top-level builder sections are present
pub struct BuilderSectionsRule;

impl Rule for BuilderSectionsRule {
    fn id(&self) -> &'static str {
        "builder_sections"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Builder
    }

    fn description(&self) -> &'static str {
        "Builder configuration has AppDir and AppImage sections"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.builder()?;

        let problems = ctx
            .config()
            .builder
            .required_sections
            .iter()
            .filter(|section| !doc.contains_key(section))
            .map(|section| format!("missing section `{section}`"))
            .collect();

        collect_problems(problems)
    }
}

/// The application identity fields are filled in
pub struct BuilderAppIdentityRule;

impl Rule for BuilderAppIdentityRule {
    fn id(&self) -> &'static str {
        "builder_app_identity"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Builder
    }

    fn description(&self) -> &'static str {
        "AppDir.app_info declares id and name"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let doc = ctx.builder()?;
        let expected = &ctx.config().builder;
        let path: Vec<&str> = expected.identity_path.iter().map(String::as_str).collect();
        let location = path.join(".");

        let identity = match lookup(doc.root(), &path) {
            Some(Value::Mapping(identity)) => identity,
            Some(_) => return Err(RuleFailure::shape(format!("`{location}` is not a mapping"))),
            None => return Err(RuleFailure::assertion(format!("`{location}` is missing"))),
        };

        let problems = expected
            .identity_fields
            .iter()
            .filter(|field| !is_filled(identity.get(field.as_str())))
            .map(|field| format!("`{location}.{field}` is missing or empty"))
            .collect();

        collect_problems(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use crate::domain::Outcome;
    use crate::fixtures;

    fn builder_context(builder: Option<&str>) -> RuleContext {
        RuleContext::from_sources(&GuardConfig::default(), Some(fixtures::VALID_WORKFLOW), builder)
    }

    #[test]
    fn test_valid_builder_passes() {
        let ctx = fixtures::valid_context();
        assert_eq!(BuilderDocumentRule.evaluate(&ctx), Ok(()));
        assert_eq!(BuilderSectionsRule.evaluate(&ctx), Ok(()));
        assert_eq!(BuilderAppIdentityRule.evaluate(&ctx), Ok(()));
    }

    #[test]
    fn test_missing_builder_file() {
        let ctx = builder_context(None);
        let outcome: Outcome = BuilderDocumentRule.evaluate(&ctx).into();
        assert!(matches!(
            outcome,
            Outcome::Fail { kind: crate::domain::FailureKind::MissingFile, .. }
        ));
    }

    #[test]
    fn test_invalid_builder_yaml() {
        let ctx = builder_context(Some("AppDir: [\n"));
        assert!(matches!(BuilderDocumentRule.evaluate(&ctx), Err(RuleFailure::Parse { .. })));
        assert!(matches!(BuilderSectionsRule.evaluate(&ctx), Err(RuleFailure::Parse { .. })));
    }

    #[test]
    fn test_missing_section() {
        let ctx = builder_context(Some(&fixtures::VALID_BUILDER.replace(
            "AppImage:\n  arch: x86_64\n  update-information: guess\n",
            "",
        )));
        assert_eq!(
            BuilderSectionsRule.evaluate(&ctx),
            Err(RuleFailure::assertion("missing section `AppImage`"))
        );
    }

    #[test]
    fn test_empty_identity_field() {
        let ctx = builder_context(Some(
            &fixtures::VALID_BUILDER.replace("    name: FlatCAM\n", "    name: \"\"\n"),
        ));
        let err = BuilderAppIdentityRule.evaluate(&ctx).unwrap_err();
        assert!(err.to_string().contains("`AppDir.app_info.name`"));
    }

    #[test]
    fn test_identity_of_wrong_shape() {
        let ctx = builder_context(Some("AppDir:\n  app_info: flatcam\nAppImage: {}\n"));
        assert!(matches!(BuilderAppIdentityRule.evaluate(&ctx), Err(RuleFailure::Shape(_))));
    }
}
