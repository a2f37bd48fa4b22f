//! Validation rules for the workflow, builder and project files
//!
//! Architectural Principle: Service Layer - Each rule is one pure assertion
//! - Rules implement the Rule trait and are registered once in a RuleRegistry
//! - A RuleContext holds the documents loaded for a run; rules only read it
//! - Rules report problems through RuleFailure so `?` carries load errors through

pub mod builder;
pub mod concurrency;
pub mod jobs;
pub mod permissions;
pub mod project;
pub mod references;
pub mod registry;
pub mod steps;
pub mod structure;
pub mod triggers;

use crate::config::GuardConfig;
use crate::document::{ConfigDocument, DocumentLoader, LoadError};
use crate::domain::{RuleCategory, RuleFailure, RuleResult};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

pub use builder::{BuilderAppIdentityRule, BuilderDocumentRule, BuilderSectionsRule};
pub use concurrency::ConcurrencyControlRule;
pub use jobs::{JobDependenciesRule, JobRunnersRule, JobTimeoutsRule, RequiredJobsRule};
pub use permissions::{PermissionsAllowlistRule, PermissionsDeclaredRule, PermissionsDenylistRule};
pub use project::{ProjectFilesExecutableRule, ProjectFilesPresentRule};
pub use references::ActionReferencesRule;
pub use registry::RuleRegistry;
pub use steps::{
    ArtifactUploadRule, FullHistoryCheckoutRule, PythonToolchainRule, ReleasePublishRule,
    SystemPackagesRule,
};
pub use structure::RequiredKeysRule;
pub use triggers::{DispatchInputsRule, PushFiltersRule, TriggerEventsRule};

/// A single named assertion about the release configuration
pub trait Rule: Send + Sync {
    /// Stable snake_case identifier
    fn id(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    /// One-line statement of what must hold
    fn description(&self) -> &'static str;

    /// Check the loaded documents; `Ok(())` means the assertion holds
    fn evaluate(&self, ctx: &RuleContext) -> RuleResult;
}

/// Read-only inputs shared by every rule in a run
#[derive(Debug)]
pub struct RuleContext {
    config: GuardConfig,
    workflow: Result<ConfigDocument, LoadError>,
    builder: Result<ConfigDocument, LoadError>,
}

impl RuleContext {
    /// Load the workflow and builder files named by the configuration
    pub fn load(config: &GuardConfig) -> Self {
        Self {
            workflow: DocumentLoader::load(config.workflow_path()),
            builder: DocumentLoader::load(config.builder_path()),
            config: config.clone(),
        }
    }

    /// Build a context from in-memory sources; `None` behaves like a missing file
    pub fn from_sources(config: &GuardConfig, workflow: Option<&str>, builder: Option<&str>) -> Self {
        let parse = |path: PathBuf, source: Option<&str>| match source {
            Some(text) => ConfigDocument::parse(path, text.to_string()),
            None => Err(LoadError::Missing { path }),
        };

        Self {
            workflow: parse(config.workflow_path(), workflow),
            builder: parse(config.builder_path(), builder),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.paths.root
    }

    /// The parsed workflow, or the failure that prevented loading it
    pub fn workflow(&self) -> RuleResult<&ConfigDocument> {
        self.workflow.as_ref().map_err(RuleFailure::from)
    }

    pub fn builder(&self) -> RuleResult<&ConfigDocument> {
        self.builder.as_ref().map_err(RuleFailure::from)
    }

    /// Raw workflow text, available even when the YAML does not parse
    pub fn workflow_text(&self) -> RuleResult<&str> {
        match &self.workflow {
            Ok(doc) => Ok(doc.source()),
            Err(err) => err.source_text().ok_or_else(|| RuleFailure::from(err)),
        }
    }

    /// Digests of the documents that loaded, for report metadata
    pub fn document_digests(&self) -> Vec<(PathBuf, String)> {
        [&self.workflow, &self.builder]
            .into_iter()
            .filter_map(|doc| doc.as_ref().ok())
            .map(|doc| (doc.path().to_path_buf(), doc.digest().to_string()))
            .collect()
    }
}

/// Mapping at `path`; absence or another type means the rule cannot proceed
pub(crate) fn require_mapping<'d>(doc: &'d ConfigDocument, path: &[&str]) -> RuleResult<&'d Mapping> {
    match doc.get(path) {
        Some(Value::Mapping(mapping)) => Ok(mapping),
        Some(_) => Err(RuleFailure::shape(format!("`{}` is not a mapping", dotted(path)))),
        None => Err(RuleFailure::shape(format!("`{}` is missing", dotted(path)))),
    }
}

/// The `jobs` mapping of a workflow
pub(crate) fn jobs(doc: &ConfigDocument) -> RuleResult<&Mapping> {
    require_mapping(doc, &["jobs"])
}

/// Body of one job, which must itself be a mapping
pub(crate) fn job_body<'d>(name: &str, value: &'d Value) -> RuleResult<&'d Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| RuleFailure::shape(format!("job `{name}` is not a mapping")))
}

pub(crate) fn dotted(path: &[&str]) -> String {
    path.join(".")
}

/// Join collected problems into a single failure
pub(crate) fn collect_problems(problems: Vec<String>) -> RuleResult {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(RuleFailure::Assertion(problems.join("; ")))
    }
}

/// Whether a value is present and not an empty scalar
pub(crate) fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Sequence(items)) => !items.is_empty(),
        Some(Value::Mapping(map)) => !map.is_empty(),
        Some(_) => true,
    }
}
