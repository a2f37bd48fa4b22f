//! Configuration loading and management for Workflow Guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Every expectation a rule asserts lives here as data, not in the rule
//! - Default expectations describe the FlatCAM AppImage release workflow
//! - Configuration acts as a repository for rule parameters and input paths

use crate::domain::{GuardError, GuardResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File names probed in the project root when no configuration is given
pub const DEFAULT_CONFIG_FILES: &[&str] =
    &["workflow_guardian.yaml", "workflow_guardian.yml", ".workflow_guardian.yaml"];

/// Main configuration structure for Workflow Guardian
///
/// Omitted top-level sections take their default; a section that is given
/// must be complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Configuration format version
    pub version: String,
    pub paths: PathConfig,
    pub workflow: WorkflowExpectations,
    pub builder: BuilderExpectations,
    pub project: ProjectExpectations,
    /// Rule ids that are skipped entirely
    pub disabled_rules: Vec<String>,
}

/// Input locations, relative to the project root unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub root: PathBuf,
    pub workflow: PathBuf,
    pub builder: PathBuf,
}

/// What the workflow definition must declare
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExpectations {
    pub required_keys: Vec<String>,
    pub triggers: TriggerExpectations,
    pub permissions: PermissionExpectations,
    pub jobs: JobExpectations,
    pub toolchain: ToolchainExpectations,
    pub system_packages: PackageExpectations,
    pub artifact: StepExpectations,
    pub release: ReleaseExpectations,
    /// Actions that must appear in a `uses:` line of the raw source
    pub referenced_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerExpectations {
    pub events: Vec<String>,
    pub default_branch: String,
    /// Version prefix a tag filter must start with
    pub tag_prefix: String,
    pub dispatch_inputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionExpectations {
    /// Exact scope → access level grants
    pub allow: BTreeMap<String, String>,
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExpectations {
    pub required: Vec<String>,
    pub runner: String,
    pub dependencies: Vec<JobDependency>,
}

/// A job that may only run after its prerequisite succeeded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDependency {
    pub job: String,
    pub needs: String,
    /// Whether the `if` must also carry `always()`
    #[serde(default = "default_true")]
    pub always: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainExpectations {
    pub setup_action: String,
    pub python_version: String,
    pub checkout_action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageExpectations {
    /// Text that marks a `run` step as the package installation step
    pub install_command: String,
    pub packages: Vec<String>,
}

/// An action step that must carry certain `with` fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExpectations {
    pub action: String,
    pub required_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseExpectations {
    pub action: String,
    pub required_fields: Vec<String>,
    /// Any one of these satisfies the body requirement
    pub body_fields: Vec<String>,
}

/// What the AppImage-builder configuration must declare
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderExpectations {
    pub required_sections: Vec<String>,
    /// Key path of the identity mapping inside the builder file
    pub identity_path: Vec<String>,
    pub identity_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectExpectations {
    pub files: Vec<ProjectFile>,
}

/// A project path (glob allowed) that must exist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectFile {
    pub path: String,
    #[serde(default)]
    pub executable: bool,
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            GuardError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Discover a configuration file in `root`, falling back to defaults
    pub fn discover<P: AsRef<Path>>(root: P) -> GuardResult<Self> {
        for name in DEFAULT_CONFIG_FILES {
            let candidate = root.as_ref().join(name);
            if candidate.is_file() {
                tracing::debug!("Using configuration {}", candidate.display());
                return Self::load_from_file(candidate);
            }
        }
        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Default expectations for the AppImage build and release workflow
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            paths: PathConfig {
                root: PathBuf::from("."),
                workflow: PathBuf::from(".github/workflows/build-appimage.yml"),
                builder: PathBuf::from("AppImageBuilder.yml"),
            },
            workflow: WorkflowExpectations {
                required_keys: strings(&["name", "on", "jobs", "permissions"]),
                triggers: TriggerExpectations {
                    events: strings(&["push", "workflow_dispatch"]),
                    default_branch: "main".to_string(),
                    tag_prefix: "v".to_string(),
                    dispatch_inputs: strings(&["create_release"]),
                },
                permissions: PermissionExpectations {
                    allow: BTreeMap::from([
                        ("contents".to_string(), "write".to_string()),
                        ("actions".to_string(), "read".to_string()),
                    ]),
                    deny: strings(&["admin", "write-all", "repo"]),
                },
                jobs: JobExpectations {
                    required: strings(&["build-appimage", "test-appimage", "create-release"]),
                    runner: "ubuntu-22.04".to_string(),
                    dependencies: vec![JobDependency {
                        job: "create-release".to_string(),
                        needs: "build-appimage".to_string(),
                        always: true,
                    }],
                },
                toolchain: ToolchainExpectations {
                    setup_action: "actions/setup-python".to_string(),
                    python_version: "3.10".to_string(),
                    checkout_action: "actions/checkout".to_string(),
                },
                system_packages: PackageExpectations {
                    install_command: "apt-get install".to_string(),
                    packages: strings(&[
                        "libgeos-dev",
                        "libspatialindex-dev",
                        "libgl1-mesa-dev",
                        "libxkbcommon-x11-0",
                        "libxcb-xinerama0",
                        "libfuse2",
                    ]),
                },
                artifact: StepExpectations {
                    action: "actions/upload-artifact".to_string(),
                    required_fields: strings(&["name", "path", "retention-days"]),
                },
                release: ReleaseExpectations {
                    action: "softprops/action-gh-release".to_string(),
                    required_fields: strings(&["tag_name", "name", "files"]),
                    body_fields: strings(&["body_path", "body"]),
                },
                referenced_actions: strings(&[
                    "actions/checkout",
                    "actions/setup-python",
                    "actions/upload-artifact",
                    "softprops/action-gh-release",
                ]),
            },
            builder: BuilderExpectations {
                required_sections: strings(&["AppDir", "AppImage"]),
                identity_path: strings(&["AppDir", "app_info"]),
                identity_fields: strings(&["id", "name"]),
            },
            project: ProjectExpectations {
                files: vec![
                    ProjectFile { path: "AppImageBuilder.yml".to_string(), executable: false },
                    ProjectFile { path: "requirements.txt".to_string(), executable: false },
                    ProjectFile { path: "scripts/*.sh".to_string(), executable: true },
                ],
            },
            disabled_rules: Vec::new(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(GuardError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        let triggers = &self.workflow.triggers;
        if triggers.tag_prefix.is_empty() {
            return Err(GuardError::config("triggers.tag_prefix must not be empty"));
        }
        if triggers.default_branch.is_empty() {
            return Err(GuardError::config("triggers.default_branch must not be empty"));
        }

        let permissions = &self.workflow.permissions;
        if let Some(scope) = permissions.allow.keys().find(|s| permissions.deny.contains(s)) {
            return Err(GuardError::config(format!(
                "Permission scope '{scope}' is both allowed and denied"
            )));
        }

        for dependency in &self.workflow.jobs.dependencies {
            if dependency.job == dependency.needs {
                return Err(GuardError::config(format!(
                    "Job '{}' cannot depend on itself",
                    dependency.job
                )));
            }
        }

        if self.workflow.release.body_fields.is_empty() {
            return Err(GuardError::config("release.body_fields must name at least one field"));
        }

        for file in &self.project.files {
            glob::Pattern::new(&file.path).map_err(|e| {
                GuardError::config(format!("Invalid project file pattern '{}': {}", file.path, e))
            })?;
        }

        Ok(())
    }

    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        !self.disabled_rules.iter().any(|id| id == rule_id)
    }

    pub fn workflow_path(&self) -> PathBuf {
        self.paths.root.join(&self.paths.workflow)
    }

    pub fn builder_path(&self) -> PathBuf {
        self.paths.root.join(&self.paths.builder)
    }

    /// Point every relative input at a different project root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.paths.root = root.into();
        self
    }

    /// Stable fingerprint of the expectations, recorded in reports
    pub fn fingerprint(&self) -> String {
        // Field order is fixed by the struct definitions and maps are BTreeMaps
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{digest:x}")[..16].to_string()
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_true() -> bool {
    true
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
