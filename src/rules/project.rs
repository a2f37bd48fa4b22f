//! Project files that the release process relies on
//!
//! Paths are glob patterns relative to the project root.

use super::{collect_problems, Rule, RuleContext};
use crate::config::ProjectFile;
use crate::domain::{RuleCategory, RuleFailure, RuleResult};
use std::path::{Path, PathBuf};

/// Files under `root` matching the pattern of `file`
fn matching_files(root: &Path, file: &ProjectFile) -> RuleResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        file.path
    );

    let paths = glob::glob(&pattern)
        .map_err(|e| RuleFailure::shape(format!("invalid pattern `{}`: {e}", file.path)))?;

    Ok(paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Skipping unreadable path: {e}");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Every configured project path matches at least one file
pub struct ProjectFilesPresentRule;

impl Rule for ProjectFilesPresentRule {
    fn id(&self) -> &'static str {
        "project_files_present"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Project
    }

    fn description(&self) -> &'static str {
        "Required project files exist"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let mut problems = Vec::new();

        for file in &ctx.config().project.files {
            if matching_files(ctx.root(), file)?.is_empty() {
                problems.push(format!("no file matches `{}`", file.path));
            }
        }

        collect_problems(problems)
    }
}

/// Files flagged executable carry an execute bit
pub struct ProjectFilesExecutableRule;

impl Rule for ProjectFilesExecutableRule {
    fn id(&self) -> &'static str {
        "project_files_executable"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Project
    }

    fn description(&self) -> &'static str {
        "Project scripts are executable"
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let root = ctx.root();
        let mut problems = Vec::new();

        for file in ctx.config().project.files.iter().filter(|f| f.executable) {
            // Absent files are reported by project_files_present
            for path in matching_files(root, file)? {
                if !is_executable(&path) {
                    let shown = path.strip_prefix(root).unwrap_or(&path);
                    problems.push(format!("{} is not executable", shown.display()));
                }
            }
        }

        collect_problems(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, bool)]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for (name, executable) in files {
            let path = temp_dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "#!/bin/sh\n").unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = if *executable { 0o755 } else { 0o644 };
                fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            }
            #[cfg(not(unix))]
            let _ = executable;
        }
        temp_dir
    }

    fn context(root: &Path) -> RuleContext {
        RuleContext::load(&GuardConfig::default().with_root(root))
    }

    #[test]
    fn test_complete_project_passes() {
        let dir = project(&[
            ("AppImageBuilder.yml", false),
            ("requirements.txt", false),
            ("scripts/build-appimage.sh", true),
            ("scripts/test-appimage.sh", true),
        ]);
        let ctx = context(dir.path());
        assert_eq!(ProjectFilesPresentRule.evaluate(&ctx), Ok(()));
        assert_eq!(ProjectFilesExecutableRule.evaluate(&ctx), Ok(()));
    }

    #[test]
    fn test_missing_files_are_listed() {
        let dir = project(&[("AppImageBuilder.yml", false)]);
        let err = ProjectFilesPresentRule.evaluate(&context(dir.path())).unwrap_err();
        assert_eq!(
            err,
            RuleFailure::assertion(
                "no file matches `requirements.txt`; no file matches `scripts/*.sh`"
            )
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_script() {
        let dir = project(&[
            ("scripts/build-appimage.sh", true),
            ("scripts/test-appimage.sh", false),
        ]);
        let err = ProjectFilesExecutableRule.evaluate(&context(dir.path())).unwrap_err();
        assert_eq!(
            err,
            RuleFailure::assertion("scripts/test-appimage.sh is not executable")
        );
    }

    #[test]
    fn test_absent_scripts_are_not_double_reported() {
        let dir = project(&[]);
        assert_eq!(ProjectFilesExecutableRule.evaluate(&context(dir.path())), Ok(()));
    }
}
