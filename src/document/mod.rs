//! YAML document loading for workflow and builder files
//!
//! Architecture: Anti-Corruption Layer - Raw YAML text becomes an immutable tree
//! - A document is either fully parsed or not exposed at all
//! - The raw source survives a parse failure so text-only rules can still run
//! - Path helpers keep rules free of serde_yaml plumbing

use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::RuleFailure;

/// Why a document could not be loaded
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("{} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// Content was read but is not a well-formed YAML mapping
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        message: String,
        source_text: String,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path } | Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }

    /// Raw text of the file when it was readable
    pub fn source_text(&self) -> Option<&str> {
        match self {
            Self::Parse { source_text, .. } => Some(source_text),
            _ => None,
        }
    }
}

impl From<&LoadError> for RuleFailure {
    fn from(err: &LoadError) -> Self {
        match err {
            LoadError::Missing { path } => RuleFailure::MissingFile(path.clone()),
            LoadError::Read { path, message } => RuleFailure::Parse {
                path: path.clone(),
                message: message.clone(),
            },
            LoadError::Parse { path, message, .. } => RuleFailure::Parse {
                path: path.clone(),
                message: message.clone(),
            },
        }
    }
}

/// An immutable, parsed YAML file
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    source: String,
    root: Value,
    digest: String,
}

impl ConfigDocument {
    /// Parse document text; the root must be a mapping
    pub fn parse(path: impl Into<PathBuf>, source: String) -> Result<Self, LoadError> {
        let path = path.into();
        let root: Value = match serde_yaml::from_str(&source) {
            Ok(value) => value,
            Err(e) => {
                return Err(LoadError::Parse {
                    path,
                    message: e.to_string(),
                    source_text: source,
                })
            }
        };

        if !root.is_mapping() {
            return Err(LoadError::Parse {
                path,
                message: "document root is not a mapping".to_string(),
                source_text: source,
            });
        }

        let digest = format!("{:x}", Sha256::digest(source.as_bytes()));
        Ok(Self { path, source, root, digest })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// SHA-256 of the source text
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Look up a nested value by key path
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        lookup(&self.root, path)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(&[key]).is_some()
    }

    /// Mapping at `path`, if present and a mapping
    pub fn mapping_at(&self, path: &[&str]) -> Option<&Mapping> {
        self.get(path).and_then(Value::as_mapping)
    }
}

/// Reads workflow and builder files from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ConfigDocument, LoadError> {
        let path = path.as_ref();
        tracing::debug!("Loading document {}", path.display());

        let source = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::Missing { path: path.to_path_buf() },
            _ => LoadError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        ConfigDocument::parse(path, source).map_err(|e| {
            tracing::warn!("{e}");
            e
        })
    }
}

/// Walk `path` from `value`, following mapping keys
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.as_mapping()?.get(*key))
}

/// Render a scalar as text; numbers and booleans use their YAML spelling
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A string or a sequence of strings, flattened to a list
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

/// Key of a mapping entry as text
pub fn key_string(key: &Value) -> String {
    scalar_string(key).unwrap_or_else(|| format!("{key:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_and_lookup() {
        let doc = ConfigDocument::parse(
            "wf.yml",
            "name: Build\non:\n  push:\n    tags: [\"v*\"]\n".to_string(),
        )
        .unwrap();

        assert!(doc.contains_key("name"));
        assert!(doc.contains_key("on"));
        let tags = doc.get(&["on", "push", "tags"]).map(string_list).unwrap();
        assert_eq!(tags, vec!["v*".to_string()]);
        assert!(doc.mapping_at(&["on", "push"]).is_some());
        assert!(doc.mapping_at(&["on", "push", "tags"]).is_none());
        assert_eq!(doc.digest().len(), 64);
    }

    #[test]
    fn test_parse_failure_keeps_source() {
        let err = ConfigDocument::parse("bad.yml", "jobs: [unclosed\n".to_string()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert_eq!(err.source_text(), Some("jobs: [unclosed\n"));
    }

    #[test]
    fn test_non_mapping_root_is_parse_error() {
        let err = ConfigDocument::parse("list.yml", "- a\n- b\n".to_string()).unwrap_err();
        assert!(err.to_string().contains("not a mapping"));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = DocumentLoader::load(temp_dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, LoadError::Missing { .. }));
        assert!(matches!(RuleFailure::from(&err), RuleFailure::MissingFile(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AppImageBuilder.yml");
        fs::write(&path, "AppDir:\n  app_info:\n    id: org.flatcam.FlatCAM\n").unwrap();

        let doc = DocumentLoader::load(&path).unwrap();
        assert_eq!(doc.path(), path.as_path());
        assert_eq!(
            doc.get(&["AppDir", "app_info", "id"]).and_then(scalar_string).as_deref(),
            Some("org.flatcam.FlatCAM")
        );
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(scalar_string(&Value::from(0)), Some("0".to_string()));
        assert_eq!(scalar_string(&Value::from(true)), Some("true".to_string()));
        assert_eq!(scalar_string(&Value::Null), None);
        assert_eq!(string_list(&Value::from("main")), vec!["main".to_string()]);
    }
}
