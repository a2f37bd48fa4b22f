//! Ordered registry of validation rules
//!
//! Registration order is report order.

use super::*;
use crate::domain::RuleCategory;

/// Registry of every available rule, in registration order
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registry with all built-in rules, grouped by category
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RequiredKeysRule));
        registry.register(Box::new(TriggerEventsRule));
        registry.register(Box::new(PushFiltersRule));
        registry.register(Box::new(DispatchInputsRule));
        registry.register(Box::new(PermissionsDeclaredRule));
        registry.register(Box::new(PermissionsAllowlistRule));
        registry.register(Box::new(PermissionsDenylistRule));
        registry.register(Box::new(RequiredJobsRule));
        registry.register(Box::new(JobTimeoutsRule));
        registry.register(Box::new(JobRunnersRule));
        registry.register(Box::new(JobDependenciesRule));
        registry.register(Box::new(PythonToolchainRule));
        registry.register(Box::new(FullHistoryCheckoutRule));
        registry.register(Box::new(SystemPackagesRule));
        registry.register(Box::new(ArtifactUploadRule));
        registry.register(Box::new(ReleasePublishRule));
        registry.register(Box::new(ConcurrencyControlRule));
        registry.register(Box::new(ActionReferencesRule));
        registry.register(Box::new(BuilderDocumentRule));
        registry.register(Box::new(BuilderSectionsRule));
        registry.register(Box::new(BuilderAppIdentityRule));
        registry.register(Box::new(ProjectFilesPresentRule));
        registry.register(Box::new(ProjectFilesExecutableRule));
        registry
    }

    /// Register a rule; a rule with the same id replaces the earlier one in place
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        match self.rules.iter().position(|r| r.id() == rule.id()) {
            Some(index) => self.rules[index] = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Rules belonging to one category
    pub fn by_category(&self, category: RuleCategory) -> impl Iterator<Item = &dyn Rule> {
        self.iter().filter(move |r| r.category() == category)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
