//! Action name → module routing and introspection.
use super::files::{EnsureDir, EnsureFile};
use super::packages::Install;
use super::symlinks::Symlink;
use super::{ActionDoc, Module, ModuleDoc};
use crate::error::NotFoundError;

/// The set of modules available to a run, keyed by action name.
#[derive(Debug)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleRegistry {
    /// Registry holding every built-in module.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_modules(vec![
            Box::new(EnsureDir),
            Box::new(EnsureFile),
            Box::new(Symlink),
            Box::new(Install),
        ])
    }

    /// Registry holding exactly `modules`.
    ///
    /// When two modules claim the same action the first one wins.
    #[must_use]
    pub fn from_modules(modules: Vec<Box<dyn Module>>) -> Self {
        Self { modules }
    }

    /// Module registered for `action`.
    #[must_use]
    pub fn get(&self, action: &str) -> Option<&dyn Module> {
        self.modules
            .iter()
            .find(|m| m.action() == action)
            .map(AsRef::as_ref)
    }

    /// Registered action names, sorted.
    #[must_use]
    pub fn action_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.modules.iter().map(|m| m.action()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Documentation for every registered action, sorted by action name.
    #[must_use]
    pub fn list_all_actions(&self) -> Vec<ActionDoc> {
        self.action_names()
            .into_iter()
            .filter_map(|name| self.get(name))
            .map(Module::describe)
            .collect()
    }

    /// Documentation for one action.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Action`] if no module handles `action`.
    pub fn explain_action(&self, action: &str) -> Result<ActionDoc, NotFoundError> {
        self.get(action)
            .map(Module::describe)
            .ok_or_else(|| NotFoundError::Action(action.to_string()))
    }

    /// Documentation for every action of a module group.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Module`] if no registered module belongs to
    /// `module`.
    pub fn explain_module(&self, module: &str) -> Result<ModuleDoc, NotFoundError> {
        let actions: Vec<ActionDoc> = self
            .list_all_actions()
            .into_iter()
            .filter(|doc| doc.module == module)
            .collect();
        let Some(first) = actions.first() else {
            return Err(NotFoundError::Module(module.to_string()));
        };
        Ok(ModuleDoc {
            module: first.module,
            actions,
        })
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_actions() {
        assert_eq!(
            ModuleRegistry::builtin().action_names(),
            vec!["ensure_dir", "ensure_file", "install", "symlink"]
        );
    }

    #[test]
    fn get_routes_by_action() {
        let registry = ModuleRegistry::builtin();
        assert_eq!(registry.get("symlink").map(Module::module), Some("symlinks"));
        assert!(registry.get("frobnicate").is_none());
    }

    #[test]
    fn explain_action_found_and_missing() {
        let registry = ModuleRegistry::builtin();
        assert_eq!(registry.explain_action("install").unwrap().module, "packages");
        assert_eq!(
            registry.explain_action("nope").unwrap_err(),
            NotFoundError::Action("nope".to_string())
        );
    }

    #[test]
    fn explain_module_groups_actions() {
        let registry = ModuleRegistry::builtin();
        let doc = registry.explain_module("files").unwrap();
        let names: Vec<_> = doc.actions.iter().map(|a| a.action).collect();
        assert_eq!(names, vec!["ensure_dir", "ensure_file"]);
        assert_eq!(
            registry.explain_module("network").unwrap_err(),
            NotFoundError::Module("network".to_string())
        );
    }

    #[test]
    fn every_action_documents_its_primary_param() {
        let registry = ModuleRegistry::builtin();
        for name in registry.action_names() {
            let module = registry.get(name).unwrap();
            let doc = module.describe();
            assert!(
                doc.params.iter().any(|p| p.name == module.primary_param()),
                "{name} does not document {}",
                module.primary_param()
            );
            assert!(!doc.examples.is_empty(), "{name} has no examples");
        }
    }
}
