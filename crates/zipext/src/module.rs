//! Module objects and the module registry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::loader::LoaderRef;

/// A loaded module and its identity attributes.
#[derive(Debug)]
pub struct Module {
    name: String,
    /// Reported file location.
    pub file: Option<PathBuf>,
    /// Package search locations. `Some` marks the module as a package.
    pub path: Option<Vec<PathBuf>>,
    /// Package name; empty for a top-level plain module.
    pub package: Option<String>,
    /// Keeps a native module's library mapped. Declared before `loader`
    /// so the library is unmapped before its extracted file is removed.
    pub library: Option<Arc<libloading::Library>>,
    /// The loader that produced this module.
    pub loader: Option<LoaderRef>,
    /// Text of a source module.
    pub source: Option<String>,
}

/// Shared handle to a module.
pub type ModuleRef = Arc<RwLock<Module>>;

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            path: None,
            package: None,
            library: None,
            loader: None,
            source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_package(&self) -> bool {
        self.path.is_some()
    }

    pub fn into_ref(self) -> ModuleRef {
        Arc::new(RwLock::new(self))
    }
}

/// Name to module map for every imported module.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, ModuleRef>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ModuleRef> {
        self.modules.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    /// Register `module` under `name`, returning the entry it replaced.
    pub fn insert(&self, name: impl Into<String>, module: ModuleRef) -> Option<ModuleRef> {
        self.modules.write().insert(name.into(), module)
    }

    pub fn remove(&self, name: &str) -> Option<ModuleRef> {
        self.modules.write().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}
