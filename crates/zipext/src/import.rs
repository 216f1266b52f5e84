//! A small import driver on top of [`PathHooks`] and [`ModuleRegistry`].

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::hooks::PathHooks;
use crate::module::{ModuleRef, ModuleRegistry};
use crate::resolver::parent_name;

/// Imports dotted names by walking a search path through the path hooks.
#[derive(Debug)]
pub struct Importer {
    search_path: RwLock<Vec<PathBuf>>,
    hooks: Arc<PathHooks>,
    modules: Arc<ModuleRegistry>,
}

impl Importer {
    pub fn new(hooks: Arc<PathHooks>, modules: Arc<ModuleRegistry>) -> Self {
        Self {
            search_path: RwLock::new(Vec::new()),
            hooks,
            modules,
        }
    }

    pub fn hooks(&self) -> &Arc<PathHooks> {
        &self.hooks
    }

    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.modules
    }

    pub fn search_path(&self) -> Vec<PathBuf> {
        self.search_path.read().clone()
    }

    pub fn set_search_path(&self, entries: Vec<PathBuf>) {
        *self.search_path.write() = entries;
    }

    /// Put `entry` at the front of the search path.
    pub fn prepend_path(&self, entry: impl Into<PathBuf>) {
        self.search_path.write().insert(0, entry.into());
    }

    pub fn append_path(&self, entry: impl Into<PathBuf>) {
        self.search_path.write().push(entry.into());
    }

    /// Import `name`, importing its parent packages first.
    pub fn import_module(&self, name: &str) -> Result<ModuleRef> {
        if let Some(module) = self.modules.get(name) {
            return Ok(module);
        }

        let parent = parent_name(name);
        let search = if parent.is_empty() {
            self.search_path()
        } else {
            let package = self.import_module(parent)?;
            let path = package.read().path.clone();
            path.ok_or_else(|| Error::NotAPackage(parent.to_string()))?
        };

        // Importing the parent may have pulled this module in already.
        if let Some(module) = self.modules.get(name) {
            return Ok(module);
        }

        for entry in &search {
            let Some(finder) = self.hooks.finder_for(entry) else {
                continue;
            };
            let Some(loader) = finder.find_module(name)? else {
                continue;
            };

            let module = loader.load_module(Some(name), &self.modules)?;
            if !self.modules.contains(name) {
                self.modules.insert(name, module.clone());
            }
            tracing::debug!("Imported {} from {}", name, entry.display());
            return Ok(module);
        }

        Err(Error::ModuleNotFound(name.to_string()))
    }
}
