//! Native module loading through the platform dynamic loader.

use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;

use libloading::{Library, Symbol};

use crate::config::{defaults::INIT_SYMBOL_PREFIX, ImportConfig};
use crate::error::{Error, Result};
use crate::module::{Module, ModuleRef, ModuleRegistry};
use crate::resolver::leaf_name;

/// Init function a native module exports as `<prefix><leaf>`.
///
/// Returns zero on success.
pub type ModuleInitFn = unsafe extern "C" fn() -> c_int;

/// Turns a library file on disk into a module.
pub trait NativeLoader: Send + Sync + std::fmt::Debug {
    /// Load the library at `path` as module `fullname`.
    ///
    /// Implementations may register the module in `modules` before running
    /// its initialisation and leave that entry behind on failure.
    fn load(&self, path: &Path, fullname: &str, modules: &ModuleRegistry) -> Result<ModuleRef>;
}

/// [`NativeLoader`] backed by `libloading`.
#[derive(Debug, Clone)]
pub struct DylibLoader {
    init_prefix: String,
}

impl DylibLoader {
    pub fn new() -> Self {
        Self::with_init_prefix(INIT_SYMBOL_PREFIX)
    }

    pub fn with_init_prefix(prefix: impl Into<String>) -> Self {
        Self {
            init_prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::with_init_prefix(config.init_symbol_prefix.clone())
    }

    /// Name of the init symbol for `fullname`.
    pub fn init_symbol(&self, fullname: &str) -> String {
        format!("{}{}", self.init_prefix, leaf_name(fullname))
    }
}

impl Default for DylibLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeLoader for DylibLoader {
    fn load(&self, path: &Path, fullname: &str, modules: &ModuleRegistry) -> Result<ModuleRef> {
        let native_err = |reason: String| Error::NativeLoad {
            name: fullname.to_string(),
            reason,
        };

        // Load the library
        let library = unsafe {
            Library::new(path).map_err(|e| native_err(format!("Failed to load library: {}", e)))?
        };
        let library = Arc::new(library);

        let mut module = Module::new(fullname);
        module.library = Some(library.clone());
        let module = module.into_ref();
        modules.insert(fullname, module.clone());

        let symbol = self.init_symbol(fullname);
        let init: Symbol<ModuleInitFn> = unsafe {
            library
                .get(symbol.as_bytes())
                .map_err(|e| native_err(format!("Missing init function {}: {}", symbol, e)))?
        };

        let status = unsafe { init() };
        if status != 0 {
            return Err(native_err(format!("{} returned {}", symbol, status)));
        }

        tracing::debug!("Initialised native module {} from {}", fullname, path.display());
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_symbol_uses_leaf() {
        let loader = DylibLoader::new();
        assert_eq!(loader.init_symbol("pkg.two"), "zipext_init_two");
        assert_eq!(
            DylibLoader::with_init_prefix("init_").init_symbol("one"),
            "init_one"
        );
    }

    #[test]
    fn test_load_nonexistent_library() {
        let loader = DylibLoader::new();
        let modules = ModuleRegistry::new();

        let result = loader.load(Path::new("/nonexistent/path/two.so"), "two", &modules);
        assert!(matches!(result, Err(Error::NativeLoad { ref name, .. }) if name == "two"));
        assert!(!modules.contains("two"));
    }

    #[test]
    fn test_load_garbage_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("junk{}", std::env::consts::DLL_SUFFIX));
        std::fs::write(&path, b"definitely not a shared object").unwrap();

        let modules = ModuleRegistry::new();
        let result = DylibLoader::new().load(&path, "junk", &modules);
        assert!(matches!(result, Err(Error::NativeLoad { .. })));
    }
}
