//! Path hook registry.
//!
//! [`PathHooks`] is the ordered list of handlers consulted for each
//! search-path entry, plus the cache of finders they produced. A
//! [`HookRegistration`] swaps the baseline archive hook for the
//! native-aware one in place and back again.
//!
//! Install and uninstall are not meant to race with each other or with
//! other code editing the same list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::archive::ArchiveCache;
use crate::config::ImportConfig;
use crate::error::{Error, Result};
use crate::finder::{ExtensionArchiveHook, FinderRef};
use crate::native::DylibLoader;
use crate::source::SourceArchiveHook;

/// Turns a search-path entry into a finder.
pub trait PathHook: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// `Ok(None)` when this hook does not handle `entry`.
    fn open(&self, entry: &Path) -> Result<Option<FinderRef>>;
}

pub type HookRef = Arc<dyn PathHook>;

/// Ordered path hooks and the entry -> finder cache.
#[derive(Debug, Default)]
pub struct PathHooks {
    hooks: RwLock<Vec<HookRef>>,
    finders: RwLock<HashMap<PathBuf, Option<FinderRef>>>,
}

impl PathHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(hooks: Vec<HookRef>) -> Self {
        Self {
            hooks: RwLock::new(hooks),
            finders: RwLock::new(HashMap::new()),
        }
    }

    pub fn push(&self, hook: HookRef) {
        self.hooks.write().push(hook);
    }

    /// Copy of the current list.
    pub fn snapshot(&self) -> Vec<HookRef> {
        self.hooks.read().clone()
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    /// Index of `hook`, compared by identity.
    pub fn position(&self, hook: &HookRef) -> Option<usize> {
        self.hooks.read().iter().position(|h| Arc::ptr_eq(h, hook))
    }

    pub fn contains(&self, hook: &HookRef) -> bool {
        self.position(hook).is_some()
    }

    /// Replace `current` with `replacement` at the same index.
    ///
    /// Returns the replaced hook, or `None` (list untouched) when `current`
    /// is not registered.
    pub fn replace(&self, current: &HookRef, replacement: HookRef) -> Option<HookRef> {
        let mut hooks = self.hooks.write();
        let idx = hooks.iter().position(|h| Arc::ptr_eq(h, current))?;
        Some(std::mem::replace(&mut hooks[idx], replacement))
    }

    /// Finder for `entry`, asking each hook in order on a cache miss.
    ///
    /// Entries no hook accepts are cached as `None` too.
    pub fn finder_for(&self, entry: &Path) -> Option<FinderRef> {
        if let Some(cached) = self.finders.read().get(entry) {
            return cached.clone();
        }

        let mut found = None;
        for hook in self.snapshot() {
            match hook.open(entry) {
                Ok(Some(finder)) => {
                    found = Some(finder);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("Hook {} rejected {}: {}", hook.name(), entry.display(), e);
                }
            }
        }

        self.finders
            .write()
            .insert(entry.to_path_buf(), found.clone());
        found
    }

    /// Forget every cached finder.
    pub fn invalidate_caches(&self) {
        self.finders.write().clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.finders.read().len()
    }
}

/// A baseline hook and the hook that stands in for it while installed.
#[derive(Debug, Clone)]
pub struct HookRegistration {
    baseline: HookRef,
    replacement: HookRef,
}

impl HookRegistration {
    pub fn new(baseline: HookRef, replacement: HookRef) -> Self {
        Self {
            baseline,
            replacement,
        }
    }

    pub fn baseline(&self) -> &HookRef {
        &self.baseline
    }

    pub fn replacement(&self) -> &HookRef {
        &self.replacement
    }

    /// Swap the baseline hook for the replacement, returning the baseline.
    pub fn install(&self, hooks: &PathHooks) -> Result<HookRef> {
        let prior = hooks
            .replace(&self.baseline, self.replacement.clone())
            .ok_or_else(|| {
                Error::Registration(format!(
                    "baseline hook {} is not registered",
                    self.baseline.name()
                ))
            })?;
        hooks.invalidate_caches();
        tracing::info!(
            "Installed path hook {} in place of {}",
            self.replacement.name(),
            prior.name()
        );
        Ok(prior)
    }

    /// Put the baseline hook back, returning the removed replacement.
    pub fn uninstall(&self, hooks: &PathHooks) -> Result<HookRef> {
        let removed = hooks
            .replace(&self.replacement, self.baseline.clone())
            .ok_or_else(|| {
                Error::Registration(format!(
                    "path hook {} is not installed",
                    self.replacement.name()
                ))
            })?;
        hooks.invalidate_caches();
        tracing::info!("Restored path hook {}", self.baseline.name());
        Ok(removed)
    }

    pub fn is_installed(&self, hooks: &PathHooks) -> bool {
        hooks.contains(&self.replacement)
    }
}

static CONFIG: Lazy<Arc<ImportConfig>> = Lazy::new(|| {
    let config = ImportConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("Ignoring import environment: {}", e);
        ImportConfig::default()
    });
    Arc::new(config)
});

static ARCHIVES: Lazy<Arc<ArchiveCache>> = Lazy::new(|| Arc::new(ArchiveCache::new()));

static BASELINE_HOOK: Lazy<HookRef> =
    Lazy::new(|| Arc::new(SourceArchiveHook::new(ARCHIVES.clone(), CONFIG.clone())));

static GLOBAL_HOOKS: Lazy<PathHooks> =
    Lazy::new(|| PathHooks::with_hooks(vec![BASELINE_HOOK.clone()]));

static REGISTRATION: Lazy<HookRegistration> = Lazy::new(|| {
    let native = Arc::new(DylibLoader::from_config(&CONFIG));
    let hook: HookRef = Arc::new(ExtensionArchiveHook::new(
        ARCHIVES.clone(),
        CONFIG.clone(),
        native,
    ));
    HookRegistration::new(BASELINE_HOOK.clone(), hook)
});

/// The process-wide hook list, seeded with the baseline archive hook.
pub fn global() -> &'static PathHooks {
    &GLOBAL_HOOKS
}

/// Process-wide configuration, read from the environment on first use.
pub fn global_config() -> Arc<ImportConfig> {
    CONFIG.clone()
}

/// The process-wide baseline archive hook.
pub fn baseline_hook() -> HookRef {
    BASELINE_HOOK.clone()
}

/// The process-wide native-aware archive hook.
pub fn extension_hook() -> HookRef {
    REGISTRATION.replacement().clone()
}

/// Replace the baseline archive hook in [`global()`] with the native-aware one.
pub fn install() -> Result<HookRef> {
    REGISTRATION.install(global())
}

/// Restore the baseline archive hook in [`global()`].
pub fn uninstall() -> Result<HookRef> {
    REGISTRATION.uninstall(global())
}
