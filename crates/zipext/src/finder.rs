//! Path entry finders and the native-aware archive finder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::ArchiveCache;
use crate::config::ImportConfig;
use crate::error::Result;
use crate::hooks::PathHook;
use crate::loader::{ExtensionFileLoader, LoaderRef};
use crate::native::NativeLoader;
use crate::resolver::{resolve, Resolution};
use crate::source::{SourceArchiveFinder, SourceArchiveHook};
use crate::suffix::SuffixTable;

/// What a finder found for a name.
#[derive(Debug, Default)]
pub struct FindResult {
    pub loader: Option<LoaderRef>,
    /// Directories that could make up a namespace package.
    pub portions: Vec<PathBuf>,
}

impl FindResult {
    pub fn loader(loader: LoaderRef) -> Self {
        Self {
            loader: Some(loader),
            portions: Vec::new(),
        }
    }

    pub fn portions(portions: Vec<PathBuf>) -> Self {
        Self {
            loader: None,
            portions,
        }
    }
}

/// Finds modules under one search-path entry.
pub trait PathEntryFinder: Send + Sync + std::fmt::Debug {
    fn find_loader(&self, fullname: &str) -> Result<FindResult>;

    /// Like [`find_loader`](Self::find_loader), but only the loader.
    fn find_module(&self, fullname: &str) -> Result<Option<LoaderRef>> {
        let found = self.find_loader(fullname)?;
        if found.loader.is_none() {
            if let Some(portion) = found.portions.first() {
                tracing::warn!(
                    "Not importing directory {}: missing __init__",
                    portion.display()
                );
            }
        }
        Ok(found.loader)
    }

    fn is_package(&self, fullname: &str) -> Result<bool>;
}

pub type FinderRef = Arc<dyn PathEntryFinder>;

/// Archive finder that also loads native modules.
///
/// Names with a native entry are served by an [`ExtensionFileLoader`];
/// everything else goes to the wrapped [`SourceArchiveFinder`] unchanged.
#[derive(Debug)]
pub struct ExtensionArchiveFinder {
    fallback: SourceArchiveFinder,
    suffixes: SuffixTable,
    native: Arc<dyn NativeLoader>,
    config: Arc<ImportConfig>,
}

impl ExtensionArchiveFinder {
    pub fn new(
        fallback: SourceArchiveFinder,
        suffixes: SuffixTable,
        native: Arc<dyn NativeLoader>,
        config: Arc<ImportConfig>,
    ) -> Self {
        Self {
            fallback,
            suffixes,
            native,
            config,
        }
    }

    pub fn fallback(&self) -> &SourceArchiveFinder {
        &self.fallback
    }

    pub fn resolve(&self, fullname: &str) -> Resolution {
        resolve(
            fullname,
            self.fallback.prefix(),
            &self.suffixes,
            self.fallback.archive().as_ref(),
        )
    }
}

impl PathEntryFinder for ExtensionArchiveFinder {
    fn find_loader(&self, fullname: &str) -> Result<FindResult> {
        match self.resolve(fullname) {
            Resolution::NativeMatch(entry) => {
                let archive = self.fallback.archive();
                let fake_path = archive.archive_path().join(&entry.path);
                let data = archive.read(&entry.path)?;
                let loader = ExtensionFileLoader::new(
                    fullname,
                    fake_path,
                    data,
                    &entry,
                    self.native.clone(),
                    &self.config,
                );
                Ok(FindResult::loader(Arc::new(loader)))
            }
            Resolution::NoMatch => self.fallback.find_loader(fullname),
        }
    }

    fn is_package(&self, fullname: &str) -> Result<bool> {
        if self.resolve(fullname).is_package() {
            return Ok(true);
        }
        self.fallback.is_package(fullname)
    }
}

/// Path hook that opens archives for [`ExtensionArchiveFinder`].
#[derive(Debug)]
pub struct ExtensionArchiveHook {
    source: SourceArchiveHook,
    suffixes: SuffixTable,
    native: Arc<dyn NativeLoader>,
    config: Arc<ImportConfig>,
}

impl ExtensionArchiveHook {
    pub fn new(
        archives: Arc<ArchiveCache>,
        config: Arc<ImportConfig>,
        native: Arc<dyn NativeLoader>,
    ) -> Self {
        Self {
            source: SourceArchiveHook::new(archives, config.clone()),
            suffixes: SuffixTable::new(config.extension_suffixes.iter().cloned()),
            native,
            config,
        }
    }

    pub fn suffixes(&self) -> &SuffixTable {
        &self.suffixes
    }
}

impl PathHook for ExtensionArchiveHook {
    fn name(&self) -> &str {
        "extension-archive"
    }

    fn open(&self, entry: &Path) -> Result<Option<FinderRef>> {
        let Some(fallback) = self.source.open_finder(entry)? else {
            return Ok(None);
        };
        let finder = ExtensionArchiveFinder::new(
            fallback,
            self.suffixes.clone(),
            self.native.clone(),
            self.config.clone(),
        );
        Ok(Some(Arc::new(finder)))
    }
}
