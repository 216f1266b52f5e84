//! Baseline archive finder for text modules.
//!
//! This is the standard archive path handler: it only knows about source
//! files. [`crate::finder::ExtensionArchiveFinder`] wraps it and defers to
//! it whenever an archive holds no native entry for a name.

use std::any::Any;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;

use crate::archive::{split_archive_path, ArchiveCache, ArchiveReader};
use crate::config::{defaults::PACKAGE_INIT, ImportConfig};
use crate::error::{Error, Result};
use crate::finder::{FindResult, FinderRef, PathEntryFinder};
use crate::hooks::PathHook;
use crate::loader::{check_name, Loader, LoaderRef};
use crate::module::{Module, ModuleRef, ModuleRegistry};
use crate::resolver::{leaf_name, parent_name};

/// A source entry found for a module name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: String,
    pub is_package: bool,
}

/// Finds text modules under one prefix of one archive.
#[derive(Debug, Clone)]
pub struct SourceArchiveFinder {
    archive: Arc<dyn ArchiveReader>,
    prefix: String,
    source_suffixes: Vec<String>,
}

impl SourceArchiveFinder {
    pub fn new(
        archive: Arc<dyn ArchiveReader>,
        prefix: impl Into<String>,
        source_suffixes: Vec<String>,
    ) -> Self {
        Self {
            archive,
            prefix: prefix.into(),
            source_suffixes,
        }
    }

    pub fn archive(&self) -> &Arc<dyn ArchiveReader> {
        &self.archive
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn base_path(&self, fullname: &str) -> String {
        format!("{}{}", self.prefix, leaf_name(fullname))
    }

    /// Package init files are probed before flat files.
    pub fn find_entry(&self, fullname: &str) -> Option<SourceEntry> {
        let base = self.base_path(fullname);

        let packages = self.source_suffixes.iter().map(|suffix| SourceEntry {
            path: format!("{}{}{}{}", base, MAIN_SEPARATOR, PACKAGE_INIT, suffix),
            is_package: true,
        });
        let modules = self.source_suffixes.iter().map(|suffix| SourceEntry {
            path: format!("{}{}", base, suffix),
            is_package: false,
        });

        packages
            .chain(modules)
            .find(|candidate| self.archive.contains(&candidate.path))
    }
}

impl PathEntryFinder for SourceArchiveFinder {
    fn find_loader(&self, fullname: &str) -> Result<FindResult> {
        if let Some(entry) = self.find_entry(fullname) {
            let loader = ArchiveSourceLoader {
                name: fullname.to_string(),
                archive: self.archive.clone(),
                entry,
            };
            return Ok(FindResult::loader(Arc::new(loader)));
        }

        let base = self.base_path(fullname);
        if self.archive.has_directory(&base) {
            let portion = self.archive.archive_path().join(&base);
            return Ok(FindResult::portions(vec![portion]));
        }

        Ok(FindResult::default())
    }

    fn is_package(&self, fullname: &str) -> Result<bool> {
        self.find_entry(fullname)
            .map(|entry| entry.is_package)
            .ok_or_else(|| Error::ModuleNotFound(fullname.to_string()))
    }
}

/// Loads one text module out of an archive.
#[derive(Debug)]
pub struct ArchiveSourceLoader {
    name: String,
    archive: Arc<dyn ArchiveReader>,
    entry: SourceEntry,
}

impl ArchiveSourceLoader {
    /// Reported file location: archive path joined with the entry path.
    pub fn path(&self) -> PathBuf {
        self.archive.archive_path().join(&self.entry.path)
    }

    fn read_source(&self) -> Result<String> {
        let data = self.archive.read(&self.entry.path)?;
        String::from_utf8(data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }
}

impl Loader for ArchiveSourceLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_module(
        self: Arc<Self>,
        fullname: Option<&str>,
        modules: &ModuleRegistry,
    ) -> Result<ModuleRef> {
        let fullname = check_name(&self.name, fullname)?;
        let source = self.read_source()?;
        let file = self.path();

        let mut module = Module::new(fullname);
        if self.entry.is_package {
            let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
            module.path = Some(vec![dir]);
            module.package = Some(fullname.to_string());
        } else {
            module.package = Some(parent_name(fullname).to_string());
        }
        module.file = Some(file);
        module.source = Some(source);
        module.loader = Some(self.clone() as LoaderRef);

        let module = module.into_ref();
        modules.insert(fullname, module.clone());
        tracing::debug!("Loaded source module {} from {}", fullname, self.path().display());
        Ok(module)
    }

    fn is_package(&self, _fullname: &str) -> Result<bool> {
        Ok(self.entry.is_package)
    }

    fn get_source(&self, fullname: &str) -> Result<Option<String>> {
        check_name(&self.name, Some(fullname))?;
        self.read_source().map(Some)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The baseline path hook: opens archives for [`SourceArchiveFinder`].
#[derive(Debug)]
pub struct SourceArchiveHook {
    archives: Arc<ArchiveCache>,
    config: Arc<ImportConfig>,
}

impl SourceArchiveHook {
    pub fn new(archives: Arc<ArchiveCache>, config: Arc<ImportConfig>) -> Self {
        Self { archives, config }
    }

    /// Open the finder for a search-path entry, if it points into an archive.
    pub fn open_finder(&self, entry: &Path) -> Result<Option<SourceArchiveFinder>> {
        let Some((archive_path, prefix)) = split_archive_path(entry) else {
            return Ok(None);
        };
        let archive = self.archives.open(&archive_path)?;
        Ok(Some(SourceArchiveFinder::new(
            archive,
            prefix,
            self.config.source_suffixes.clone(),
        )))
    }
}

impl PathHook for SourceArchiveHook {
    fn name(&self) -> &str {
        "source-archive"
    }

    fn open(&self, entry: &Path) -> Result<Option<FinderRef>> {
        Ok(self
            .open_finder(entry)?
            .map(|finder| Arc::new(finder) as FinderRef))
    }
}
