//! Native library suffix table.
//!
//! Every plain suffix `.so` yields two probe patterns: `/__init__.so` for a
//! package and `.so` for a flat module. All package-init patterns come first,
//! in the same relative order as their plain counterparts, so a package
//! always shadows a same-named flat module.

use std::path::MAIN_SEPARATOR;

use crate::config::defaults::PACKAGE_INIT;

/// Which flavour of suffix matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuffixKind {
    /// `leaf/__init__<suffix>`: the leaf is a package.
    PackageInit,
    /// `leaf<suffix>`: an ordinary module.
    Plain,
}

/// One probe pattern of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixEntry {
    pub kind: SuffixKind,
    /// Text appended to the base path when probing.
    pub pattern: String,
    /// The plain library suffix behind the pattern, e.g. `.so`.
    pub extension: String,
}

impl SuffixEntry {
    pub fn is_package(&self) -> bool {
        self.kind == SuffixKind::PackageInit
    }
}

/// Ordered probe patterns derived from a list of native suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixTable {
    entries: Vec<SuffixEntry>,
}

impl SuffixTable {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let plain: Vec<String> = suffixes.into_iter().map(Into::into).collect();

        let package_init = plain.iter().map(|ext| SuffixEntry {
            kind: SuffixKind::PackageInit,
            pattern: format!("{}{}{}", MAIN_SEPARATOR, PACKAGE_INIT, ext),
            extension: ext.clone(),
        });
        let flat = plain.iter().map(|ext| SuffixEntry {
            kind: SuffixKind::Plain,
            pattern: ext.clone(),
            extension: ext.clone(),
        });

        Self {
            entries: package_init.chain(flat).collect(),
        }
    }

    /// Table for the running platform.
    pub fn platform() -> Self {
        Self::new(platform_extension_suffixes())
    }

    pub fn entries(&self) -> &[SuffixEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &SuffixEntry> {
        self.entries.iter()
    }

    /// The plain suffixes, in probe order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.kind == SuffixKind::Plain)
            .map(|e| e.extension.as_str())
    }

    /// True when `file_name` is `__init__<suffix>` for one of the suffixes.
    pub fn is_package_init_file(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(PACKAGE_INIT)
            .map(|rest| self.extensions().any(|ext| ext == rest))
            .unwrap_or(false)
    }
}

/// Native library suffixes the platform loader accepts.
pub fn platform_extension_suffixes() -> Vec<String> {
    match std::env::consts::OS {
        "macos" => vec![".so".to_string(), ".dylib".to_string()],
        _ => vec![std::env::consts::DLL_SUFFIX.to_string()],
    }
}
