//! Decides whether a module name maps to a native entry in an archive.

use std::path::MAIN_SEPARATOR_STR;

use crate::archive::ArchiveReader;
use crate::suffix::{SuffixKind, SuffixTable};

/// A native entry found for a module name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntryMatch {
    pub kind: SuffixKind,
    /// Archive-internal path of the entry.
    pub path: String,
    /// Plain library suffix of the entry, e.g. `.so`.
    pub extension: String,
}

impl ArchiveEntryMatch {
    pub fn is_package(&self) -> bool {
        self.kind == SuffixKind::PackageInit
    }
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NativeMatch(ArchiveEntryMatch),
    /// No native entry; the caller falls back to the standard finder.
    NoMatch,
}

impl Resolution {
    pub fn native(&self) -> Option<&ArchiveEntryMatch> {
        match self {
            Resolution::NativeMatch(m) => Some(m),
            Resolution::NoMatch => None,
        }
    }

    pub fn is_package(&self) -> bool {
        self.native().map(ArchiveEntryMatch::is_package).unwrap_or(false)
    }
}

/// Last dotted segment of `fullname`.
pub fn leaf_name(fullname: &str) -> &str {
    fullname.rsplit('.').next().unwrap_or(fullname)
}

/// Everything before the last dot; empty for a top-level name.
pub fn parent_name(fullname: &str) -> &str {
    fullname.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
}

/// Probe `archive` for a native entry for `fullname` under `prefix`.
///
/// Candidates are `prefix + leaf + pattern` for every pattern of `suffixes`,
/// in table order; the first one present wins.
pub fn resolve(
    fullname: &str,
    prefix: &str,
    suffixes: &SuffixTable,
    archive: &dyn ArchiveReader,
) -> Resolution {
    let base = format!("{}{}", prefix, leaf_name(fullname).replace('.', MAIN_SEPARATOR_STR));

    for entry in suffixes.iter() {
        let candidate = format!("{}{}", base, entry.pattern);
        if archive.contains(&candidate) {
            tracing::debug!("Resolved {} to native entry {}", fullname, candidate);
            return Resolution::NativeMatch(ArchiveEntryMatch {
                kind: entry.kind,
                path: candidate,
                extension: entry.extension.clone(),
            });
        }
    }

    Resolution::NoMatch
}
