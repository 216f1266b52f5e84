//! Read-only access to zip archives on the search path.
//!
//! Entry names are exposed with the platform separator so they can be
//! compared directly against paths built from module names.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf, MAIN_SEPARATOR, MAIN_SEPARATOR_STR};
use std::sync::Arc;

use parking_lot::Mutex;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOC: usize = 1 << 20;

/// Listing and byte access over one archive.
pub trait ArchiveReader: Send + Sync + std::fmt::Debug {
    /// The archive file on disk.
    fn archive_path(&self) -> &Path;

    /// Whether `entry` is present in the listing.
    fn contains(&self, entry: &str) -> bool;

    /// Every entry name.
    fn entries(&self) -> Vec<String>;

    /// Read the full contents of `entry`.
    fn read(&self, entry: &str) -> Result<Vec<u8>>;

    /// Whether any entry lives under the directory `dir`.
    fn has_directory(&self, dir: &str) -> bool {
        let prefix = directory_prefix(dir);
        self.entries().iter().any(|e| e.starts_with(&prefix))
    }
}

fn directory_prefix(dir: &str) -> String {
    let mut prefix = dir.trim_end_matches(MAIN_SEPARATOR).to_string();
    prefix.push(MAIN_SEPARATOR);
    prefix
}

/// [`ArchiveReader`] backed by the `zip` crate.
pub struct ZipArchiveReader {
    path: PathBuf,
    /// Platform-separated name to the name stored in the archive.
    names: HashMap<String, String>,
    archive: Mutex<ZipArchive<File>>,
}

impl ZipArchiveReader {
    /// Open `path` and read its central directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;

        let names = archive
            .file_names()
            .map(|raw| (raw.replace('/', MAIN_SEPARATOR_STR), raw.to_string()))
            .collect::<HashMap<_, _>>();

        tracing::debug!(
            "Opened archive {} with {} entries",
            path.display(),
            names.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            names,
            archive: Mutex::new(archive),
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl std::fmt::Debug for ZipArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchiveReader")
            .field("path", &self.path)
            .field("entries", &self.names.len())
            .finish()
    }
}

impl ArchiveReader for ZipArchiveReader {
    fn archive_path(&self) -> &Path {
        &self.path
    }

    fn contains(&self, entry: &str) -> bool {
        self.names.contains_key(entry)
    }

    fn entries(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }

    fn has_directory(&self, dir: &str) -> bool {
        let prefix = directory_prefix(dir);
        self.names.keys().any(|e| e.starts_with(&prefix))
    }

    fn read(&self, entry: &str) -> Result<Vec<u8>> {
        let raw = self
            .names
            .get(entry)
            .ok_or(Error::Archive(ZipError::FileNotFound))?;

        let mut archive = self.archive.lock();
        let mut file = archive.by_name(raw)?;
        // The declared size comes from the archive and is not trusted.
        let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
        let mut data = Vec::with_capacity(declared.min(MAX_PREALLOC));
        file.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Split a search-path entry into the archive file and the prefix inside it.
///
/// `/srv/app.zip/pkg/sub` becomes (`/srv/app.zip`, `pkg/sub/`). Returns
/// `None` when no ancestor of `path` is an existing file.
pub fn split_archive_path(path: &Path) -> Option<(PathBuf, String)> {
    let mut archive = path.to_path_buf();
    let mut inner = Vec::new();

    while !archive.is_file() {
        inner.push(archive.file_name()?.to_string_lossy().into_owned());
        if !archive.pop() {
            return None;
        }
    }

    inner.reverse();
    let mut prefix = inner.join(MAIN_SEPARATOR_STR);
    if !prefix.is_empty() {
        prefix.push(MAIN_SEPARATOR);
    }
    Some((archive, prefix))
}

/// Opened archives keyed by archive file.
#[derive(Debug, Default)]
pub struct ArchiveCache {
    readers: Mutex<HashMap<PathBuf, Arc<dyn ArchiveReader>>>,
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached reader for `archive`, opening it on first use.
    pub fn open(&self, archive: &Path) -> Result<Arc<dyn ArchiveReader>> {
        let mut readers = self.readers.lock();
        if let Some(reader) = readers.get(archive) {
            return Ok(reader.clone());
        }

        let reader: Arc<dyn ArchiveReader> = Arc::new(ZipArchiveReader::open(archive)?);
        readers.insert(archive.to_path_buf(), reader.clone());
        Ok(reader)
    }

    /// Drop the cached reader for `archive`, e.g. after it was rewritten.
    pub fn invalidate(&self, archive: &Path) -> bool {
        self.readers.lock().remove(archive).is_some()
    }

    pub fn clear(&self) {
        self.readers.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.readers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.lock().is_empty()
    }
}
