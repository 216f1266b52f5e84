//! Loaders, and the extraction loader for native modules stored in archives.
//!
//! The platform loader needs a real file, so [`ExtensionFileLoader`] writes
//! the entry bytes to a private temporary file before handing its path to a
//! [`NativeLoader`]. The temporary file belongs to the loader and is removed
//! only when the loader is dropped; a loaded module keeps its loader (and so
//! the file) alive through its `loader` back-reference.
//!
//! ```text
//! Created -> DataWritten -> NativeLoaded -> Patched -> Ready
//!    \___________\_______________\______________\____-> Failed
//! ```

use std::any::Any;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use tempfile::NamedTempFile;

use crate::config::{defaults::PACKAGE_INIT, ImportConfig};
use crate::error::{Error, Result};
use crate::module::{ModuleRef, ModuleRegistry};
use crate::native::NativeLoader;
use crate::resolver::{parent_name, ArchiveEntryMatch};
use crate::suffix::SuffixKind;

/// Produces a module for the name it was created for.
pub trait Loader: Send + Sync + std::fmt::Debug {
    /// The module name this loader is bound to.
    fn name(&self) -> &str;

    /// Load the module. `None` means the bound name; any other name fails
    /// with [`Error::NameMismatch`].
    fn load_module(
        self: Arc<Self>,
        fullname: Option<&str>,
        modules: &ModuleRegistry,
    ) -> Result<ModuleRef>;

    fn is_package(&self, fullname: &str) -> Result<bool>;

    fn get_source(&self, fullname: &str) -> Result<Option<String>>;

    fn as_any(&self) -> &dyn Any;
}

pub type LoaderRef = Arc<dyn Loader>;

/// Resolve the name a load was requested under against the bound name.
pub(crate) fn check_name<'a>(bound: &'a str, requested: Option<&'a str>) -> Result<&'a str> {
    match requested {
        None => Ok(bound),
        Some(name) if name == bound => Ok(name),
        Some(name) => Err(Error::NameMismatch {
            expected: bound.to_string(),
            got: name.to_string(),
        }),
    }
}

/// Progress of the most recent load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Created,
    DataWritten,
    NativeLoaded,
    Patched,
    Ready,
    Failed,
}

/// The extracted library on disk.
#[derive(Debug)]
pub struct ExtractedPayload {
    file: NamedTempFile,
    fake_path: PathBuf,
    len: usize,
}

impl ExtractedPayload {
    /// Real location handed to the native loader.
    pub fn real_path(&self) -> &Path {
        self.file.path()
    }

    /// Location reported to the module.
    pub fn fake_path(&self) -> &Path {
        &self.fake_path
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Loads one native module out of archive bytes.
pub struct ExtensionFileLoader {
    name: String,
    /// Archive path joined with the entry path.
    path: PathBuf,
    /// Entry bytes, released once written to the temporary file.
    data: Mutex<Option<Vec<u8>>>,
    kind: SuffixKind,
    extension: String,
    native: Arc<dyn NativeLoader>,
    temp_dir: Option<PathBuf>,
    temp_prefix: String,
    payload: Mutex<Option<ExtractedPayload>>,
    state: Mutex<LoadState>,
}

impl ExtensionFileLoader {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        data: Vec<u8>,
        entry: &ArchiveEntryMatch,
        native: Arc<dyn NativeLoader>,
        config: &ImportConfig,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            data: Mutex::new(Some(data)),
            kind: entry.kind,
            extension: entry.extension.clone(),
            native,
            temp_dir: config.temp_dir.clone(),
            temp_prefix: config.temp_prefix.clone(),
            payload: Mutex::new(None),
            state: Mutex::new(LoadState::Created),
        }
    }

    /// The path reported to the loaded module.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> LoadState {
        *self.state.lock()
    }

    /// The extracted library, once written.
    ///
    /// The guard blocks loads through this loader while it is held.
    pub fn payload(&self) -> Option<MappedMutexGuard<'_, ExtractedPayload>> {
        MutexGuard::try_map(self.payload.lock(), |p| p.as_mut()).ok()
    }

    /// Real path of the extracted library, once written.
    pub fn extracted_path(&self) -> Option<PathBuf> {
        self.payload().map(|p| p.real_path().to_path_buf())
    }

    /// Whether the entry bytes are still held in memory.
    pub fn has_pending_data(&self) -> bool {
        self.data.lock().is_some()
    }

    fn set_state(&self, state: LoadState) {
        *self.state.lock() = state;
    }

    /// Write the library to its temporary file, reusing an earlier one.
    fn extract(&self) -> Result<PathBuf> {
        let mut payload = self.payload.lock();
        if let Some(existing) = payload.as_ref() {
            return Ok(existing.real_path().to_path_buf());
        }

        let mut data = self.data.lock();
        let bytes = data.as_deref().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no data left to extract for {}", self.path.display()),
            ))
        })?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.temp_prefix).suffix(&self.extension);
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        // The platform loader may map the file lazily; it must be complete
        // on disk before it is opened.
        file.write_all(bytes)?;
        file.flush()?;
        file.as_file().sync_all()?;

        // Only the file is needed from here on, including for reloads.
        let len = bytes.len();
        *data = None;

        let real_path = file.path().to_path_buf();
        tracing::debug!(
            "Extracted {} ({} bytes) to {}",
            self.path.display(),
            len,
            real_path.display()
        );

        *payload = Some(ExtractedPayload {
            file,
            fake_path: self.path.clone(),
            len,
        });
        Ok(real_path)
    }

    /// Put the registry entry for `fullname` back to `prior`.
    fn roll_back(modules: &ModuleRegistry, fullname: &str, prior: Option<ModuleRef>) {
        match prior {
            None => {
                if modules.remove(fullname).is_some() {
                    tracing::debug!("Removed partially loaded module {}", fullname);
                }
            }
            Some(prior) => {
                let replaced = modules
                    .get(fullname)
                    .map(|current| !Arc::ptr_eq(&current, &prior))
                    .unwrap_or(true);
                if replaced {
                    modules.insert(fullname, prior);
                }
            }
        }
    }
}

impl std::fmt::Debug for ExtensionFileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionFileLoader")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

impl Loader for ExtensionFileLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_module(
        self: Arc<Self>,
        fullname: Option<&str>,
        modules: &ModuleRegistry,
    ) -> Result<ModuleRef> {
        let fullname = check_name(&self.name, fullname)?;
        self.set_state(LoadState::Created);

        let real_path = self.extract().inspect_err(|e| {
            self.set_state(LoadState::Failed);
            tracing::warn!("Failed to extract {}: {}", self.path.display(), e);
        })?;
        self.set_state(LoadState::DataWritten);

        let prior = modules.get(fullname);
        let module = match self.native.load(&real_path, fullname, modules) {
            Ok(module) => module,
            Err(e) => {
                Self::roll_back(modules, fullname, prior);
                self.set_state(LoadState::Failed);
                tracing::warn!("Failed to load native module {}: {}", fullname, e);
                return Err(e);
            }
        };
        self.set_state(LoadState::NativeLoaded);

        {
            let mut m = module.write();
            m.file = Some(self.path.clone());
            if self.kind == SuffixKind::PackageInit && m.path.is_none() {
                let dir = self.path.parent().map(Path::to_path_buf).unwrap_or_default();
                m.path = Some(vec![dir]);
            }
            self.set_state(LoadState::Patched);

            if m.loader.is_none() {
                m.loader = Some(self.clone() as LoaderRef);
            }
            if m.package.is_none() {
                let package = if m.is_package() {
                    m.name().to_string()
                } else {
                    parent_name(m.name()).to_string()
                };
                m.package = Some(package);
            }
        }

        self.set_state(LoadState::Ready);
        tracing::info!("Loaded native module {} from {}", fullname, self.path.display());
        Ok(module)
    }

    fn is_package(&self, _fullname: &str) -> Result<bool> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(file_name == format!("{}{}", PACKAGE_INIT, self.extension))
    }

    fn get_source(&self, _fullname: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
