//! Import native extension modules from zip archives.
//!
//! An archive on the search path is normally only good for text modules: a
//! native library has to be a real file before the platform loader can map
//! it. This crate bridges that gap. When an archive holds a native entry for
//! a requested name, the entry is extracted to a private temporary file,
//! loaded from there, and reported under its archive path.
//!
//! # Architecture
//!
//! ```text
//! PathHooks (process-wide handler list)
//!   └── ExtensionArchiveHook          installed in place of SourceArchiveHook
//!         └── ExtensionArchiveFinder
//!               ├── resolve()  ── NativeMatch ──> ExtensionFileLoader
//!               │                                   ├── temp file (tempfile)
//!               │                                   └── NativeLoader (libloading)
//!               └──────────────── NoMatch ──────> SourceArchiveFinder
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zipext::{hooks, Importer, ModuleRegistry, PathHooks};
//!
//! zipext::install()?;
//!
//! let hooks = Arc::new(PathHooks::with_hooks(hooks::global().snapshot()));
//! let importer = Importer::new(hooks, Arc::new(ModuleRegistry::new()));
//! importer.prepend_path("/srv/app/bundle.zip");
//! let module = importer.import_module("pkg.fast")?;
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod finder;
pub mod hooks;
pub mod import;
pub mod loader;
pub mod module;
pub mod native;
pub mod resolver;
pub mod source;
pub mod suffix;

pub use archive::{split_archive_path, ArchiveCache, ArchiveReader, ZipArchiveReader};
pub use config::ImportConfig;
pub use error::{Error, Result};
pub use finder::{ExtensionArchiveFinder, ExtensionArchiveHook, FindResult, FinderRef, PathEntryFinder};
pub use hooks::{install, uninstall, HookRef, HookRegistration, PathHook, PathHooks};
pub use import::Importer;
pub use loader::{ExtensionFileLoader, ExtractedPayload, LoadState, Loader, LoaderRef};
pub use module::{Module, ModuleRef, ModuleRegistry};
pub use native::{DylibLoader, NativeLoader};
pub use resolver::{resolve, ArchiveEntryMatch, Resolution};
pub use source::{ArchiveSourceLoader, SourceArchiveFinder, SourceArchiveHook};
pub use suffix::{SuffixEntry, SuffixKind, SuffixTable};
