//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use zip::write::SimpleFileOptions;

use zipext::{
    ArchiveCache, Error, ExtensionArchiveHook, HookRef, HookRegistration, ImportConfig, Importer,
    Module, ModuleRef, ModuleRegistry, NativeLoader, PathHooks, Result, SourceArchiveHook,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Write a zip at `dir/name` holding `entries`.
pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (entry, data) in entries {
        writer.start_file(*entry, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Native loader that never touches the platform loader.
///
/// It registers a bare module like a real init would, records the real
/// path and bytes it was given, and fails for leaf names starting with
/// `bad` after registering.
#[derive(Debug, Default)]
pub struct FakeNative {
    pub loads: Mutex<Vec<(String, PathBuf, Vec<u8>)>>,
}

impl FakeNative {
    pub fn real_path_of(&self, name: &str) -> Option<PathBuf> {
        self.loads
            .lock()
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, p, _)| p.clone())
    }
}

impl NativeLoader for FakeNative {
    fn load(&self, path: &Path, fullname: &str, modules: &ModuleRegistry) -> Result<ModuleRef> {
        let data = std::fs::read(path)?;
        self.loads
            .lock()
            .push((fullname.to_string(), path.to_path_buf(), data));

        let module = Module::new(fullname).into_ref();
        modules.insert(fullname, module.clone());

        let leaf = fullname.rsplit('.').next().unwrap_or(fullname);
        if leaf.starts_with("bad") {
            return Err(Error::NativeLoad {
                name: fullname.to_string(),
                reason: "init returned -1".to_string(),
            });
        }
        Ok(module)
    }
}

pub fn test_config() -> ImportConfig {
    ImportConfig {
        extension_suffixes: vec![".so".to_string()],
        ..ImportConfig::default()
    }
}

/// A private hook list with the baseline hook, and the registration that
/// swaps in the native-aware hook backed by `native`.
pub struct Harness {
    pub hooks: Arc<PathHooks>,
    pub registration: HookRegistration,
    pub importer: Importer,
    pub native: Arc<FakeNative>,
}

impl Harness {
    pub fn new() -> Self {
        let config = Arc::new(test_config());
        let archives = Arc::new(ArchiveCache::new());
        let native = Arc::new(FakeNative::default());

        let baseline: HookRef = Arc::new(SourceArchiveHook::new(archives.clone(), config.clone()));
        let extension: HookRef = Arc::new(ExtensionArchiveHook::new(
            archives,
            config,
            native.clone(),
        ));

        let hooks = Arc::new(PathHooks::with_hooks(vec![baseline.clone()]));
        let importer = Importer::new(hooks.clone(), Arc::new(ModuleRegistry::new()));

        Self {
            hooks,
            registration: HookRegistration::new(baseline, extension),
            importer,
            native,
        }
    }

    pub fn installed() -> Self {
        let harness = Self::new();
        harness.registration.install(&harness.hooks).unwrap();
        harness
    }
}
