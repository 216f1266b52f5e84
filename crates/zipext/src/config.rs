//! Import configuration: defaults, environment variables and validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::suffix::platform_extension_suffixes;

/// Default values.
pub mod defaults {
    /// File name marker of a package-init module.
    pub const PACKAGE_INIT: &str = "__init__";
    /// Prefix of extracted temporary files.
    pub const TEMP_PREFIX: &str = "zipext-";
    /// Prefix of the init symbol a native module exports (`<prefix><leaf>`).
    pub const INIT_SYMBOL_PREFIX: &str = "zipext_init_";
    /// Suffixes recognised as text modules.
    pub const SOURCE_SUFFIXES: &[&str] = &[".py"];
}

/// Environment variable names.
pub mod env_vars {
    /// Comma separated list overriding the native suffixes.
    pub const EXTENSION_SUFFIXES: &str = "ZIPEXT_EXTENSION_SUFFIXES";
    /// Directory for extracted temporary files.
    pub const TEMP_DIR: &str = "ZIPEXT_TEMP_DIR";
    pub const INIT_SYMBOL_PREFIX: &str = "ZIPEXT_INIT_SYMBOL_PREFIX";
}

/// Settings shared by the archive finders and the extraction loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Native library suffixes, in probe order.
    pub extension_suffixes: Vec<String>,
    /// Text module suffixes, in probe order.
    pub source_suffixes: Vec<String>,
    /// Where extracted libraries are written. `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,
    pub temp_prefix: String,
    pub init_symbol_prefix: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            extension_suffixes: platform_extension_suffixes(),
            source_suffixes: defaults::SOURCE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            temp_dir: None,
            temp_prefix: defaults::TEMP_PREFIX.to_string(),
            init_symbol_prefix: defaults::INIT_SYMBOL_PREFIX.to_string(),
        }
    }
}

impl ImportConfig {
    /// Build a config from defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(env_vars::EXTENSION_SUFFIXES) {
            config.extension_suffixes = parse_suffix_list(&raw);
        }
        if let Ok(dir) = std::env::var(env_vars::TEMP_DIR) {
            if !dir.is_empty() {
                config.temp_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(prefix) = std::env::var(env_vars::INIT_SYMBOL_PREFIX) {
            config.init_symbol_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extension_suffixes.is_empty() {
            return Err(Error::InvalidConfig(
                "extension_suffixes must not be empty".to_string(),
            ));
        }
        for suffix in self.extension_suffixes.iter().chain(&self.source_suffixes) {
            if !suffix.starts_with('.') || suffix.len() < 2 {
                return Err(Error::InvalidConfig(format!(
                    "suffix {:?} must start with '.'",
                    suffix
                )));
            }
        }
        if self.init_symbol_prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "init_symbol_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_suffix_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
