//! Error types for archive imports.

/// Errors raised while resolving, extracting or loading archive modules.
///
/// A missing native entry is not an error: resolution reports it as
/// [`crate::resolver::Resolution::NoMatch`] and the caller falls back.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Registration error: {0}")]
    Registration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Native load failed for {name}: {reason}")]
    NativeLoad { name: String, reason: String },

    #[error("Loader for {expected} cannot handle {got}")]
    NameMismatch { expected: String, got: String },

    #[error("No module named {0}")]
    ModuleNotFound(String),

    #[error("{0} is not a package")]
    NotAPackage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
