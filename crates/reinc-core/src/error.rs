//! Error types for reinc.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reinc operations.
pub type Result<T> = std::result::Result<T, ReincError>;

/// Main error type for the inclusion engine.
#[derive(Debug, Error)]
pub enum ReincError {
    /// A rule pattern failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// A rule names a resolution mode that does not exist.
    #[error("Invalid mode: {0}")]
    PathMode(String),

    /// The base directory for a relative path could not be computed.
    #[error("Path resolution error: {0}")]
    PathResolution(String),

    /// The resolved path lies outside the configured root directory.
    #[error("Banned path: {}", .0.display())]
    SandboxViolation(PathBuf),

    /// The nesting ceiling was exceeded before scanning a source.
    #[error("Too many levels of recursion: {0}")]
    RecursionDepthExceeded(usize),

    /// An included file could not be opened.
    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or rules file is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No built-in preset has the requested name.
    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ReincError {
    /// Structural errors abort an expansion regardless of a rule's
    /// ignore-error policy.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ReincError::Pattern(_)
                | ReincError::PathMode(_)
                | ReincError::RecursionDepthExceeded(_)
        )
    }
}
