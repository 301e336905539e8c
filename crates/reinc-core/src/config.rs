//! # reinc Configuration
//!
//! Settings shared by the command line front end and embedders.
//! Values come from defaults, an optional config file and `REINC_*`
//! environment variables, in increasing order of precedence.

use crate::replacer::DEFAULT_MAX_DEPTH;
use crate::{ReincError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name, used for config file and environment lookup.
pub const COMMAND_NAME: &str = "reinc";

/// Rules file read when neither a rules file nor a preset is selected.
pub const DEFAULT_REPLACER_FILE: &str = "reinc-replacer.yml";

/// Global configuration for a reinc run.
///
/// # Example
/// ```rust
/// use reinc_core::ReincConfig;
///
/// let config = ReincConfig::default()
///     .with_preset("sh")
///     .with_max_depth(8);
/// assert_eq!(config.preset.as_deref(), Some("sh"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReincConfig {
    /// Rules file.
    /// Default: reinc-replacer.yml, Env: REINC_REPLACER
    pub replacer: PathBuf,

    /// Built-in preset name, used when no rules file is given explicitly.
    /// Env: REINC_PRESET
    pub preset: Option<String>,

    /// Destination file; stdout when unset.
    /// Env: REINC_OUTPUT
    pub output: Option<PathBuf>,

    /// Log level name (error, warn, info, debug, trace).
    /// Env: REINC_LOG_LEVEL
    pub log_level: Option<String>,

    /// Maximum nesting depth.
    /// Default: 32, Env: REINC_MAX_DEPTH
    pub max_depth: usize,

    /// Directory every included file must live under.
    /// Env: REINC_ROOT_DIR
    pub root_dir: Option<PathBuf>,
}

impl Default for ReincConfig {
    fn default() -> Self {
        Self {
            replacer: PathBuf::from(DEFAULT_REPLACER_FILE),
            preset: None,
            output: None,
            log_level: None,
            max_depth: DEFAULT_MAX_DEPTH,
            root_dir: None,
        }
    }
}

impl ReincConfig {
    /// Create a new config from environment variables.
    /// Falls back to defaults for missing variables.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Overlay `REINC_*` environment variables.
    pub fn merge_env(self) -> Self {
        self.merge_vars(env::vars())
    }

    /// Overlay `REINC_*` entries from an explicit variable list.
    pub fn merge_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value = value.into();
            match key.as_ref() {
                "REINC_REPLACER" => self.replacer = PathBuf::from(value),
                "REINC_PRESET" => self.preset = non_empty(value),
                "REINC_OUTPUT" => self.output = non_empty(value).map(PathBuf::from),
                "REINC_LOG_LEVEL" => self.log_level = non_empty(value),
                "REINC_MAX_DEPTH" => {
                    if let Ok(n) = value.parse() {
                        self.max_depth = n;
                    }
                }
                "REINC_ROOT_DIR" => self.root_dir = non_empty(value).map(PathBuf::from),
                _ => {}
            }
        }
        self
    }

    /// Load a config file. `.json` is decoded as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        decode_file(path.as_ref())
    }

    /// Load `explicit` if given, otherwise the first config file found in
    /// [`ReincConfig::search_paths`], otherwise the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!("Using config file: {}", path.display());
            return Self::from_file(path);
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                debug!("Using config file: {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Candidate config files: `$XDG_CONFIG_HOME/reinc/` first, then `.`.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(conf) = xdg_config_home() {
            dirs.push(conf.join(COMMAND_NAME));
        }
        dirs.push(PathBuf::from("."));

        dirs.iter()
            .flat_map(|dir| {
                ["yml", "yaml", "json"]
                    .iter()
                    .map(move |ext| dir.join(format!("{}.{}", COMMAND_NAME, ext)))
            })
            .collect()
    }

    /// Builder: Set the rules file.
    pub fn with_replacer(mut self, path: impl Into<PathBuf>) -> Self {
        self.replacer = path.into();
        self
    }

    /// Builder: Set the preset.
    pub fn with_preset(mut self, name: impl Into<String>) -> Self {
        self.preset = Some(name.into());
        self
    }

    /// Builder: Set the output file.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Builder: Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Builder: Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder: Set the sandbox root.
    pub fn with_root_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root.into());
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn xdg_config_home() -> Option<PathBuf> {
    match env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")),
    }
}

/// Decode a JSON or YAML file, picking the format from the extension.
pub(crate) fn decode_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ReincError::Config(format!("{}: {}", path.display(), e)))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yaml_ng::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReplacerConfig;

    #[test]
    fn test_default_config() {
        let config = ReincConfig::default();
        assert_eq!(config.replacer, PathBuf::from("reinc-replacer.yml"));
        assert_eq!(config.max_depth, 32);
        assert!(config.preset.is_none());
        assert!(config.root_dir.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ReincConfig::default()
            .with_preset("c")
            .with_output("out.c")
            .with_max_depth(4);

        assert_eq!(config.preset.as_deref(), Some("c"));
        assert_eq!(config.output, Some(PathBuf::from("out.c")));
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn test_merge_vars() {
        let config = ReincConfig::default().merge_vars([
            ("REINC_PRESET", "sh"),
            ("REINC_MAX_DEPTH", "7"),
            ("REINC_ROOT_DIR", "/srv"),
            ("REINC_OUTPUT", ""),
            ("UNRELATED", "x"),
        ]);

        assert_eq!(config.preset.as_deref(), Some("sh"));
        assert_eq!(config.max_depth, 7);
        assert_eq!(config.root_dir, Some(PathBuf::from("/srv")));
        assert!(config.output.is_none());
    }

    #[test]
    fn test_bad_max_depth_is_ignored() {
        let config = ReincConfig::default().merge_vars([("REINC_MAX_DEPTH", "lots")]);
        assert_eq!(config.max_depth, 32);
    }

    #[test]
    fn test_yaml_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reinc.yml");
        std::fs::write(&path, "preset: c\nmax_depth: 5\n").unwrap();

        let config = ReincConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.preset.as_deref(), Some("c"));
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.replacer, PathBuf::from(DEFAULT_REPLACER_FILE));
    }

    #[test]
    fn test_rules_file_formats() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("rules.json");
        std::fs::write(
            &json,
            r#"{"rules": [{"pattern": "inc (\\S+)", "path_format": "$1", "once": true}]}"#,
        )
        .unwrap();
        let from_json = ReplacerConfig::from_file(&json).unwrap();

        let yaml = dir.path().join("rules.yml");
        std::fs::write(
            &yaml,
            "rules:\n  - pattern: 'inc (\\S+)'\n    path_format: $1\n    once: true\n",
        )
        .unwrap();
        let from_yaml = ReplacerConfig::from_file(&yaml).unwrap();

        assert_eq!(from_json, from_yaml);
        assert_eq!(from_json.rules[0].pattern, r"inc (\S+)");
    }

    #[test]
    fn test_missing_file() {
        let err = ReplacerConfig::from_file("/definitely/not/here.yml").unwrap_err();
        assert!(matches!(err, ReincError::Config(_)));
    }

    #[test]
    fn test_search_paths_end_in_cwd() {
        let paths = ReincConfig::search_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from("./reinc.json")));
    }
}
