//! Directive rules.
//!
//! A rule pairs a byte-oriented regular expression with the templates that
//! turn a matched directive into a referenced path and decide how repeats and
//! failures are handled. Templates use the regex crate's expansion syntax:
//! `$1`, `${1}` and `${name}` refer to capture groups of the match.

use crate::{ReincError, Result};
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Base directory policy for relative paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleMode {
    /// Same as [`RuleMode::FileDir`].
    #[default]
    Default,
    /// Relative to the directory of the file containing the directive.
    FileDir,
    /// Relative to the process working directory.
    WorkDir,
}

impl RuleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleMode::Default => "",
            RuleMode::FileDir => "filedir",
            RuleMode::WorkDir => "workdir",
        }
    }
}

impl FromStr for RuleMode {
    type Err = ReincError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(RuleMode::Default),
            "filedir" => Ok(RuleMode::FileDir),
            "workdir" => Ok(RuleMode::WorkDir),
            other => Err(ReincError::PathMode(other.to_string())),
        }
    }
}

impl fmt::Display for RuleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized form of a single rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Regular expression identifying a directive.
    pub pattern: String,

    /// Template producing the referenced path from the match.
    #[serde(default)]
    pub path_format: String,

    /// Echo a directive instead of expanding it when its file was already included.
    #[serde(default)]
    pub once: bool,

    /// Template form of `once`; a non-empty expansion counts as true.
    #[serde(default)]
    pub once_format: String,

    /// Echo a directive instead of failing when it cannot be resolved or included.
    #[serde(default)]
    pub ignore_error: bool,

    /// Template form of `ignore_error`; a non-empty expansion counts as true.
    #[serde(default)]
    pub ignore_error_format: String,

    /// One of `""`, `"filedir"` or `"workdir"`.
    #[serde(default)]
    pub mode: String,
}

impl RuleConfig {
    /// Create a rule config with the given pattern and path template.
    pub fn new(pattern: impl Into<String>, path_format: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            path_format: path_format.into(),
            ..Self::default()
        }
    }

    /// Set the once flag.
    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Set the once template.
    pub fn with_once_format(mut self, format: impl Into<String>) -> Self {
        self.once_format = format.into();
        self
    }

    /// Set the ignore-error flag.
    pub fn with_ignore_error(mut self, ignore: bool) -> Self {
        self.ignore_error = ignore;
        self
    }

    /// Set the ignore-error template.
    pub fn with_ignore_error_format(mut self, format: impl Into<String>) -> Self {
        self.ignore_error_format = format.into();
        self
    }

    /// Set the resolution mode.
    pub fn with_mode(mut self, mode: RuleMode) -> Self {
        self.mode = mode.as_str().to_string();
        self
    }
}

/// Serialized form of an ordered rule list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacerConfig {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl ReplacerConfig {
    /// Create a config from rule configs.
    pub fn new(rules: Vec<RuleConfig>) -> Self {
        Self { rules }
    }

    /// Load a rules file. `.json` files are decoded as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        crate::config::decode_file(path.as_ref())
    }
}

/// A compiled directive rule.
#[derive(Debug, Clone)]
pub struct Rule {
    regex: Regex,
    path_format: Vec<u8>,
    once: bool,
    once_format: Vec<u8>,
    ignore_error: bool,
    ignore_error_format: Vec<u8>,
    mode: RuleMode,
}

impl Rule {
    /// Compile a rule from its config.
    pub fn new(config: &RuleConfig) -> Result<Self> {
        let regex = Regex::new(&config.pattern)?;
        let mode: RuleMode = config.mode.parse()?;

        Ok(Self {
            regex,
            path_format: config.path_format.as_bytes().to_vec(),
            once: config.once,
            once_format: config.once_format.as_bytes().to_vec(),
            ignore_error: config.ignore_error,
            ignore_error_format: config.ignore_error_format.as_bytes().to_vec(),
            mode,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn mode(&self) -> RuleMode {
        self.mode
    }

    /// Locate the first non-empty match in `haystack`.
    ///
    /// Empty matches are skipped so a scan always makes progress.
    pub fn find(&self, haystack: &[u8]) -> Option<Range<usize>> {
        self.regex
            .find_iter(haystack)
            .find(|m| !m.is_empty())
            .map(|m| m.range())
    }

    /// Apply `template` to a matched directive, replacing every match of the
    /// rule's pattern inside it.
    pub fn expand(&self, matched: &[u8], template: &[u8]) -> Vec<u8> {
        self.regex.replace_all(matched, template).into_owned()
    }

    /// The path a matched directive refers to.
    pub fn target_path(&self, matched: &[u8]) -> PathBuf {
        bytes_to_path(self.expand(matched, &self.path_format))
    }

    /// Whether a repeated directive should be echoed rather than expanded.
    pub fn is_once(&self, matched: &[u8]) -> bool {
        self.policy(matched, self.once, &self.once_format)
    }

    /// Whether a failed directive should be echoed rather than aborting.
    pub fn ignores_error(&self, matched: &[u8]) -> bool {
        self.policy(matched, self.ignore_error, &self.ignore_error_format)
    }

    fn policy(&self, matched: &[u8], flag: bool, template: &[u8]) -> bool {
        flag || !self.expand(matched, template).is_empty()
    }
}

#[cfg(unix)]
fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// The winning match of a scan step.
#[derive(Debug, Clone)]
pub struct RuleMatch<'r> {
    /// Position of the rule in its set.
    pub index: usize,
    pub rule: &'r Rule,
    /// Match bounds, relative to the scanned slice.
    pub range: Range<usize>,
}

/// An ordered list of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Compile every rule of a config, failing on the first invalid one.
    pub fn from_config(config: &ReplacerConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(Rule::new)
            .collect::<Result<Vec<_>>>()?;
        debug!("Compiled {} rules", rules.len());
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Find the match that starts earliest in `haystack`.
    ///
    /// When several rules match at the same offset the one registered first wins.
    pub fn find_earliest(&self, haystack: &[u8]) -> Option<RuleMatch<'_>> {
        let mut best: Option<RuleMatch<'_>> = None;

        for (index, rule) in self.rules.iter().enumerate() {
            let Some(range) = rule.find(haystack) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| range.start < b.range.start) {
                best = Some(RuleMatch { index, rule, range });
            }
        }

        best
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}
