//! # reinc Core
//!
//! Recursive, rule-driven text inclusion.
//!
//! Input is scanned for directives (substrings matched by a rule's regular
//! expression), each directive is resolved to a file, and that file's own
//! expanded content is spliced into the output in place of the directive.
//!
//! ## Features
//!
//! - Ordered rules with earliest-match selection
//! - File-relative or working-directory-relative resolution
//! - Optional sandbox root for included paths
//! - Per-rule repeat and error policies
//! - Depth-bounded recursion
//!
//! ## Example
//!
//! ```rust,ignore
//! use reinc_core::{preset, Replacer};
//!
//! let replacer = Replacer::from_config(&preset("c")?)?;
//! replacer.replace_file("main.c", &mut std::io::stdout())?;
//! ```

pub mod config;
pub mod error;
pub mod fs;
pub mod preset;
pub mod replacer;
pub mod resolver;
pub mod rule;
pub mod tracker;

pub use config::ReincConfig;
pub use error::{ReincError, Result};
pub use fs::{FileOpener, FixedWorkDir, MemoryFileOpener, OsFileOpener, ProcessWorkDir, WorkDir};
pub use preset::{preset, preset_names, PRESET_NAMES};
pub use replacer::{Replacer, DEFAULT_MAX_DEPTH};
pub use resolver::PathResolver;
pub use rule::{ReplacerConfig, Rule, RuleConfig, RuleMatch, RuleMode, RuleSet};
pub use tracker::InclusionTracker;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        preset, preset_names, InclusionTracker, ReincConfig, ReincError, Replacer, ReplacerConfig,
        Result, Rule, RuleConfig, RuleMode, RuleSet,
    };
}
