//! Replacer - the scan/resolve/recurse loop.
//!
//! A [`Replacer`] holds everything shared by one expansion tree: the rule set,
//! the path resolver, the file opener and the depth ceiling. Each source that
//! gets scanned (the top-level input or one included file) is handled by a
//! short-lived `Expansion` that borrows the shared sink and inclusion tracker
//! from its parent.

use crate::fs::{FileOpener, OsFileOpener, WorkDir};
use crate::{InclusionTracker, PathResolver, ReincError, ReplacerConfig, Result, Rule, RuleSet};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Nesting ceiling used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Recursive inclusion engine.
///
/// # Example
///
/// ```rust
/// use reinc_core::{Replacer, ReplacerConfig, RuleConfig};
///
/// let config = ReplacerConfig::new(vec![RuleConfig::new(r"@missing", "/nonexistent")
///     .with_ignore_error(true)]);
/// let replacer = Replacer::from_config(&config)?;
///
/// let output = replacer.replace_to_vec(b"keep @missing as is")?;
/// assert_eq!(output, b"keep @missing as is");
/// # Ok::<(), reinc_core::ReincError>(())
/// ```
pub struct Replacer {
    rules: RuleSet,
    resolver: PathResolver,
    opener: Box<dyn FileOpener>,
    max_depth: usize,
}

impl Replacer {
    /// Create a replacer backed by the local filesystem.
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            resolver: PathResolver::new(),
            opener: Box::new(OsFileOpener),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Compile a rule config into a replacer.
    pub fn from_config(config: &ReplacerConfig) -> Result<Self> {
        Ok(Self::new(RuleSet::from_config(config)?))
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Only allow inclusion of files below `root`.
    pub fn with_root_dir(mut self, root: impl AsRef<Path>) -> Self {
        self.resolver = self.resolver.with_root_dir(root);
        self
    }

    /// Replace the working directory source used by work-dir rules.
    pub fn with_work_dir(mut self, work_dir: impl WorkDir + 'static) -> Self {
        self.resolver = self.resolver.with_work_dir(work_dir);
        self
    }

    /// Replace the opener used for nested sources.
    pub fn with_opener(mut self, opener: impl FileOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Expand stdin-like input that has no path of its own.
    ///
    /// Returns the number of input bytes consumed.
    pub fn replace<R, W>(&self, reader: R, writer: &mut W) -> Result<usize>
    where
        R: Read,
        W: Write + ?Sized,
    {
        let mut tracker = InclusionTracker::new();
        self.replace_with(reader, None, writer, &mut tracker)
    }

    /// Expand a file, resolving its file-dir directives against its location.
    pub fn replace_file<W>(&self, path: impl AsRef<Path>, writer: &mut W) -> Result<usize>
    where
        W: Write + ?Sized,
    {
        let path = path.as_ref();
        let reader = self.opener.open(path).map_err(|source| ReincError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut tracker = InclusionTracker::new();
        self.replace_with(reader, Some(path), writer, &mut tracker)
    }

    /// Expand `reader` with an explicit current path and tracker.
    ///
    /// Output is written as it is produced; on error, whatever was already
    /// written stays in `writer`.
    #[instrument(skip(self, reader, writer, tracker))]
    pub fn replace_with<R, W>(
        &self,
        mut reader: R,
        current_path: Option<&Path>,
        writer: &mut W,
        tracker: &mut InclusionTracker,
    ) -> Result<usize>
    where
        R: Read,
        W: Write + ?Sized,
    {
        let mut expansion = Expansion {
            engine: self,
            writer,
            included: tracker,
            path: current_path.map(Path::to_path_buf),
            depth: 0,
        };
        expansion.run(&mut reader)
    }

    /// Expand an in-memory buffer.
    pub fn replace_to_vec(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len());
        self.replace(input, &mut output)?;
        Ok(output)
    }
}

/// Outcome of one scan step.
enum Step {
    /// A directive was handled; scanning resumes at this offset.
    Continue(usize),
    /// No directive left; the whole buffer was consumed.
    Done(usize),
}

/// Scan state for a single source.
struct Expansion<'a, W: Write + ?Sized> {
    engine: &'a Replacer,
    writer: &'a mut W,
    included: &'a mut InclusionTracker,
    path: Option<PathBuf>,
    depth: usize,
}

impl<W: Write + ?Sized> Expansion<'_, W> {
    fn run(&mut self, reader: &mut dyn Read) -> Result<usize> {
        if self.depth > self.engine.max_depth {
            warn!("Recursion limit reached at depth {}", self.depth);
            return Err(ReincError::RecursionDepthExceeded(self.depth));
        }

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let mut offset = 0;
        loop {
            match self.replace_first(&buf, offset)? {
                Step::Continue(next) => offset = next,
                Step::Done(end) => return Ok(end),
            }
        }
    }

    fn replace_first(&mut self, buf: &[u8], offset: usize) -> Result<Step> {
        let engine = self.engine;

        let Some(found) = engine.rules.find_earliest(&buf[offset..]) else {
            self.writer.write_all(&buf[offset..])?;
            return Ok(Step::Done(buf.len()));
        };

        let start = offset + found.range.start;
        let end = offset + found.range.end;
        let rule = found.rule;
        let matched = &buf[start..end];

        self.writer.write_all(&buf[offset..start])?;
        debug!(
            "Rule {} matched {:?} at {}",
            found.index,
            String::from_utf8_lossy(matched),
            start
        );

        let target = rule.target_path(matched);
        match engine
            .resolver
            .resolve(&target, self.path.as_deref(), rule.mode())
        {
            Ok(resolved) => {
                if self.included.contains(&resolved) && rule.is_once(matched) {
                    debug!("Already included, echoing directive: {}", resolved.display());
                    self.writer.write_all(matched)?;
                } else {
                    match self.include(&resolved) {
                        Ok(()) => {
                            self.included.insert(resolved);
                        }
                        Err(e) => self.recover(rule, matched, e)?,
                    }
                }
            }
            Err(e) => self.recover(rule, matched, e)?,
        }

        Ok(Step::Continue(end))
    }

    fn include(&mut self, path: &Path) -> Result<()> {
        debug!("Including {} at depth {}", path.display(), self.depth + 1);

        let mut reader = self
            .engine
            .opener
            .open(path)
            .map_err(|source| ReincError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut child = Expansion {
            engine: self.engine,
            writer: &mut *self.writer,
            included: &mut *self.included,
            path: Some(path.to_path_buf()),
            depth: self.depth + 1,
        };
        child.run(&mut reader)?;
        Ok(())
    }

    /// Echo the directive if the rule swallows `err`, otherwise propagate it.
    fn recover(&mut self, rule: &Rule, matched: &[u8], err: ReincError) -> Result<()> {
        if err.is_structural() || !rule.ignores_error(matched) {
            return Err(err);
        }

        warn!(
            "Keeping directive {:?}: {}",
            String::from_utf8_lossy(matched),
            err
        );
        self.writer.write_all(matched)?;
        Ok(())
    }
}
