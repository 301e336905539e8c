//! Path resolution for matched directives.

use crate::fs::{ProcessWorkDir, WorkDir};
use crate::{ReincError, Result, RuleMode};
use std::path::{Component, Path, PathBuf};

/// Turns a referenced path into a validated absolute path.
pub struct PathResolver {
    root_dir: Option<PathBuf>,
    work_dir: Box<dyn WorkDir>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver {
    /// Resolver without a sandbox, using the process working directory.
    pub fn new() -> Self {
        Self {
            root_dir: None,
            work_dir: Box::new(ProcessWorkDir),
        }
    }

    /// Restrict resolved paths to `root` and its descendants.
    ///
    /// A relative root is taken against the working directory at resolution
    /// time.
    pub fn with_root_dir(mut self, root: impl AsRef<Path>) -> Self {
        self.root_dir = Some(root.as_ref().to_path_buf());
        self
    }

    /// Replace the working directory source.
    pub fn with_work_dir(mut self, work_dir: impl WorkDir + 'static) -> Self {
        self.work_dir = Box::new(work_dir);
        self
    }

    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }

    /// Resolve `candidate` found in the source at `current`.
    ///
    /// `current` is `None` for stdin-like input, in which case relative paths
    /// resolve against the working directory whatever the mode.
    pub fn resolve(
        &self,
        candidate: &Path,
        current: Option<&Path>,
        mode: RuleMode,
    ) -> Result<PathBuf> {
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            let base = match (mode, current) {
                (RuleMode::WorkDir, _) | (_, None) => self.current_dir()?,
                (RuleMode::Default | RuleMode::FileDir, Some(current)) => current
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
            };
            base.join(candidate)
        };

        let resolved = normalize(&self.absolute(joined)?);

        if let Some(root) = &self.root_dir {
            let root = normalize(&self.absolute(root.clone())?);
            if !resolved.starts_with(&root) {
                return Err(ReincError::SandboxViolation(resolved));
            }
        }

        Ok(resolved)
    }

    fn absolute(&self, path: PathBuf) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.current_dir()?.join(path))
        }
    }

    fn current_dir(&self) -> Result<PathBuf> {
        self.work_dir
            .current_dir()
            .map_err(|e| ReincError::PathResolution(e.to_string()))
    }
}

/// Lexically remove `.` and `..` components.
///
/// `..` at the root stays at the root; symlinks are not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    out
}
