use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Absolute paths already spliced into one expansion.
///
/// A single tracker is shared by every nested source of a top-level call, so a
/// file included by one branch is visible to all later branches.
#[derive(Debug, Clone, Default)]
pub struct InclusionTracker {
    paths: HashSet<PathBuf>,
}

impl InclusionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Record a path. Returns `false` if it was already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}
