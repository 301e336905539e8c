//! Filesystem capabilities consumed by the engine.
//!
//! The replacer never touches the filesystem directly: nested sources are
//! opened through a [`FileOpener`] and the working directory comes from a
//! [`WorkDir`]. The OS-backed implementations are the defaults; the in-memory
//! ones make expansion deterministic for tests and embedding.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Opens included files by absolute path.
pub trait FileOpener: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>>;
}

/// Reports the working directory used by work-dir resolution.
pub trait WorkDir: Send + Sync {
    fn current_dir(&self) -> io::Result<PathBuf>;
}

/// Opens files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileOpener;

impl FileOpener for OsFileOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(File::open(path)?))
    }
}

/// The process working directory, queried on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessWorkDir;

impl WorkDir for ProcessWorkDir {
    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}

/// A working directory that never changes.
#[derive(Debug, Clone)]
pub struct FixedWorkDir(pub PathBuf);

impl WorkDir for FixedWorkDir {
    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// In-memory file table.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileOpener {
    /// Files keyed by absolute path.
    pub files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryFileOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl AsRef<[u8]>) -> Self {
        self.files.insert(path.into(), contents.as_ref().to_vec());
        self
    }
}

impl FileOpener for MemoryFileOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        match self.files.get(path) {
            Some(contents) => Ok(Box::new(Cursor::new(contents.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )),
        }
    }
}
