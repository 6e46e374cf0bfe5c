//! File access: resolving patterns to files, reading, and writing.
//!
//! The staging and commit engines only ever touch files through
//! [`FileAccess`]. [`FsAccess`] is the on-disk implementation; [`MemoryFiles`]
//! keeps everything in memory and is what the test suite stages against.

use crate::error::ReplaceError;
use crate::safety::{RootGuard, SafetyError};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The three operations the engine needs from its environment.
pub trait FileAccess {
    /// Resolve patterns to a concrete list of files.
    ///
    /// An empty result is not an error here; the session decides that.
    fn find_files(&self, patterns: &[String]) -> Result<Vec<PathBuf>, ReplaceError>;

    fn read_file(&self, path: &Path) -> Result<String, ReplaceError>;

    fn write_file(&self, path: &Path, content: &str) -> Result<(), ReplaceError>;
}

impl<T: FileAccess + ?Sized> FileAccess for &T {
    fn find_files(&self, patterns: &[String]) -> Result<Vec<PathBuf>, ReplaceError> {
        (**self).find_files(patterns)
    }

    fn read_file(&self, path: &Path) -> Result<String, ReplaceError> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), ReplaceError> {
        (**self).write_file(path, content)
    }
}

/// Compiled include/exclude globs.
///
/// Patterns starting with `!` exclude. `*` does not cross `/`; use `**`
/// for recursive matches. A leading `./` is ignored.
#[derive(Debug, Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: GlobSet,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Result<Self, ReplaceError> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        let mut includes = 0usize;

        for raw in patterns {
            let (negated, pattern) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let pattern = pattern.trim_start_matches("./");
            if pattern.is_empty() {
                continue;
            }

            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| ReplaceError::no_files(patterns, e.to_string()))?;

            if negated {
                exclude.add(glob);
            } else {
                include.add(glob);
                includes += 1;
            }
        }

        if includes == 0 {
            return Err(ReplaceError::no_files(patterns, "no include patterns given"));
        }

        let include = include
            .build()
            .map_err(|e| ReplaceError::no_files(patterns, e.to_string()))?;
        let exclude = exclude
            .build()
            .map_err(|e| ReplaceError::no_files(patterns, e.to_string()))?;

        Ok(Self { include, exclude })
    }

    /// Match a `/`-separated path relative to the resolution root.
    pub fn matches(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

/// On-disk file access confined to a root directory.
#[derive(Debug, Clone)]
pub struct FsAccess {
    guard: RootGuard,
}

impl FsAccess {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ReplaceError> {
        Ok(Self {
            guard: RootGuard::new(root)?,
        })
    }

    pub fn root(&self) -> &Path {
        self.guard.root()
    }

    /// Validate `path` against the root. A path that cannot be resolved at
    /// all is an I/O failure of the operation, built by `io_error`.
    fn checked(
        &self,
        path: &Path,
        io_error: impl FnOnce(PathBuf, std::io::Error) -> ReplaceError,
    ) -> Result<PathBuf, ReplaceError> {
        match self.guard.validate_path(path) {
            Ok(path) => Ok(path),
            Err(SafetyError::Canonicalize { path, source }) => Err(io_error(path, source)),
            Err(e) => Err(e.into()),
        }
    }
}

impl FileAccess for FsAccess {
    fn find_files(&self, patterns: &[String]) -> Result<Vec<PathBuf>, ReplaceError> {
        let set = PatternSet::new(patterns)?;
        let root = self.guard.root();

        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(RootGuard::is_forbidden_name)
        });

        let mut files = BTreeSet::new();
        for entry in walker {
            let entry = entry.map_err(|e| ReplaceError::no_files(patterns, e.to_string()))?;
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if !set.matches(relative) {
                continue;
            }

            if let Err(e) = self.guard.validate_path(entry.path()) {
                tracing::debug!(path = %entry.path().display(), error = %e, "skipping rejected match");
                continue;
            }
            files.insert(entry.path().to_path_buf());
        }

        tracing::debug!(root = %root.display(), count = files.len(), "resolved file patterns");
        Ok(files.into_iter().collect())
    }

    fn read_file(&self, path: &Path) -> Result<String, ReplaceError> {
        let path = self.checked(path, |path, source| ReplaceError::FileRead { path, source })?;
        fs::read_to_string(&path).map_err(|source| ReplaceError::FileRead { path, source })
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), ReplaceError> {
        let path = self.checked(path, |path, source| ReplaceError::FileWrite { path, source })?;
        atomic_write(&path, content.as_bytes())
            .map_err(|source| ReplaceError::FileWrite { path, source })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The original file's permissions are carried over to the replacement.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;

    let permissions = fs::metadata(path).map(|m| m.permissions()).ok();

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// In-memory files keyed by path.
///
/// Reads and writes can be made to fail per path to exercise error handling.
#[derive(Debug, Default)]
pub struct MemoryFiles {
    files: RefCell<BTreeMap<PathBuf, String>>,
    writes: RefCell<Vec<PathBuf>>,
    failing_reads: BTreeSet<PathBuf>,
    failing_writes: BTreeSet<PathBuf>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), content.into());
        self
    }

    /// Make every read of `path` fail.
    pub fn fail_reads_of(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing_reads.insert(path.into());
        self
    }

    /// Make every write to `path` fail.
    pub fn fail_writes_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing_writes.insert(path.into());
        self
    }

    /// Replace a file's content, as an outside writer would.
    pub fn set(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), content.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    /// Paths written so far, in write order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.borrow().clone()
    }
}

impl FileAccess for MemoryFiles {
    fn find_files(&self, patterns: &[String]) -> Result<Vec<PathBuf>, ReplaceError> {
        let set = PatternSet::new(patterns)?;
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|path| set.matches(path))
            .cloned()
            .collect())
    }

    fn read_file(&self, path: &Path) -> Result<String, ReplaceError> {
        if self.failing_reads.contains(path) {
            return Err(ReplaceError::FileRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected read failure"),
            });
        }
        self.get(path).ok_or_else(|| ReplaceError::FileRead {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), ReplaceError> {
        if self.failing_writes.contains(path) {
            return Err(ReplaceError::FileWrite {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"),
            });
        }
        self.set(path, content);
        self.writes.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}
