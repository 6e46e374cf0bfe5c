//! Sessions: resolve files once, stage edits through file or line passes,
//! then commit.
//!
//! ```no_run
//! # fn main() -> Result<(), batch_replace::ReplaceError> {
//! use batch_replace::{FsAccess, Session};
//!
//! let mut session = Session::open(FsAccess::new(".")?, &["docs/**/*.md"])?;
//! session.for_each_line(|line| {
//!     if line.number() == 1 {
//!         line.replace("Draft", "Final")?;
//!     }
//!     Ok(())
//! })?;
//! let report = session.commit()?;
//! println!("{} files changed", report.changed_files().count());
//! # Ok(())
//! # }
//! ```

use crate::commit::{resolve_file, CommitReport};
use crate::error::ReplaceError;
use crate::files::FileAccess;
use crate::lines::{split_lines, Line};
use crate::staging::{EditRequest, Ledger, ReplaceMode, Stager};
use std::path::{Path, PathBuf};

/// Staging state for one batch of edits over a fixed set of files.
///
/// [`commit`](Session::commit) consumes the session, so nothing can be staged
/// once a commit has started.
#[derive(Debug)]
pub struct Session<A: FileAccess> {
    access: A,
    files: Vec<PathBuf>,
    stager: Stager,
}

impl<A: FileAccess> Session<A> {
    /// Resolve `patterns` into the session's file list.
    ///
    /// Fails with [`ReplaceError::NoFilesFound`] when nothing matches.
    pub fn open<S: AsRef<str>>(access: A, patterns: &[S]) -> Result<Self, ReplaceError> {
        let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        let mut files = access.find_files(&patterns)?;
        files.dedup();
        if files.is_empty() {
            return Err(ReplaceError::no_files(&patterns, "patterns matched nothing"));
        }

        tracing::info!(files = files.len(), "opened replacement session");
        Ok(Self {
            access,
            files,
            stager: Stager::new(),
        })
    }

    /// The resolved files, in resolution order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Every edit staged so far, in staging order.
    pub fn staged(&self) -> &Ledger {
        self.stager.ledger()
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    /// Hand each file's full content to `callback` with whole-file edit
    /// functions.
    pub fn for_each_file<F>(&mut self, mut callback: F) -> Result<(), ReplaceError>
    where
        F: FnMut(&mut FileScope<'_>) -> Result<(), ReplaceError>,
    {
        let Self {
            access,
            files,
            stager,
        } = self;

        for file in files.iter() {
            let content = access.read_file(file)?;
            let mut scope = FileScope {
                file,
                content: &content,
                stager: &mut *stager,
            };
            callback(&mut scope)?;
        }
        Ok(())
    }

    /// Hand every line of every file to `callback` with line edit functions.
    pub fn for_each_line<F>(&mut self, mut callback: F) -> Result<(), ReplaceError>
    where
        F: FnMut(&mut LineScope<'_>) -> Result<(), ReplaceError>,
    {
        let Self {
            access,
            files,
            stager,
        } = self;

        for file in files.iter() {
            let content = access.read_file(file)?;
            for line in split_lines(&content) {
                let mut scope = LineScope {
                    file,
                    content: &content,
                    line,
                    stager: &mut *stager,
                };
                callback(&mut scope)?;
            }
        }
        Ok(())
    }

    /// Compute every file's final content without writing anything.
    ///
    /// Reads fresh content and fails exactly where [`commit`](Session::commit)
    /// would, except for write failures.
    pub fn preview(&self) -> Result<CommitReport, ReplaceError> {
        let mut report = CommitReport::default();
        for file in &self.files {
            let content = self.access.read_file(file)?;
            let (mut outcome, output) = resolve_file(self.stager.ledger(), file, &content)?;
            outcome.content = Some(output);
            report.files.push(outcome);
        }
        Ok(report)
    }

    /// Replay staged edits into every file, one file at a time.
    ///
    /// Each file is re-read, resolved, and written before the next is touched.
    /// The first error stops the loop; files already written stay written.
    pub fn commit(self) -> Result<CommitReport, ReplaceError> {
        let mut report = CommitReport::default();
        for file in &self.files {
            let content = self.access.read_file(file)?;
            let (outcome, output) = resolve_file(self.stager.ledger(), file, &content)?;
            self.access.write_file(file, &output)?;

            tracing::info!(
                file = %file.display(),
                edits = outcome.edits,
                changed = outcome.changed,
                "committed file"
            );
            report.files.push(outcome);
        }
        Ok(report)
    }
}

/// Whole-file view handed to [`Session::for_each_file`] callbacks.
pub struct FileScope<'s> {
    file: &'s Path,
    content: &'s str,
    stager: &'s mut Stager,
}

impl FileScope<'_> {
    pub fn file(&self) -> &Path {
        self.file
    }

    /// Content as read at the start of this file's callback.
    pub fn content(&self) -> &str {
        self.content
    }

    /// Stage a replacement of the first occurrence of `search` in the file.
    ///
    /// Nothing is matched until commit.
    pub fn replace(&mut self, search: &str, replacement: &str) -> Result<(), ReplaceError> {
        self.stage(search, replacement, ReplaceMode::FirstOccurrence)
    }

    /// Stage a replacement of every occurrence of `search` in the file.
    pub fn replace_all(&mut self, search: &str, replacement: &str) -> Result<(), ReplaceError> {
        self.stage(search, replacement, ReplaceMode::AllOccurrences)
    }

    fn stage(
        &mut self,
        search: &str,
        replacement: &str,
        mode: ReplaceMode,
    ) -> Result<(), ReplaceError> {
        self.stager
            .stage(EditRequest::whole_file(self.file, search, replacement, mode))
            .map(|_| ())
    }
}

/// Single-line view handed to [`Session::for_each_line`] callbacks.
pub struct LineScope<'s> {
    file: &'s Path,
    content: &'s str,
    line: Line<'s>,
    stager: &'s mut Stager,
}

impl LineScope<'_> {
    /// The line's text as read, before any staged edit.
    pub fn line(&self) -> &str {
        self.line.text
    }

    /// 1-based line number.
    pub fn number(&self) -> usize {
        self.line.number
    }

    pub fn file(&self) -> &Path {
        self.file
    }

    /// Full file content the line was taken from.
    pub fn content(&self) -> &str {
        self.content
    }

    /// Stage a first-occurrence replacement on this line.
    ///
    /// Returns `false`, staging nothing, when `search` is not in the line as
    /// read. Earlier edits to this line do not change that check, but the
    /// replacement itself applies to the line as those edits left it.
    pub fn replace(&mut self, search: &str, replacement: &str) -> Result<bool, ReplaceError> {
        self.stage(search, replacement, ReplaceMode::FirstOccurrence)
    }

    /// Stage an every-occurrence replacement on this line.
    ///
    /// Gated the same way as [`replace`](LineScope::replace).
    pub fn replace_all(&mut self, search: &str, replacement: &str) -> Result<bool, ReplaceError> {
        self.stage(search, replacement, ReplaceMode::AllOccurrences)
    }

    /// Stage a rewrite of the whole line, discarding earlier edits to it.
    pub fn replace_whole_line(&mut self, replacement: &str) -> Result<(), ReplaceError> {
        self.stage("", replacement, ReplaceMode::WholeLine).map(|_| ())
    }

    fn stage(
        &mut self,
        search: &str,
        replacement: &str,
        mode: ReplaceMode,
    ) -> Result<bool, ReplaceError> {
        self.stager.stage(EditRequest::line(
            self.file,
            self.line.number,
            self.line.text,
            search,
            replacement,
            mode,
        ))
    }
}
