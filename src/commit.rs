//! Commit: replaying a file's staged edits against freshly read content.
//!
//! Line edits are replayed as a first-occurrence substring replacement of the
//! recorded old line with the recorded new line over the *entire* content.
//! They are not positioned by line number, so when the old line text also
//! appears earlier in the file, the earlier occurrence is the one replaced.

use crate::error::ReplaceError;
use crate::staging::{Granularity, Ledger, ReplaceMode, StagedEdit};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A file's staged edits, which are all of one granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEdits<'a> {
    Untouched,
    WholeFile(Vec<&'a StagedEdit>),
    Lines(Vec<&'a StagedEdit>),
}

impl<'a> FileEdits<'a> {
    /// Split a file's ledger entries by granularity, rejecting a mix.
    pub fn partition(
        file: &Path,
        entries: impl IntoIterator<Item = &'a StagedEdit>,
    ) -> Result<Self, ReplaceError> {
        let (lines, whole_file): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|edit| edit.granularity() == Granularity::Line);

        match (whole_file.is_empty(), lines.is_empty()) {
            (true, true) => Ok(FileEdits::Untouched),
            (false, true) => Ok(FileEdits::WholeFile(whole_file)),
            (true, false) => Ok(FileEdits::Lines(lines)),
            (false, false) => Err(ReplaceError::MixedGranularity {
                file: file.to_path_buf(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FileEdits::Untouched => 0,
            FileEdits::WholeFile(edits) | FileEdits::Lines(edits) => edits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replay the edits, in staging order, against `content`.
    pub fn replay(&self, file: &Path, content: &str) -> String {
        let mut output = content.to_string();
        match self {
            FileEdits::Untouched => {}
            FileEdits::Lines(edits) => {
                for edit in edits {
                    if !output.contains(edit.old.as_str()) {
                        tracing::warn!(
                            file = %file.display(),
                            line = ?edit.scope.line_number(),
                            "staged line text not found at commit, edit has no effect"
                        );
                        continue;
                    }
                    output = output.replacen(edit.old.as_str(), &edit.new, 1);
                }
            }
            FileEdits::WholeFile(edits) => {
                for edit in edits {
                    output = match edit.mode {
                        ReplaceMode::FirstOccurrence | ReplaceMode::AllOccurrences => {
                            edit.mode.apply(&output, &edit.old, &edit.new)
                        }
                        ReplaceMode::WholeLine => {
                            tracing::warn!(
                                file = %file.display(),
                                "whole-line mode staged at file scope, edit skipped"
                            );
                            continue;
                        }
                    };
                }
            }
        }
        output
    }
}

/// What happened to one file during a commit or preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub file: PathBuf,
    /// Granularity of the replayed edits; `None` when nothing was staged.
    pub granularity: Option<Granularity>,
    pub edits: usize,
    pub changed: bool,
    /// Final content. Only kept by previews.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub files: Vec<FileOutcome>,
}

impl CommitReport {
    pub fn changed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|outcome| outcome.changed)
    }

    pub fn total_edits(&self) -> usize {
        self.files.iter().map(|outcome| outcome.edits).sum()
    }
}

/// Resolve one file: partition its ledger entries and replay them against
/// `content`. Returns the outcome and the final content.
pub fn resolve_file(
    ledger: &Ledger,
    file: &Path,
    content: &str,
) -> Result<(FileOutcome, String), ReplaceError> {
    let edits = FileEdits::partition(file, ledger.for_file(file))?;
    let output = edits.replay(file, content);

    let granularity = match &edits {
        FileEdits::Untouched => None,
        FileEdits::WholeFile(_) => Some(Granularity::WholeFile),
        FileEdits::Lines(_) => Some(Granularity::Line),
    };
    tracing::debug!(file = %file.display(), edits = edits.len(), "replayed staged edits");

    let outcome = FileOutcome {
        file: file.to_path_buf(),
        granularity,
        edits: edits.len(),
        changed: output != content,
        content: None,
    };
    Ok((outcome, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::{EditRequest, EditScope, Stager};

    const FILE: &str = "notes.txt";

    fn stage_line(stager: &mut Stager, n: usize, line: &str, search: &str, new: &str) {
        stager
            .stage(EditRequest::line(
                Path::new(FILE),
                n,
                line,
                search,
                new,
                ReplaceMode::FirstOccurrence,
            ))
            .unwrap();
    }

    fn stage_file(stager: &mut Stager, search: &str, new: &str, mode: ReplaceMode) {
        stager
            .stage(EditRequest::whole_file(Path::new(FILE), search, new, mode))
            .unwrap();
    }

    #[test]
    fn test_partition_untouched() {
        let ledger = Ledger::default();
        let edits = FileEdits::partition(Path::new(FILE), ledger.for_file(Path::new(FILE))).unwrap();
        assert_eq!(edits, FileEdits::Untouched);
        assert_eq!(edits.replay(Path::new(FILE), "same"), "same");
    }

    #[test]
    fn test_partition_rejects_mixed_granularity() {
        let mut stager = Stager::new();
        stage_line(&mut stager, 1, "first line", "first", "FIRST");
        stage_file(&mut stager, "first", "FIRST", ReplaceMode::FirstOccurrence);

        let result = FileEdits::partition(Path::new(FILE), stager.ledger().for_file(Path::new(FILE)));
        assert!(matches!(
            result,
            Err(ReplaceError::MixedGranularity { ref file }) if file == Path::new(FILE)
        ));
    }

    #[test]
    fn test_whole_file_replay_modes() {
        let mut stager = Stager::new();
        stage_file(&mut stager, "a", "b", ReplaceMode::FirstOccurrence);
        stage_file(&mut stager, "c", "d", ReplaceMode::AllOccurrences);

        let (outcome, output) = resolve_file(stager.ledger(), Path::new(FILE), "a a c c").unwrap();
        assert_eq!(output, "b a d d");
        assert_eq!(outcome.edits, 2);
        assert_eq!(outcome.granularity, Some(Granularity::WholeFile));
        assert!(outcome.changed);
    }

    #[test]
    fn test_whole_file_replay_is_sequential() {
        let mut stager = Stager::new();
        stage_file(&mut stager, "a", "b", ReplaceMode::AllOccurrences);
        stage_file(&mut stager, "b", "c", ReplaceMode::AllOccurrences);

        let (_, output) = resolve_file(stager.ledger(), Path::new(FILE), "ab").unwrap();
        assert_eq!(output, "cc");
    }

    #[test]
    fn test_line_replay_hits_first_matching_text_anywhere() {
        // Line 3 duplicates line 1; staging on line 3 rewrites line 1.
        let content = "dup\nother\ndup";
        let mut stager = Stager::new();
        stage_line(&mut stager, 3, "dup", "dup", "DUP");

        let (_, output) = resolve_file(stager.ledger(), Path::new(FILE), content).unwrap();
        assert_eq!(output, "DUP\nother\ndup");
    }

    #[test]
    fn test_line_replay_missing_old_text_is_noop() {
        let mut stager = Stager::new();
        stage_line(&mut stager, 1, "gone", "gone", "here");

        let (outcome, output) = resolve_file(stager.ledger(), Path::new(FILE), "changed on disk").unwrap();
        assert_eq!(output, "changed on disk");
        assert_eq!(outcome.edits, 1);
        assert!(!outcome.changed);
    }

    #[test]
    fn test_other_files_do_not_leak() {
        let mut stager = Stager::new();
        stager
            .stage(EditRequest::whole_file(
                Path::new("other.txt"),
                "x",
                "y",
                ReplaceMode::AllOccurrences,
            ))
            .unwrap();

        let (outcome, output) = resolve_file(stager.ledger(), Path::new(FILE), "xxx").unwrap();
        assert_eq!(output, "xxx");
        assert_eq!(outcome.granularity, None);
    }

    #[test]
    fn test_whole_line_mode_at_file_scope_is_skipped() {
        let edit = StagedEdit {
            file: PathBuf::from(FILE),
            scope: EditScope::WholeFile,
            mode: ReplaceMode::WholeLine,
            old: "abc".to_string(),
            new: "xyz".to_string(),
        };
        let edits = FileEdits::WholeFile(vec![&edit]);
        assert_eq!(edits.replay(Path::new(FILE), "abc abc"), "abc abc");
    }

    #[test]
    fn test_report_totals() {
        let report = CommitReport {
            files: vec![
                FileOutcome {
                    file: PathBuf::from("a"),
                    granularity: Some(Granularity::Line),
                    edits: 2,
                    changed: true,
                    content: None,
                },
                FileOutcome {
                    file: PathBuf::from("b"),
                    granularity: None,
                    edits: 0,
                    changed: false,
                    content: None,
                },
            ],
        };
        assert_eq!(report.total_edits(), 2);
        assert_eq!(report.changed_files().count(), 1);
    }
}
