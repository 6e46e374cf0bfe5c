//! Replacement staging: the edit ledger and the per-line accumulator.
//!
//! Edits are recorded, never applied, while staging. Whole-file edits store
//! their search and replacement text verbatim and are matched at commit time.
//! Line edits are resolved immediately into full before/after snapshots of the
//! line, so that several edits on one line compose:
//!
//! ```text
//! original "first line"  --replace(first, 1st)-->  "1st line"   ledger: "first line" -> "1st line"
//! accumulated "1st line" --replace(line, LINE)-->  "1st LINE"   ledger: "1st line"   -> "1st LINE"
//! ```
//!
//! # Matching quirk
//!
//! A line edit is gated on the *original* line text, the text the line had
//! when the pass handed it to the callback, while its replacement is computed
//! against the *accumulated* text. A search string that only exists because
//! an earlier edit introduced it is therefore a no-op, and a search string
//! that an earlier edit already removed still stages an (unchanged) snapshot.

use crate::error::ReplaceError;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Whether an edit targets a whole file or one of its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    WholeFile,
    Line,
}

/// What a staged edit is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditScope {
    WholeFile,
    /// 1-based line number
    Line(usize),
}

impl EditScope {
    pub fn granularity(self) -> Granularity {
        match self {
            EditScope::WholeFile => Granularity::WholeFile,
            EditScope::Line(_) => Granularity::Line,
        }
    }

    pub fn line_number(self) -> Option<usize> {
        match self {
            EditScope::WholeFile => None,
            EditScope::Line(n) => Some(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceMode {
    FirstOccurrence,
    AllOccurrences,
    /// Line scope only; ignores the search text.
    WholeLine,
}

impl ReplaceMode {
    /// Literal substitution of `search` in `text`.
    ///
    /// `WholeLine` discards `text` and yields `replacement`.
    pub fn apply(self, text: &str, search: &str, replacement: &str) -> String {
        match self {
            ReplaceMode::FirstOccurrence => text.replacen(search, replacement, 1),
            ReplaceMode::AllOccurrences => text.replace(search, replacement),
            ReplaceMode::WholeLine => replacement.to_string(),
        }
    }
}

/// One recorded edit intent.
///
/// For whole-file edits `old`/`new` are the search and replacement text.
/// For line edits they are the full line before and after the edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedEdit {
    pub file: PathBuf,
    pub scope: EditScope,
    pub mode: ReplaceMode,
    pub old: String,
    pub new: String,
}

impl StagedEdit {
    pub fn granularity(&self) -> Granularity {
        self.scope.granularity()
    }
}

/// A request to stage one edit, as built by the iteration scopes.
#[derive(Debug, Clone, Copy)]
pub struct EditRequest<'a> {
    pub file: &'a Path,
    pub granularity: Granularity,
    /// Original line text; required for line granularity.
    pub line: Option<&'a str>,
    /// 1-based line number; required for line granularity.
    pub line_number: Option<usize>,
    pub search: &'a str,
    pub replacement: &'a str,
    pub mode: ReplaceMode,
}

impl<'a> EditRequest<'a> {
    pub fn whole_file(
        file: &'a Path,
        search: &'a str,
        replacement: &'a str,
        mode: ReplaceMode,
    ) -> Self {
        Self {
            file,
            granularity: Granularity::WholeFile,
            line: None,
            line_number: None,
            search,
            replacement,
            mode,
        }
    }

    pub fn line(
        file: &'a Path,
        line_number: usize,
        line: &'a str,
        search: &'a str,
        replacement: &'a str,
        mode: ReplaceMode,
    ) -> Self {
        Self {
            file,
            granularity: Granularity::Line,
            line: Some(line),
            line_number: Some(line_number),
            search,
            replacement,
            mode,
        }
    }
}

/// Ordered, append-only record of staged edits across all files.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<StagedEdit>,
}

impl Ledger {
    fn push(&mut self, edit: StagedEdit) {
        self.entries.push(edit);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedEdit> {
        self.entries.iter()
    }

    /// Entries for one file, in staging order.
    pub fn for_file<'a>(&'a self, file: &'a Path) -> impl Iterator<Item = &'a StagedEdit> + 'a {
        self.entries.iter().filter(move |edit| edit.file == file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type LineKey = (PathBuf, usize);

/// Current text of lines that already have staged edits.
#[derive(Debug, Clone, Default)]
pub struct LineAccumulator {
    entries: HashMap<LineKey, String>,
}

impl LineAccumulator {
    /// Remove and return the accumulated text for a line.
    fn take(&mut self, file: &Path, line_number: usize) -> Option<String> {
        self.entries.remove(&(file.to_path_buf(), line_number))
    }

    fn insert(&mut self, file: &Path, line_number: usize, value: String) {
        self.entries.insert((file.to_path_buf(), line_number), value);
    }

    pub fn get(&self, file: &Path, line_number: usize) -> Option<&str> {
        self.entries
            .get(&(file.to_path_buf(), line_number))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Records edit requests into the ledger, composing line edits through the
/// accumulator.
#[derive(Debug, Clone, Default)]
pub struct Stager {
    ledger: Ledger,
    accumulator: LineAccumulator,
}

impl Stager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn accumulator(&self) -> &LineAccumulator {
        &self.accumulator
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    /// Stage one edit.
    ///
    /// Returns `Ok(false)` when a line edit is skipped because its search text
    /// does not occur in the original line. Whole-file edits are always staged.
    pub fn stage(&mut self, request: EditRequest<'_>) -> Result<bool, ReplaceError> {
        match request.granularity {
            Granularity::WholeFile => self.stage_whole_file(request).map(|()| true),
            Granularity::Line => self.stage_line(request),
        }
    }

    fn stage_whole_file(&mut self, request: EditRequest<'_>) -> Result<(), ReplaceError> {
        if request.mode == ReplaceMode::WholeLine {
            return Err(ReplaceError::InvalidEditRequest {
                file: request.file.to_path_buf(),
                reason: "whole-line replacement requires a line scope".to_string(),
            });
        }

        tracing::debug!(
            file = %request.file.display(),
            mode = ?request.mode,
            search = request.search,
            "staged whole-file edit"
        );
        self.ledger.push(StagedEdit {
            file: request.file.to_path_buf(),
            scope: EditScope::WholeFile,
            mode: request.mode,
            old: request.search.to_string(),
            new: request.replacement.to_string(),
        });
        Ok(())
    }

    fn stage_line(&mut self, request: EditRequest<'_>) -> Result<bool, ReplaceError> {
        let (line, line_number) = match (request.line, request.line_number) {
            (Some(line), Some(n)) if n >= 1 => (line, n),
            (line, line_number) => {
                return Err(ReplaceError::InvalidEditRequest {
                    file: request.file.to_path_buf(),
                    reason: format!(
                        "line edit needs a line and a 1-based line number (line: {line:?}, line number: {line_number:?})"
                    ),
                });
            }
        };

        // Gate on the original line, not the accumulated value.
        if request.mode != ReplaceMode::WholeLine && !line.contains(request.search) {
            tracing::debug!(
                file = %request.file.display(),
                line = line_number,
                search = request.search,
                "search text not in original line, edit skipped"
            );
            return Ok(false);
        }

        let before = self
            .accumulator
            .take(request.file, line_number)
            .unwrap_or_else(|| line.to_string());
        let after = request
            .mode
            .apply(&before, request.search, request.replacement);

        tracing::debug!(
            file = %request.file.display(),
            line = line_number,
            mode = ?request.mode,
            "staged line edit"
        );
        self.accumulator
            .insert(request.file, line_number, after.clone());
        self.ledger.push(StagedEdit {
            file: request.file.to_path_buf(),
            scope: EditScope::Line(line_number),
            mode: request.mode,
            old: before,
            new: after,
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "notes.txt";

    fn line_edit(
        stager: &mut Stager,
        n: usize,
        line: &str,
        search: &str,
        replacement: &str,
        mode: ReplaceMode,
    ) -> bool {
        stager
            .stage(EditRequest::line(
                Path::new(FILE),
                n,
                line,
                search,
                replacement,
                mode,
            ))
            .unwrap()
    }

    #[test]
    fn test_replace_mode_literal() {
        assert_eq!(ReplaceMode::FirstOccurrence.apply("a-a-a", "a", "b"), "b-a-a");
        assert_eq!(ReplaceMode::AllOccurrences.apply("a-a-a", "a", "b"), "b-b-b");
        assert_eq!(ReplaceMode::WholeLine.apply("a-a-a", "", "z"), "z");
        // No `$&`-style expansion in replacements.
        assert_eq!(ReplaceMode::FirstOccurrence.apply("abc", "b", "$&$1"), "a$&$1c");
    }

    #[test]
    fn test_whole_file_edit_recorded_verbatim() {
        let mut stager = Stager::new();
        let staged = stager
            .stage(EditRequest::whole_file(
                Path::new(FILE),
                "absent",
                "x",
                ReplaceMode::AllOccurrences,
            ))
            .unwrap();
        assert!(staged);

        let edit = stager.ledger().iter().next().unwrap();
        assert_eq!(edit.scope, EditScope::WholeFile);
        assert_eq!(edit.old, "absent");
        assert_eq!(edit.new, "x");
        assert!(stager.accumulator().is_empty());
    }

    #[test]
    fn test_whole_line_mode_rejected_for_whole_file() {
        let mut stager = Stager::new();
        let result = stager.stage(EditRequest::whole_file(
            Path::new(FILE),
            "",
            "x",
            ReplaceMode::WholeLine,
        ));
        assert!(matches!(
            result,
            Err(ReplaceError::InvalidEditRequest { .. })
        ));
        assert!(stager.ledger().is_empty());
    }

    #[test]
    fn test_line_request_without_line_rejected() {
        let mut stager = Stager::new();
        let mut request = EditRequest::line(
            Path::new(FILE),
            1,
            "text",
            "t",
            "T",
            ReplaceMode::FirstOccurrence,
        );
        request.line = None;
        assert!(matches!(
            stager.stage(request),
            Err(ReplaceError::InvalidEditRequest { .. })
        ));

        let mut request = EditRequest::line(
            Path::new(FILE),
            1,
            "text",
            "t",
            "T",
            ReplaceMode::FirstOccurrence,
        );
        request.line_number = Some(0);
        assert!(matches!(
            stager.stage(request),
            Err(ReplaceError::InvalidEditRequest { .. })
        ));
    }

    #[test]
    fn test_line_edit_records_full_line_snapshots() {
        let mut stager = Stager::new();
        assert!(line_edit(
            &mut stager,
            1,
            "first line",
            "first",
            "FIRST",
            ReplaceMode::FirstOccurrence
        ));

        let edit = stager.ledger().iter().next().unwrap();
        assert_eq!(edit.scope, EditScope::Line(1));
        assert_eq!(edit.old, "first line");
        assert_eq!(edit.new, "FIRST line");
        assert_eq!(
            stager.accumulator().get(Path::new(FILE), 1),
            Some("FIRST line")
        );
    }

    #[test]
    fn test_line_edits_compose() {
        let mut stager = Stager::new();
        let line = "first line";
        line_edit(&mut stager, 1, line, "first", "1st", ReplaceMode::FirstOccurrence);
        line_edit(&mut stager, 1, line, "line", "LINE", ReplaceMode::FirstOccurrence);

        let edits: Vec<_> = stager.ledger().iter().collect();
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[1].old, "1st line");
        assert_eq!(edits[1].new, "1st LINE");
        assert_eq!(stager.accumulator().len(), 1);
    }

    #[test]
    fn test_line_edit_gated_on_original_text() {
        let mut stager = Stager::new();
        let line = "cat";
        line_edit(&mut stager, 1, line, "cat", "dog", ReplaceMode::FirstOccurrence);

        // "dog" only exists in the accumulated value.
        assert!(!line_edit(
            &mut stager,
            1,
            line,
            "dog",
            "wolf",
            ReplaceMode::FirstOccurrence
        ));
        assert_eq!(stager.ledger().len(), 1);

        // "cat" is gone from the accumulated value but still gates in.
        assert!(line_edit(
            &mut stager,
            1,
            line,
            "cat",
            "lion",
            ReplaceMode::FirstOccurrence
        ));
        let last = stager.ledger().iter().last().unwrap();
        assert_eq!(last.old, "dog");
        assert_eq!(last.new, "dog");
    }

    #[test]
    fn test_whole_line_overrides_accumulated_value() {
        let mut stager = Stager::new();
        let line = "alpha beta";
        line_edit(&mut stager, 3, line, "alpha", "ALPHA", ReplaceMode::FirstOccurrence);
        assert!(line_edit(&mut stager, 3, line, "", "gamma", ReplaceMode::WholeLine));

        let last = stager.ledger().iter().last().unwrap();
        assert_eq!(last.old, "ALPHA beta");
        assert_eq!(last.new, "gamma");
        assert_eq!(stager.accumulator().get(Path::new(FILE), 3), Some("gamma"));
    }

    #[test]
    fn test_empty_accumulated_value_still_composes() {
        let mut stager = Stager::new();
        let line = "abc";
        line_edit(&mut stager, 1, line, "abc", "", ReplaceMode::FirstOccurrence);
        line_edit(&mut stager, 1, line, "b", "B", ReplaceMode::FirstOccurrence);

        let last = stager.ledger().iter().last().unwrap();
        assert_eq!(last.old, "");
        assert_eq!(last.new, "");
    }

    #[test]
    fn test_accumulator_keyed_by_file_and_line() {
        let mut stager = Stager::new();
        line_edit(&mut stager, 1, "x", "x", "y", ReplaceMode::FirstOccurrence);
        line_edit(&mut stager, 2, "x", "x", "z", ReplaceMode::FirstOccurrence);
        stager
            .stage(EditRequest::line(
                Path::new("other.txt"),
                1,
                "x",
                "x",
                "w",
                ReplaceMode::FirstOccurrence,
            ))
            .unwrap();

        assert_eq!(stager.accumulator().len(), 3);
        assert_eq!(stager.ledger().for_file(Path::new(FILE)).count(), 2);
        assert!(stager.ledger().iter().all(|e| e.old == "x"));
    }
}
