//! Batch Replace: stage find-and-replace edits across files, commit them at once
//!
//! A session resolves a set of files once, then lets callers walk those files
//! whole or line by line and stage literal substring replacements. Nothing
//! touches disk until [`Session::commit`], which re-reads every file and
//! replays its staged edits in order.
//!
//! # Architecture
//!
//! - [`files`]: the only boundary to the environment (find, read, write)
//! - [`staging`]: the append-only edit ledger and the per-line accumulator
//! - [`commit`]: per-file partition by granularity and ordered replay
//! - [`session`]: the iteration passes tying the two together
//! - [`config`]: TOML replacement plans driving a session
//!
//! # Known hazards
//!
//! - Line edits are replayed by searching the recorded line text over the
//!   whole file, so a line that appears verbatim earlier in the file is the
//!   one rewritten.
//! - A line edit is staged only when its search text occurs in the line as
//!   first read, even if earlier edits on that line changed it.
//! - A file cannot receive both whole-file and line edits in one commit.
//!
//! # Example
//!
//! ```no_run
//! use batch_replace::{FsAccess, Session};
//!
//! # fn main() -> Result<(), batch_replace::ReplaceError> {
//! let mut session = Session::open(FsAccess::new(".")?, &["src/**/*.txt"])?;
//! session.for_each_file(|file| file.replace_all("colour", "color"))?;
//! session.commit()?;
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod config;
pub mod error;
pub mod files;
pub mod lines;
pub mod safety;
pub mod session;
pub mod staging;

// Re-exports
pub use commit::{CommitReport, FileEdits, FileOutcome};
pub use config::{load_from_path, load_from_str, stage_plan, ConfigError, ReplacePlan};
pub use error::ReplaceError;
pub use files::{FileAccess, FsAccess, MemoryFiles, PatternSet};
pub use safety::{RootGuard, SafetyError};
pub use session::{FileScope, LineScope, Session};
pub use staging::{EditScope, Granularity, Ledger, ReplaceMode, StagedEdit};
