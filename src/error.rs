use std::path::Path;

use thiserror::Error;

/// Internal failure of the line-based merge machinery.
///
/// This is fatal: it only happens when the diff engine produces output
/// we cannot make sense of, never because the inputs conflict.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("textual merge failed: {0}")]
pub struct TextualMergeError(pub String);

/// Failure to build a declaration tree out of a source file.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("could not parse declarations: {0}")]
pub struct ParseError(pub String);

/// Everything that can abort a file merge.
///
/// Note that the presence of conflicts in the output is *not* an error,
/// it is reported through [`crate::MergeResult::conflict_count`]
/// and the process exit code.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A missing or unreadable input (file, directory or revisions file)
    #[error("{0}")]
    Input(String),
    /// The semistructured path could not parse a revision.
    /// The driver normally recovers from this by falling back to the
    /// line-based merge, so this only surfaces for standalone parses.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// See [`TextualMergeError`]
    #[error(transparent)]
    TextualMerge(#[from] TextualMergeError),
}

impl MergeError {
    pub(crate) fn unreadable(path: &Path, err: &std::io::Error) -> Self {
        Self::Input(format!("could not read {}: {err}", path.display()))
    }
}
