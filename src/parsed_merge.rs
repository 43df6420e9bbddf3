//! Parsing and rendering of merge outputs containing diff3-style conflicts.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::{error::TextualMergeError, settings::DisplaySettings};

/// One of the three revisions taking part in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Revision {
    Base,
    Left,
    Right,
}

/// A merge output parsed into a sequence of chunks, alternating between
/// cleanly merged text and diff3-style conflicts.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedMerge {
    pub chunks: Vec<MergedChunk>,
}

/// A chunk in a file with merge conflicts.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MergedChunk {
    /// A readily-merged chunk, including the last newline before any conflict
    Resolved { contents: String },
    /// A conflict; each part includes the newline before the following marker
    Conflict { left: String, base: String, right: String },
}

static START_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\n)<<<<<<<( .*)?\n").unwrap());
static BASE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|\|\|\|\|\|\|( [^\n]*)?\r?\n").unwrap());
static MIDDLE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"=======\r?\n").unwrap());
static END_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">>>>>>>( [^\n]*)?(\r?\n|$)").unwrap());

impl ParsedMerge {
    /// Parses a merge output into chunks.
    ///
    /// Fails when the conflict markers do not appear in a consistent order,
    /// which means the text was not produced by a diff3-style merge.
    pub fn parse(source: &str) -> Result<Self, TextualMergeError> {
        let mut chunks = Vec::new();
        let mut remaining = source;
        loop {
            let Some(start) = START_MARKER.find(remaining) else {
                if !remaining.is_empty() {
                    chunks.push(MergedChunk::Resolved { contents: remaining.to_string() });
                }
                break;
            };
            // the newline before the start marker belongs to the resolved chunk
            let resolved_end =
                if start.as_str().starts_with('\n') { start.start() + 1 } else { start.start() };
            if resolved_end > 0 {
                chunks.push(MergedChunk::Resolved {
                    contents: remaining[..resolved_end].to_string(),
                });
            }
            remaining = &remaining[start.end()..];

            let base_match = BASE_MARKER
                .find(remaining)
                .ok_or_else(|| TextualMergeError("missing base conflict marker".to_string()))?;
            let left = remaining[..base_match.start()].to_string();
            remaining = &remaining[base_match.end()..];

            let middle_match = MIDDLE_MARKER
                .find(remaining)
                .ok_or_else(|| TextualMergeError("missing middle conflict marker".to_string()))?;
            let base = remaining[..middle_match.start()].to_string();
            remaining = &remaining[middle_match.end()..];

            let end_match = END_MARKER
                .find(remaining)
                .ok_or_else(|| TextualMergeError("missing end conflict marker".to_string()))?;
            let right = remaining[..end_match.start()].to_string();
            remaining = &remaining[end_match.end()..];

            chunks.push(MergedChunk::Conflict { left, base, right });
        }
        Ok(Self { chunks })
    }

    /// Reconstruct the source of a revision based on the merged output.
    ///
    /// Because some changes from both revisions have likely already been
    /// merged in the non-conflicting sections, this is not the original
    /// revision, but rather a half-merged version of it.
    pub fn reconstruct_revision(&self, revision: Revision) -> String {
        self.chunks
            .iter()
            .map(|chunk| match chunk {
                MergedChunk::Resolved { contents } => contents.as_str(),
                MergedChunk::Conflict { left, base, right } => match revision {
                    Revision::Base => base,
                    Revision::Left => left,
                    Revision::Right => right,
                },
            })
            .join("")
    }

    /// Renders the merge with the configured conflict markers.
    pub fn render(&self, settings: &DisplaySettings) -> String {
        let mut output = String::new();
        for chunk in &self.chunks {
            match chunk {
                MergedChunk::Resolved { contents } => output.push_str(contents),
                MergedChunk::Conflict { left, base, right } => {
                    output.push_str(&settings.render_conflict(left, base, right));
                    output.push('\n');
                }
            }
        }
        output
    }

    pub fn conflict_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| matches!(chunk, MergedChunk::Conflict { .. })).count()
    }

    /// The summed byte size of all conflicting regions, a rough measure of
    /// how much work is left to the user.
    pub fn conflict_mass(&self) -> usize {
        self.chunks
            .iter()
            .map(|chunk| match chunk {
                MergedChunk::Resolved { .. } => 0,
                MergedChunk::Conflict { left, base, right } => {
                    left.len() + base.len() + right.len()
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_without_conflicts() {
        let parsed = ParsedMerge::parse("a\nb\n").unwrap();
        assert_eq!(parsed.chunks, vec![MergedChunk::Resolved { contents: "a\nb\n".to_string() }]);
        assert_eq!(parsed.conflict_count(), 0);
    }

    #[test]
    fn parse_single_conflict() {
        let source = "head\n<<<<<<< ours\nleft\n||||||| original\nbase\n=======\nright\n>>>>>>> theirs\ntail\n";
        let parsed = ParsedMerge::parse(source).unwrap();
        assert_eq!(
            parsed.chunks,
            vec![
                MergedChunk::Resolved { contents: "head\n".to_string() },
                MergedChunk::Conflict {
                    left: "left\n".to_string(),
                    base: "base\n".to_string(),
                    right: "right\n".to_string(),
                },
                MergedChunk::Resolved { contents: "tail\n".to_string() },
            ]
        );
        assert_eq!(parsed.conflict_count(), 1);
        assert_eq!(parsed.conflict_mass(), 16);
    }

    #[test]
    fn reconstruct_revisions() {
        let source = "head\n<<<<<<<\nleft\n|||||||\nbase\n=======\nright\n>>>>>>>\ntail\n";
        let parsed = ParsedMerge::parse(source).unwrap();
        assert_eq!(parsed.reconstruct_revision(Revision::Left), "head\nleft\ntail\n");
        assert_eq!(parsed.reconstruct_revision(Revision::Base), "head\nbase\ntail\n");
        assert_eq!(parsed.reconstruct_revision(Revision::Right), "head\nright\ntail\n");
    }

    #[test]
    fn render_relabels_markers() {
        let source = "head\n<<<<<<< ours\nleft\n||||||| original\nbase\n=======\nright\n>>>>>>> theirs\ntail\n";
        let parsed = ParsedMerge::parse(source).unwrap();
        assert_eq!(
            parsed.render(&DisplaySettings::default()),
            "head\n<<<<<<< MINE\nleft\n||||||| BASE\nbase\n=======\nright\n>>>>>>> YOURS\ntail\n"
        );
    }

    #[test]
    fn diff2_conflicts_are_rejected() {
        let source = "<<<<<<< ours\nleft\n=======\nright\n>>>>>>> theirs\n";
        assert!(ParsedMerge::parse(source).is_err());
    }

    #[test]
    fn missing_end_marker_is_rejected() {
        let source = "<<<<<<< ours\nleft\n||||||| base\n=======\nright\n";
        assert!(ParsedMerge::parse(source).is_err());
    }
}
