//! Three-way textual merging, the engine behind both the unstructured
//! fallback and the per-body merges of matched terminals.

use std::borrow::Cow;

use diffy_imara::{Algorithm, ConflictStyle, MergeOptions};

use crate::{
    error::TextualMergeError,
    merge_result::MergeResult,
    parsed_merge::ParsedMerge,
    settings::DisplaySettings,
    similarity::texts_equal,
};

pub const LINE_BASED_METHOD: &str = "line_based";

/// The marker length the diff engine is run with. Its output is re-parsed
/// and re-rendered with the configured marker size afterwards.
const INTERNAL_MARKER_SIZE: usize = 7;

/// Merges the three revisions line by line and parses the result into chunks.
pub fn line_based_merge_parsed(
    contents_base: &str,
    contents_left: &str,
    contents_right: &str,
) -> Result<ParsedMerge, TextualMergeError> {
    let merged = MergeOptions::new()
        .set_conflict_marker_length(INTERNAL_MARKER_SIZE)
        .set_conflict_style(ConflictStyle::Diff3)
        .set_algorithm(Algorithm::Histogram)
        .merge(contents_base, contents_left, contents_right);
    let merged_contents = match merged {
        Ok(contents) | Err(contents) => contents,
    };
    ParsedMerge::parse(&merged_contents)
}

/// Performs a textual merge with the diff3 algorithm.
pub fn line_based_merge(
    contents_base: &str,
    contents_left: &str,
    contents_right: &str,
    settings: &DisplaySettings,
) -> Result<MergeResult, TextualMergeError> {
    let parsed = line_based_merge_parsed(contents_base, contents_left, contents_right)?;
    Ok(MergeResult::from_parsed_merge(&parsed, LINE_BASED_METHOD, settings))
}

/// Three-way merge of the opaque body of a declaration.
///
/// Returns the merged text together with a flag indicating whether it
/// contains conflicts. Whitespace-only differences against the base count as
/// no change at all when `ignore_whitespace` is set.
pub fn textual_body_merge(
    left: &str,
    base: &str,
    right: &str,
    settings: &DisplaySettings,
    ignore_whitespace: bool,
) -> Result<(String, bool), TextualMergeError> {
    if left == right || texts_equal(right, base, ignore_whitespace) {
        return Ok((left.to_string(), false));
    }
    if texts_equal(left, base, ignore_whitespace) {
        return Ok((right.to_string(), false));
    }

    // bodies rarely end with a newline, but the diff engine works on lines
    let had_final_newline = left.ends_with('\n') || right.ends_with('\n');
    let parsed = line_based_merge_parsed(
        &with_final_newline(base),
        &with_final_newline(left),
        &with_final_newline(right),
    )?;
    let has_conflicts = parsed.conflict_count() > 0;
    let mut rendered = parsed.render(settings);
    if !had_final_newline && rendered.ends_with('\n') {
        rendered.pop();
    }
    Ok((rendered, has_conflicts))
}

fn with_final_newline(contents: &str) -> Cow<'_, str> {
    if contents.is_empty() || contents.ends_with('\n') {
        Cow::Borrowed(contents)
    } else {
        Cow::Owned(format!("{contents}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_of_identical_revisions_is_identity() {
        let contents = "a\nb\nc\n";
        let merge =
            line_based_merge(contents, contents, contents, &DisplaySettings::default()).unwrap();
        assert_eq!(merge.contents, contents);
        assert_eq!(merge.conflict_count, 0);
    }

    #[test]
    fn disjoint_edits_merge_cleanly() {
        let base = "a\nb\nc\n";
        let left = "A\nb\nc\n";
        let right = "a\nb\nC\n";
        let merge = line_based_merge(base, left, right, &DisplaySettings::default()).unwrap();
        assert_eq!(merge.contents, "A\nb\nC\n");
        assert_eq!(merge.conflict_count, 0);
    }

    #[test]
    fn overlapping_edits_conflict() {
        let base = "a\n";
        let left = "b\n";
        let right = "c\n";
        let merge = line_based_merge(base, left, right, &DisplaySettings::default()).unwrap();
        assert_eq!(
            merge.contents,
            "<<<<<<< MINE\nb\n||||||| BASE\na\n=======\nc\n>>>>>>> YOURS\n"
        );
        assert_eq!(merge.conflict_count, 1);
    }

    #[test]
    fn body_merge_without_trailing_newline() {
        let (merged, conflicts) = textual_body_merge(
            "void b() {\n    x = 1;\n}",
            "void a() {\n    x = 1;\n}",
            "void a() {\n    x = 2;\n}",
            &DisplaySettings::default(),
            false,
        )
        .unwrap();
        assert!(!conflicts);
        assert_eq!(merged, "void b() {\n    x = 2;\n}");
    }

    #[test]
    fn body_merge_ignoring_whitespace() {
        let (merged, conflicts) = textual_body_merge(
            "void  a()  { x = 1; }",
            "void a() { x = 1; }",
            "void a() { x = 2; }",
            &DisplaySettings::default(),
            true,
        )
        .unwrap();
        assert!(!conflicts);
        assert_eq!(merged, "void a() { x = 2; }");
    }

    #[test]
    fn concurrent_identical_edits_do_not_conflict() {
        let (merged, conflicts) =
            textual_body_merge("int x = 2;", "int x = 1;", "int x = 2;", &DisplaySettings::default(), false)
                .unwrap();
        assert!(!conflicts);
        assert_eq!(merged, "int x = 2;");
    }
}
