//! Helpers shared by the handler test suites.

use crate::{
    config::MergeConfig,
    context::MergeContext,
    lang::LangProfile,
    line_based::line_based_merge_parsed,
    parser::parse_declarations,
    settings::DisplaySettings,
    superimposition::superimpose,
};

/// Builds a full merge context out of three Java sources, the way the driver
/// does right before running the handlers.
pub(crate) fn context_from_sources(
    base: &str,
    left: &str,
    right: &str,
    config: MergeConfig,
) -> MergeContext {
    let settings = DisplaySettings::default();
    let profile = LangProfile::java();
    let base_tree = parse_declarations(base, &profile).expect("base revision does not parse");
    let left_tree = parse_declarations(left, &profile).expect("left revision does not parse");
    let right_tree = parse_declarations(right, &profile).expect("right revision does not parse");
    let unstructured =
        line_based_merge_parsed(base, left, right).expect("line-based merge failed");
    let unstructured_output = unstructured.render(&settings);
    let superimposition = superimpose(&base_tree, &left_tree, &right_tree, &settings, &config)
        .expect("superimposition failed");
    MergeContext {
        base_tree,
        left_tree,
        right_tree,
        superimposed: superimposition.tree,
        added_left: superimposition.added_left,
        added_right: superimposition.added_right,
        renamed_without_body_changes: Vec::new(),
        deleted_or_renamed_with_body_changes: Vec::new(),
        unstructured,
        unstructured_output,
        settings,
        config,
        diagnostics: Default::default(),
    }
}
