//! Flags declarations added on one side which reference a declaration the
//! other side edited concurrently.
//!
//! The composition is structurally sound but semantically suspicious: the
//! new code was written against the pre-edit behavior of the declaration it
//! calls. The referring declaration is wrapped in a conflict so the change
//! gets reviewed instead of slipping through silently.

use regex::Regex;

use crate::{
    context::{MergeContext, Side},
    error::TextualMergeError,
    similarity::texts_equal,
    tree::NodeKind,
};

use super::ConflictHandler;

pub struct NewElementReferencingEditedOneHandler;

impl ConflictHandler for NewElementReferencingEditedOneHandler {
    fn name(&self) -> &'static str {
        "new_element_referencing_edited_one"
    }

    fn handle(&self, context: &mut MergeContext) -> Result<(), TextualMergeError> {
        for side in [Side::Left, Side::Right] {
            annotate_references(context, side);
        }
        Ok(())
    }
}

fn annotate_references(context: &mut MergeContext, side: Side) {
    let patterns = edited_name_patterns(context, side.opposite());
    if patterns.is_empty() {
        return;
    }
    let additions: Vec<_> = context
        .added_nodes(side)
        .iter()
        .map(|&id| context.contribution_tree(side).node(id))
        .filter(|node| {
            matches!(
                node.kind,
                NodeKind::Method | NodeKind::Constructor | NodeKind::Field | NodeKind::InitializerBlock
            )
        })
        .cloned()
        .collect();
    for added in additions {
        if !patterns.iter().any(|pattern| pattern.is_match(&added.body)) {
            continue;
        }
        let Some(correspondent) = context.superimposed.find_terminal(&added) else {
            continue;
        };
        // leave nodes alone once another resolution already touched them
        if context.superimposed.node(correspondent).body != added.body {
            continue;
        }
        let conflict = match side {
            Side::Left => context.settings.render_conflict(&added.body, "", ""),
            Side::Right => context.settings.render_conflict("", "", &added.body),
        };
        context.superimposed.node_mut(correspondent).body = conflict;
        context.superimposed.dedent_before_conflict(correspondent);
        context.diagnostics.referencing_conflicts += 1;
    }
}

/// Word-boundary patterns for the names of the declarations which `side`
/// edited relative to base.
fn edited_name_patterns(context: &MergeContext, side: Side) -> Vec<Regex> {
    let ignore_ws = context.config.ignore_whitespace_change;
    let contribution = context.contribution_tree(side);
    context
        .base_tree
        .terminals()
        .into_iter()
        .filter_map(|base_id| {
            let base_node = context.base_tree.node(base_id);
            if base_node.name.is_empty() {
                return None;
            }
            let edited = contribution
                .find_terminal(base_node)
                .is_some_and(|id| {
                    !texts_equal(&contribution.node(id).body, &base_node.body, ignore_ws)
                });
            edited.then(|| {
                Regex::new(&format!(r"\b{}\b", regex::escape(&base_node.name)))
                    .expect("escaped identifier is a valid pattern")
            })
        })
        .collect()
}
