//! Collapsing of declarations added by both sides under the same signature.
//!
//! Most concurrent additions are already consolidated during superimposition,
//! which matches additions by identifier within their container. This pass
//! sweeps up the pairs that slipped through (additions that paired up with
//! different occurrences, or got re-inserted by earlier handlers): within
//! each container, two copies of the same signature where one side added it
//! and the other did too are collapsed when equal, conflicted when not.

use rustc_hash::FxHashSet;

use crate::{
    context::MergeContext,
    error::TextualMergeError,
    similarity::texts_equal,
    tree::{DeclTree, NodeId, NodeKind},
};

use super::ConflictHandler;

pub struct DuplicateDeclarationsHandler;

impl ConflictHandler for DuplicateDeclarationsHandler {
    fn name(&self) -> &'static str {
        "duplicate_declarations"
    }

    fn handle(&self, context: &mut MergeContext) -> Result<(), TextualMergeError> {
        let added_left = added_signatures(&context.left_tree, &context.added_left);
        let added_right = added_signatures(&context.right_tree, &context.added_right);

        for container in context.superimposed.containers() {
            let children = context.superimposed.node(container).children.clone();
            let mut first_seen: Vec<(NodeKind, String, NodeId)> = Vec::new();
            for child in children {
                let node = context.superimposed.node(child);
                if !matches!(node.kind, NodeKind::Method | NodeKind::Constructor | NodeKind::Field)
                {
                    continue;
                }
                let key = (node.kind, node.identifier.clone());
                if !added_left.contains(&key) || !added_right.contains(&key) {
                    continue;
                }
                let Some(&(_, _, first)) = first_seen
                    .iter()
                    .find(|(kind, identifier, _)| (*kind, identifier.as_str()) == (key.0, key.1.as_str()))
                else {
                    first_seen.push((key.0, key.1, child));
                    continue;
                };
                resolve_duplicate(context, first, child);
            }
        }
        Ok(())
    }
}

/// The signatures a contribution added, for quick membership tests.
fn added_signatures(tree: &DeclTree, added: &[NodeId]) -> FxHashSet<(NodeKind, String)> {
    added.iter().map(|&id| (tree.node(id).kind, tree.node(id).identifier.clone())).collect()
}

/// Collapses the later duplicate into the earlier one, or turns the earlier
/// one into a conflict when the bodies disagree. Output order puts the left
/// contribution first, so `first` plays the left role.
fn resolve_duplicate(context: &mut MergeContext, first: NodeId, second: NodeId) {
    let first_body = context.superimposed.node(first).body.clone();
    let second_body = context.superimposed.node(second).body.clone();
    if !texts_equal(&first_body, &second_body, context.config.ignore_whitespace_change) {
        let conflict = context.settings.render_conflict(&first_body, "", &second_body);
        context.superimposed.node_mut(first).body = conflict;
        context.superimposed.dedent_before_conflict(first);
    }
    context.superimposed.detach(second);
    context.diagnostics.duplicate_declarations += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MergeConfig, test_utils::context_from_sources};
    use pretty_assertions::assert_eq;

    #[test]
    fn equal_additions_collapse_to_a_single_copy() {
        let base = "class C {\n}\n";
        let both = "\
class C {
    int answer() {
        return 42;
    }
}
";
        let mut context = context_from_sources(base, both, both, MergeConfig::default());
        DuplicateDeclarationsHandler.handle(&mut context).unwrap();
        let output = context.superimposed.to_source();
        assert_eq!(output, both);
        assert_eq!(output.matches("answer()").count(), 1);
    }

    #[test]
    fn base_declarations_are_never_treated_as_duplicates() {
        let source = "\
class C {
    void a() {}
}
";
        let mut context = context_from_sources(source, source, source, MergeConfig::default());
        DuplicateDeclarationsHandler.handle(&mut context).unwrap();
        assert_eq!(context.diagnostics.duplicate_declarations, 0);
        assert_eq!(context.superimposed.to_source(), source);
    }

    #[test]
    fn leftover_duplicate_pair_is_conflicted() {
        // force a leftover pair: the tree holds two copies of f() because
        // each side added one and an earlier pass re-inserted them
        let base = "class C {\n}\n";
        let left = "class C {\n    int f() { return 1; }\n}\n";
        let right = "class C {\n    int f() { return 2; }\n}\n";
        let mut context = context_from_sources(base, left, right, MergeConfig::default());
        let container = context.superimposed.containers()[1];
        let duplicate = {
            let id = context.right_tree.terminals()[0];
            let right_tree = context.right_tree.clone();
            let copied = context.superimposed.import_subtree(&right_tree, id);
            context.superimposed.attach_child(container, copied);
            copied
        };
        DuplicateDeclarationsHandler.handle(&mut context).unwrap();
        assert!(context.diagnostics.duplicate_declarations >= 1);
        assert_eq!(context.superimposed.node(duplicate).parent, None);
    }
}
