//! Recovery of method and constructor renamings and deletions.
//!
//! Superimposition matches children by identifier, so a method renamed on one
//! side looks like a deletion of the old name plus an addition of the new
//! one. When the other side edited the original in the meantime, composing
//! naively either drops that edit or keeps two diverging copies. This handler
//! finds the base declarations that went missing from one side, matches them
//! against the additions by body similarity, and repairs the superimposed
//! tree according to the configured [`RenamingStrategy`].

use rustc_hash::FxHashSet;

use crate::{
    config::RenamingStrategy,
    context::{MergeContext, Side},
    error::TextualMergeError,
    line_based::textual_body_merge,
    parsed_merge::MergedChunk,
    similarity::{comparison_body, have_equal_body, similarity, texts_equal, very_similar},
    tree::{DeclTree, Node, NodeId},
};

use super::ConflictHandler;

pub struct MethodRenamingAndDeletionHandler;

impl ConflictHandler for MethodRenamingAndDeletionHandler {
    fn name(&self) -> &'static str {
        "method_and_constructor_renaming_and_deletion"
    }

    fn handle(&self, context: &mut MergeContext) -> Result<(), TextualMergeError> {
        classify_missing_declarations(context);
        let scenarios = collect_scenarios(context);
        for scenario in &scenarios {
            resolve(context, scenario)?;
        }
        Ok(())
    }
}

/// A base declaration missing from at least one side, together with its
/// closest matches in both contributions.
struct Scenario {
    left_match: Option<NodeId>,
    base: NodeId,
    right_match: Option<NodeId>,
}

/// Buckets every base method/constructor that has no identifier match in a
/// contribution: either its body survives among that side's additions (a
/// pure rename) or it does not (deleted, or renamed with body changes).
fn classify_missing_declarations(context: &mut MergeContext) {
    let ignore_ws = context.config.ignore_whitespace_change;
    let mut renamed = Vec::new();
    let mut deleted_or_renamed = Vec::new();
    for n_id in context.base_tree.terminals() {
        let n = context.base_tree.node(n_id);
        if !n.kind.is_callable() {
            continue;
        }
        for side in [Side::Left, Side::Right] {
            let contribution = context.contribution_tree(side);
            if contribution.contains(n) {
                continue;
            }
            let body_survives = context
                .added_nodes(side)
                .iter()
                .any(|&added| have_equal_body(n, contribution.node(added), ignore_ws));
            if body_survives {
                renamed.push((side, n_id));
            } else {
                deleted_or_renamed.push((side, n_id));
            }
        }
    }
    context.renamed_without_body_changes = renamed;
    context.deleted_or_renamed_with_body_changes = deleted_or_renamed;
}

/// Builds the deduplicated list of scenarios out of both buckets.
/// Base declarations with no plausible match on either side are dropped:
/// they were deleted everywhere and superimposition already removed them.
fn collect_scenarios(context: &MergeContext) -> Vec<Scenario> {
    let mut seen = FxHashSet::default();
    let mut scenarios = Vec::new();
    let bucketed = context
        .renamed_without_body_changes
        .iter()
        .chain(&context.deleted_or_renamed_with_body_changes);
    for &(_, base_id) in bucketed {
        let n = context.base_tree.node(base_id);
        let left_match = most_accurate(n, &context.left_tree, context);
        let right_match = most_accurate(n, &context.right_tree, context);
        if left_match.is_none() && right_match.is_none() {
            continue;
        }
        if seen.insert((left_match, base_id, right_match)) {
            scenarios.push(Scenario { left_match, base: base_id, right_match });
        }
    }
    scenarios
}

/// The first method/constructor of `tree` (in traversal order) that is very
/// similar to `base_node`. With `prefer_most_similar`, the candidate with
/// the highest body similarity wins instead, earlier candidates breaking
/// ties.
fn most_accurate(base_node: &Node, tree: &DeclTree, context: &MergeContext) -> Option<NodeId> {
    let ignore_ws = context.config.ignore_whitespace_change;
    let mut candidates = tree
        .terminals()
        .into_iter()
        .filter(|&id| tree.node(id).kind.is_callable());
    if context.config.prefer_most_similar {
        let mut best: Option<(NodeId, f64)> = None;
        for id in candidates {
            let candidate = tree.node(id);
            if !very_similar(base_node, candidate, ignore_ws) {
                continue;
            }
            let score = similarity(comparison_body(base_node), comparison_body(candidate));
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((id, score));
            }
        }
        best.map(|(id, _)| id)
    } else {
        candidates.find(|&id| very_similar(base_node, tree.node(id), ignore_ws))
    }
}

fn resolve(context: &mut MergeContext, scenario: &Scenario) -> Result<(), TextualMergeError> {
    let base_node = context.base_tree.node(scenario.base).clone();
    let left_present = context.left_tree.contains(&base_node);
    let right_present = context.right_tree.contains(&base_node);
    let left_match = scenario.left_match.map(|id| context.left_tree.node(id).clone());
    let right_match = scenario.right_match.map(|id| context.right_tree.node(id).clone());
    match (left_present, right_present) {
        // both sides still carry the identifier: superimposition handled it
        (true, true) => Ok(()),
        (false, true) => {
            resolve_one_sided(context, Side::Left, &base_node, left_match.as_ref(), right_match.as_ref())
        }
        (true, false) => {
            resolve_one_sided(context, Side::Right, &base_node, left_match.as_ref(), right_match.as_ref())
        }
        (false, false) => {
            apply_strategy(context, None, &base_node, left_match.as_ref(), right_match.as_ref())
        }
    }
}

/// One side renamed or deleted the declaration. If the other side left it
/// untouched, the change is applied silently; otherwise the two intents
/// collide and the strategy decides.
fn resolve_one_sided(
    context: &mut MergeContext,
    changed: Side,
    base_node: &Node,
    left_match: Option<&Node>,
    right_match: Option<&Node>,
) -> Result<(), TextualMergeError> {
    let opposite = context.contribution_tree(changed.opposite());
    let original_untouched = opposite
        .find_terminal(base_node)
        .is_some_and(|id| {
            texts_equal(
                &opposite.node(id).body,
                &base_node.body,
                context.config.ignore_whitespace_change,
            )
        });
    if !original_untouched {
        return apply_strategy(context, Some(changed), base_node, left_match, right_match);
    }

    // benign: drop the pre-change copy that the untouched side contributed;
    // for a rename the renamed addition already sits in the tree
    if let Some(correspondent) = context.superimposed.find_terminal(base_node) {
        context.superimposed.detach(correspondent);
    }
    let renamed = match changed {
        Side::Left => left_match,
        Side::Right => right_match,
    };
    if renamed.is_some() {
        context.diagnostics.benign_renamings += 1;
    } else {
        context.diagnostics.deletions_applied += 1;
    }
    Ok(())
}

fn apply_strategy(
    context: &mut MergeContext,
    changed: Option<Side>,
    base_node: &Node,
    left_match: Option<&Node>,
    right_match: Option<&Node>,
) -> Result<(), TextualMergeError> {
    match context.config.renaming_strategy {
        RenamingStrategy::Safe => {
            keep_as_conflict(context, base_node, left_match, right_match);
            Ok(())
        }
        // both versions already live in the superimposed tree
        RenamingStrategy::KeepBoth => {
            context.diagnostics.renaming_conflicts += 1;
            Ok(())
        }
        RenamingStrategy::Merge => merge_bodies(context, changed, base_node, left_match, right_match),
        RenamingStrategy::UnstructuredMerge => {
            splice_unstructured(context, base_node, left_match, right_match);
            Ok(())
        }
    }
}

/// The superimposed node that consolidates the scenario: the correspondent
/// of the left match, of the right match, or of the base declaration,
/// whichever still exists.
fn merge_match(
    context: &MergeContext,
    base_node: &Node,
    left_match: Option<&Node>,
    right_match: Option<&Node>,
) -> Option<NodeId> {
    left_match
        .and_then(|n| context.superimposed.find_terminal(n))
        .or_else(|| right_match.and_then(|n| context.superimposed.find_terminal(n)))
        .or_else(|| context.superimposed.find_terminal(base_node))
}

/// Detaches every superimposed node involved in the scenario except `target`,
/// so the resolution text appears exactly once.
fn consolidate_into(
    context: &mut MergeContext,
    target: NodeId,
    base_node: &Node,
    left_match: Option<&Node>,
    right_match: Option<&Node>,
) {
    for node in [Some(base_node), left_match, right_match].into_iter().flatten() {
        if let Some(correspondent) = context.superimposed.find_terminal(node) {
            if correspondent != target {
                context.superimposed.detach(correspondent);
            }
        }
    }
}

/// SAFE: a conflict block listing every non-null contribution, without any
/// attempt at re-merging the bodies.
fn keep_as_conflict(
    context: &mut MergeContext,
    base_node: &Node,
    left_match: Option<&Node>,
    right_match: Option<&Node>,
) {
    let Some(target) = merge_match(context, base_node, left_match, right_match) else {
        return;
    };
    let conflict = context.settings.render_conflict(
        left_match.map_or("", |n| n.body.as_str()),
        &base_node.body,
        right_match.map_or("", |n| n.body.as_str()),
    );
    consolidate_into(context, target, base_node, left_match, right_match);
    context.superimposed.node_mut(target).body = conflict;
    context.superimposed.dedent_before_conflict(target);
    context.diagnostics.renaming_conflicts += 1;
}

/// MERGE: when exactly one side renamed and the other edited the original,
/// or both sides renamed to the same name, re-run the textual merge over the
/// three bodies and install the result under the renamed identifier.
/// Anything else degrades to SAFE.
fn merge_bodies(
    context: &mut MergeContext,
    changed: Option<Side>,
    base_node: &Node,
    left_match: Option<&Node>,
    right_match: Option<&Node>,
) -> Result<(), TextualMergeError> {
    let renamed = match changed {
        Some(Side::Left) => left_match,
        Some(Side::Right) => right_match,
        // both sides renamed: only mergeable onto a common target name
        None => match (left_match, right_match) {
            (Some(l), Some(r)) if l.matches(r) => Some(l),
            _ => None,
        },
    };
    let (Some(renamed), Some(left), Some(right)) = (renamed, left_match, right_match) else {
        keep_as_conflict(context, base_node, left_match, right_match);
        return Ok(());
    };
    if let Some(changed) = changed {
        // the opposite side must still hold the original under its old name
        let opposite = match changed {
            Side::Left => right,
            Side::Right => left,
        };
        if !opposite.matches(base_node) {
            keep_as_conflict(context, base_node, left_match, right_match);
            return Ok(());
        }
    }
    let (merged, has_conflicts) = textual_body_merge(
        &left.body,
        &base_node.body,
        &right.body,
        &context.settings,
        context.config.ignore_whitespace_change,
    )?;
    let Some(target) = context.superimposed.find_terminal(renamed) else {
        keep_as_conflict(context, base_node, left_match, right_match);
        return Ok(());
    };
    consolidate_into(context, target, base_node, left_match, right_match);
    let node = context.superimposed.node_mut(target);
    node.body = merged;
    // superimposition may have unindented this node while it held a conflict
    node.prefix = renamed.prefix.clone();
    if has_conflicts {
        context.superimposed.dedent_before_conflict(target);
        context.diagnostics.renaming_conflicts += 1;
    } else {
        context.diagnostics.renamings_merged += 1;
    }
    Ok(())
}

/// UNSTRUCTURED_MERGE: replace the scenario with the hunk of the line-based
/// merge that brackets the base signature, markers included. Falls back to
/// SAFE when no such hunk exists.
fn splice_unstructured(
    context: &mut MergeContext,
    base_node: &Node,
    left_match: Option<&Node>,
    right_match: Option<&Node>,
) {
    let hunk = (!base_node.name.is_empty()).then(|| {
        let needle = format!("{}(", base_node.name);
        context.unstructured.chunks.iter().find_map(|chunk| match chunk {
            MergedChunk::Conflict { left, base, right }
                if left.contains(&needle) || base.contains(&needle) || right.contains(&needle) =>
            {
                Some(context.settings.render_conflict(left, base, right))
            }
            _ => None,
        })
    });
    let (Some(Some(hunk)), Some(target)) =
        (hunk, merge_match(context, base_node, left_match, right_match))
    else {
        keep_as_conflict(context, base_node, left_match, right_match);
        return;
    };
    consolidate_into(context, target, base_node, left_match, right_match);
    context.superimposed.node_mut(target).body = hunk;
    context.superimposed.dedent_before_conflict(target);
    context.diagnostics.renaming_conflicts += 1;
}
