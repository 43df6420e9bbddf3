//! Re-matching of initializer blocks across revisions.
//!
//! Initializer blocks carry no name, so identifier matching can only pair
//! them positionally, which falls apart as soon as one side inserts or
//! removes a block. This handler rebuilds the block list of every container
//! from scratch: base blocks are matched against each contribution by body
//! similarity, matched triples are merged textually, and leftover
//! contribution blocks are kept as independent additions.

use crate::{
    context::MergeContext,
    error::TextualMergeError,
    line_based::textual_body_merge,
    similarity::{SIMILARITY_THRESHOLD, similarity, texts_equal},
    tree::{DeclTree, Node, NodeId, NodeKind},
};

use super::ConflictHandler;

pub struct InitializationBlocksHandler;

impl ConflictHandler for InitializationBlocksHandler {
    fn name(&self) -> &'static str {
        "initialization_blocks"
    }

    fn handle(&self, context: &mut MergeContext) -> Result<(), TextualMergeError> {
        for container in context.superimposed.containers() {
            let identifier = context.superimposed.node(container).identifier.clone();
            let kind = context.superimposed.node(container).kind;
            let base_blocks = container_blocks(&context.base_tree, kind, &identifier);
            let left_blocks = container_blocks(&context.left_tree, kind, &identifier);
            let right_blocks = container_blocks(&context.right_tree, kind, &identifier);
            if base_blocks.is_empty() && left_blocks.is_empty() && right_blocks.is_empty() {
                continue;
            }
            let rebuilt = rebuild_blocks(context, &base_blocks, &left_blocks, &right_blocks)?;
            install_blocks(context, container, rebuilt);
        }
        Ok(())
    }
}

/// The initializer blocks of the container with this kind and identifier,
/// cloned out of the given revision.
fn container_blocks(tree: &DeclTree, kind: NodeKind, identifier: &str) -> Vec<Node> {
    let Some(container) = tree
        .containers()
        .into_iter()
        .find(|&id| tree.node(id).kind == kind && tree.node(id).identifier == identifier)
    else {
        return Vec::new();
    };
    tree.node(container)
        .children
        .iter()
        .map(|&child| tree.node(child))
        .filter(|node| node.kind == NodeKind::InitializerBlock)
        .cloned()
        .collect()
}

/// Blocks of the same flavor (static or instance) match when their bodies
/// are equal modulo whitespace or similar beyond the threshold.
fn blocks_match(a: &Node, b: &Node) -> bool {
    a.identifier == b.identifier
        && (texts_equal(&a.body, &b.body, true)
            || similarity(&a.body, &b.body) >= SIMILARITY_THRESHOLD)
}

/// Computes the merged block list before any mutation, so a failing body
/// merge leaves the container untouched.
fn rebuild_blocks(
    context: &mut MergeContext,
    base_blocks: &[Node],
    left_blocks: &[Node],
    right_blocks: &[Node],
) -> Result<Vec<Node>, TextualMergeError> {
    let ignore_ws = context.config.ignore_whitespace_change;
    let mut left_used = vec![false; left_blocks.len()];
    let mut right_used = vec![false; right_blocks.len()];
    let mut rebuilt = Vec::new();

    for base in base_blocks {
        let left_pos = claim_match(base, left_blocks, &mut left_used);
        let right_pos = claim_match(base, right_blocks, &mut right_used);
        match (left_pos, right_pos) {
            (Some(l), Some(r)) => {
                let left = &left_blocks[l];
                let right = &right_blocks[r];
                let (body, has_conflicts) = textual_body_merge(
                    &left.body,
                    &base.body,
                    &right.body,
                    &context.settings,
                    ignore_ws,
                )?;
                if body != base.body {
                    context.diagnostics.initialization_blocks += 1;
                }
                let mut merged = left.clone();
                merged.body = body;
                if has_conflicts {
                    unindent(&mut merged);
                }
                rebuilt.push(merged);
            }
            (Some(l), None) => rebuilt.push(left_blocks[l].clone()),
            (None, Some(r)) => rebuilt.push(right_blocks[r].clone()),
            // gone from both contributions
            (None, None) => {}
        }
    }

    // leftover contribution blocks are additions; identical ones added on
    // both sides collapse into a single copy
    for (l, left) in left_blocks.iter().enumerate() {
        if left_used[l] {
            continue;
        }
        let twin = (0..right_blocks.len()).find(|&r| {
            !right_used[r]
                && right_blocks[r].identifier == left.identifier
                && texts_equal(&left.body, &right_blocks[r].body, true)
        });
        if let Some(r) = twin {
            right_used[r] = true;
            context.diagnostics.initialization_blocks += 1;
        }
        rebuilt.push(left.clone());
    }
    for (r, right) in right_blocks.iter().enumerate() {
        if !right_used[r] {
            rebuilt.push(right.clone());
        }
    }
    Ok(rebuilt)
}

/// The first unclaimed block of `candidates` similar enough to `base`.
fn claim_match(base: &Node, candidates: &[Node], used: &mut [bool]) -> Option<usize> {
    let position = candidates
        .iter()
        .enumerate()
        .position(|(index, candidate)| !used[index] && blocks_match(base, candidate))?;
    used[position] = true;
    Some(position)
}

fn unindent(node: &mut Node) {
    while node.prefix.ends_with(' ') || node.prefix.ends_with('\t') {
        node.prefix.pop();
    }
}

/// Replaces the initializer-block children of `container` with the rebuilt
/// list, at the position the first block previously occupied.
fn install_blocks(context: &mut MergeContext, container: NodeId, rebuilt: Vec<Node>) {
    let children = context.superimposed.node(container).children.clone();
    let mut kept = Vec::new();
    let mut insert_at = None;
    for child in children {
        if context.superimposed.node(child).kind == NodeKind::InitializerBlock {
            insert_at.get_or_insert(kept.len());
        } else {
            kept.push(child);
        }
    }
    let insert_at = insert_at.unwrap_or(kept.len());
    let rebuilt_ids: Vec<NodeId> = rebuilt
        .into_iter()
        .map(|mut node| {
            node.parent = None;
            node.children.clear();
            context.superimposed.add_node(node)
        })
        .collect();
    kept.splice(insert_at..insert_at, rebuilt_ids);
    context.superimposed.set_children(container, kept);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MergeConfig, test_utils::context_from_sources};
    use pretty_assertions::assert_eq;

    fn run(base: &str, left: &str, right: &str) -> String {
        let mut context = context_from_sources(base, left, right, MergeConfig::default());
        InitializationBlocksHandler.handle(&mut context).unwrap();
        context.superimposed.to_source()
    }

    #[test]
    fn untouched_blocks_survive_unchanged() {
        let source = "\
class C {
    static {
        setup();
    }
}
";
        assert_eq!(run(source, source, source), source);
    }

    #[test]
    fn blocks_match_by_similarity_despite_reordering() {
        let base = "\
class C {
    static {
        alpha();
        beta();
    }
}
";
        // the left side inserts a new block before the existing one
        let left = "\
class C {
    static {
        prelude();
    }

    static {
        alpha();
        beta();
    }
}
";
        // the right side edits the existing block slightly
        let right = "\
class C {
    static {
        alpha();
        beta();
        gamma();
    }
}
";
        let output = run(base, left, &right);
        assert!(output.contains("prelude();"), "added block lost:\n{output}");
        assert!(output.contains("gamma();"), "edited block lost:\n{output}");
        assert!(!output.contains("<<<<<<<"), "unexpected conflict:\n{output}");
        // the base block must not be duplicated
        assert_eq!(output.matches("alpha();").count(), 1);
    }

    #[test]
    fn identical_blocks_added_on_both_sides_collapse() {
        let base = "class C {\n}\n";
        let both = "\
class C {
    static {
        setup();
    }
}
";
        let output = run(base, both, both);
        assert_eq!(output.matches("setup();").count(), 1);
    }

    #[test]
    fn diverging_blocks_added_on_both_sides_are_kept_separately() {
        let base = "class C {\n}\n";
        let left = "\
class C {
    static {
        left();
    }
}
";
        let right = "\
class C {
    static {
        right();
    }
}
";
        let output = run(base, left, right);
        assert!(output.contains("left();"));
        assert!(output.contains("right();"));
        assert!(!output.contains("<<<<<<<"), "independent additions must not conflict:\n{output}");
    }

    #[test]
    fn static_and_instance_blocks_do_not_match_each_other() {
        let base = "\
class C {
    static {
        setup();
    }
}
";
        // left turns the static block into an instance block
        let left = "\
class C {
    {
        setup();
    }
}
";
        let right = base;
        let output = run(base, left, right);
        // the flavors do not match, so the untouched static block survives
        // and the instance block counts as an addition
        assert_eq!(output.matches("setup();").count(), 2);
        assert!(output.contains("static {"), "static block missing:\n{output}");
        assert!(output.contains("\n    {\n"), "instance block missing:\n{output}");
    }
}
