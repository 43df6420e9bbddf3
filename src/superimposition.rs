//! Composition of the three declaration trees into one superimposed tree.
//!
//! Containers are walked in lockstep, matching children by kind and
//! identifier (k-th occurrence against k-th occurrence, so duplicate
//! identifiers pair up positionally). Matched terminals get their bodies
//! merged textually; children present in a single contribution are recorded
//! as additions and inserted after their nearest surviving predecessor.
//!
//! Identifier matching deliberately misses renamings: a renamed method looks
//! deleted on one side and added on the other. Recovering those is the job of
//! the renaming/deletion handler, which runs after superimposition.

use rustc_hash::FxHashMap;

use crate::{
    config::MergeConfig,
    error::TextualMergeError,
    line_based::textual_body_merge,
    settings::DisplaySettings,
    similarity::texts_equal,
    tree::{DeclTree, Node, NodeId, NodeKind},
};

/// The outcome of superimposing three declaration trees.
pub struct Superimposition {
    pub tree: DeclTree,
    /// Terminals of the left tree absent from base, in traversal order
    pub added_left: Vec<NodeId>,
    /// Terminals of the right tree absent from base, in traversal order
    pub added_right: Vec<NodeId>,
}

/// Matching key of a child within its container: kind, identifier and
/// occurrence index, so that duplicated identifiers match positionally.
type Key = (NodeKind, String, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotOrigin {
    /// Present in base (and at least one contribution)
    Base,
    /// Added by the left side only
    AddedLeft,
    /// Added by the right side only
    AddedRight,
    /// Added concurrently by both sides
    Concurrent,
}

/// A child of the container being assembled, in output order.
struct Slot {
    key: Key,
    id: NodeId,
    origin: SlotOrigin,
}

pub fn superimpose(
    base: &DeclTree,
    left: &DeclTree,
    right: &DeclTree,
    settings: &DisplaySettings,
    config: &MergeConfig,
) -> Result<Superimposition, TextualMergeError> {
    let mut superimposer = Superimposer {
        base,
        left,
        right,
        settings,
        config,
        out: DeclTree::empty(),
    };
    let root =
        superimposer.merge_containers(Some(base.root()), Some(left.root()), Some(right.root()))?;
    let mut tree = superimposer.out;
    tree.set_root(root);
    Ok(Superimposition {
        tree,
        added_left: added_terminals(left, base),
        added_right: added_terminals(right, base),
    })
}

/// Terminals of a contribution whose kind and identifier are absent from base.
fn added_terminals(contribution: &DeclTree, base: &DeclTree) -> Vec<NodeId> {
    contribution
        .terminals()
        .into_iter()
        .filter(|&id| !base.contains(contribution.node(id)))
        .collect()
}

struct Superimposer<'a> {
    base: &'a DeclTree,
    left: &'a DeclTree,
    right: &'a DeclTree,
    settings: &'a DisplaySettings,
    config: &'a MergeConfig,
    out: DeclTree,
}

impl Superimposer<'_> {
    /// Builds the superimposed counterpart of a container matched across the
    /// given revisions (absent revisions never saw the container).
    fn merge_containers(
        &mut self,
        base_id: Option<NodeId>,
        left_id: Option<NodeId>,
        right_id: Option<NodeId>,
    ) -> Result<NodeId, TextualMergeError> {
        let base_node = base_id.map(|id| self.base.node(id));
        let left_node = left_id.map(|id| self.left.node(id));
        let right_node = right_id.map(|id| self.right.node(id));
        let template = left_node
            .or(right_node)
            .or(base_node)
            .expect("a container must be present in at least one revision");

        let mut merged = Node::container(template.kind, template.identifier.clone());
        merged.name = template.name.clone();
        merged.prefix =
            pick3(left_node.map(|n| &n.prefix), base_node.map(|n| &n.prefix), right_node.map(|n| &n.prefix));
        merged.header =
            pick3(left_node.map(|n| &n.header), base_node.map(|n| &n.header), right_node.map(|n| &n.header));
        merged.footer =
            pick3(left_node.map(|n| &n.footer), base_node.map(|n| &n.footer), right_node.map(|n| &n.footer));
        let out_id = self.out.add_node(merged);

        let base_keys = keyed_children(self.base, base_id);
        let left_keys = keyed_children(self.left, left_id);
        let right_keys = keyed_children(self.right, right_id);
        let left_map: FxHashMap<&Key, NodeId> =
            left_keys.iter().map(|(key, id)| (key, *id)).collect();
        let right_map: FxHashMap<&Key, NodeId> =
            right_keys.iter().map(|(key, id)| (key, *id)).collect();

        let mut slots: Vec<Slot> = Vec::new();

        // base-originating children keep their base order; children absent
        // from both contributions were concurrently deleted and are dropped
        for (key, b_id) in &base_keys {
            let left_match = left_map.get(key).copied();
            let right_match = right_map.get(key).copied();
            let id = match (left_match, right_match) {
                (Some(l), Some(r)) => self.merge_matched(*b_id, l, r)?,
                (Some(l), None) => self.out.import_subtree(self.left, l),
                (None, Some(r)) => self.out.import_subtree(self.right, r),
                (None, None) => continue,
            };
            slots.push(Slot { key: key.clone(), id, origin: SlotOrigin::Base });
        }

        // nodes added by a contribution go right after their nearest
        // predecessor that survives in the output; left insertions win ties
        let mut cursor = None;
        for (key, l_id) in &left_keys {
            if let Some(pos) = slots.iter().position(|slot| slot.key == *key) {
                cursor = Some(pos);
                continue;
            }
            let (id, origin) = match right_map.get(key).copied() {
                Some(r_id) => (self.merge_concurrent_addition(*l_id, r_id)?, SlotOrigin::Concurrent),
                None => (self.out.import_subtree(self.left, *l_id), SlotOrigin::AddedLeft),
            };
            let insert_at = cursor.map_or(0, |pos| pos + 1);
            self.separate_from_predecessor(id, insert_at);
            slots.insert(insert_at, Slot { key: key.clone(), id, origin });
            cursor = Some(insert_at);
        }

        let mut cursor = None;
        for (key, r_id) in &right_keys {
            if let Some(pos) = slots.iter().position(|slot| slot.key == *key) {
                cursor = Some(pos);
                continue;
            }
            let mut insert_at = cursor.map_or(0, |pos| pos + 1);
            while insert_at < slots.len() && slots[insert_at].origin == SlotOrigin::AddedLeft {
                insert_at += 1;
            }
            let id = self.out.import_subtree(self.right, *r_id);
            self.separate_from_predecessor(id, insert_at);
            slots.insert(insert_at, Slot { key: key.clone(), id, origin: SlotOrigin::AddedRight });
            cursor = Some(insert_at);
        }

        let children = slots.into_iter().map(|slot| slot.id).collect();
        self.out.set_children(out_id, children);
        Ok(out_id)
    }

    /// An added node that did not open its container in the contribution may
    /// land behind a sibling here; give it a line of its own so the two do
    /// not end up glued together.
    fn separate_from_predecessor(&mut self, id: NodeId, insert_at: usize) {
        if insert_at > 0 && !self.out.node(id).prefix.contains('\n') {
            self.out.node_mut(id).prefix.insert(0, '\n');
        }
    }

    /// A child matched in all three revisions: recurse on containers,
    /// merge bodies textually on terminals.
    fn merge_matched(
        &mut self,
        base_id: NodeId,
        left_id: NodeId,
        right_id: NodeId,
    ) -> Result<NodeId, TextualMergeError> {
        if self.base.node(base_id).kind.is_container() {
            return self.merge_containers(Some(base_id), Some(left_id), Some(right_id));
        }
        let base_node = self.base.node(base_id);
        let left_node = self.left.node(left_id);
        let right_node = self.right.node(right_id);
        let (body, has_conflicts) = textual_body_merge(
            &left_node.body,
            &base_node.body,
            &right_node.body,
            self.settings,
            self.config.ignore_whitespace_change,
        )?;
        let mut merged = left_node.clone();
        merged.parent = None;
        merged.children.clear();
        merged.body = body;
        merged.prefix = pick3(
            Some(&left_node.prefix),
            Some(&base_node.prefix),
            Some(&right_node.prefix),
        );
        let id = self.out.add_node(merged);
        if has_conflicts {
            self.out.dedent_before_conflict(id);
        }
        Ok(id)
    }

    /// A child added concurrently by both sides under the same identifier:
    /// keep a single copy when the bodies agree, otherwise emit a conflict
    /// body (a merge against an empty base).
    fn merge_concurrent_addition(
        &mut self,
        left_id: NodeId,
        right_id: NodeId,
    ) -> Result<NodeId, TextualMergeError> {
        let left_node = self.left.node(left_id);
        if left_node.kind.is_container() {
            return self.merge_containers(None, Some(left_id), Some(right_id));
        }
        let right_node = self.right.node(right_id);
        if texts_equal(&left_node.body, &right_node.body, self.config.ignore_whitespace_change) {
            return Ok(self.out.import_subtree(self.left, left_id));
        }
        let (body, has_conflicts) = textual_body_merge(
            &left_node.body,
            "",
            &right_node.body,
            self.settings,
            self.config.ignore_whitespace_change,
        )?;
        let mut merged = left_node.clone();
        merged.parent = None;
        merged.children.clear();
        merged.body = body;
        let id = self.out.add_node(merged);
        if has_conflicts {
            self.out.dedent_before_conflict(id);
        }
        Ok(id)
    }
}

/// The children of a container, paired with their matching keys.
fn keyed_children(tree: &DeclTree, container: Option<NodeId>) -> Vec<(Key, NodeId)> {
    let Some(container) = container else {
        return Vec::new();
    };
    let mut occurrences: FxHashMap<(NodeKind, &str), usize> = FxHashMap::default();
    tree.node(container)
        .children
        .iter()
        .map(|&child| {
            let node = tree.node(child);
            let seen = occurrences.entry((node.kind, node.identifier.as_str())).or_default();
            let key = (node.kind, node.identifier.clone(), *seen);
            *seen += 1;
            (key, child)
        })
        .collect()
}

/// Three-way pick for texts that are not worth a conflict (prefixes, headers,
/// footers): the left change wins when left diverged from base, otherwise the
/// right version is used.
fn pick3(left: Option<&String>, base: Option<&String>, right: Option<&String>) -> String {
    match (left, base, right) {
        (Some(l), Some(b), Some(r)) => {
            if l != b {
                l.clone()
            } else {
                r.clone()
            }
        }
        (Some(l), _, _) => l.clone(),
        (None, _, Some(r)) => r.clone(),
        (None, Some(b), None) => b.clone(),
        (None, None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lang::LangProfile, parser::parse_declarations};
    use pretty_assertions::assert_eq;

    fn merge(base: &str, left: &str, right: &str) -> Superimposition {
        let profile = LangProfile::java();
        let base = parse_declarations(base, &profile).unwrap();
        let left = parse_declarations(left, &profile).unwrap();
        let right = parse_declarations(right, &profile).unwrap();
        superimpose(&base, &left, &right, &DisplaySettings::default(), &MergeConfig::default())
            .unwrap()
    }

    #[test]
    fn identical_revisions_round_trip() {
        let source = "class C {\n    void a() {\n        go();\n    }\n}\n";
        let result = merge(source, source, source);
        assert_eq!(result.tree.to_source(), source);
        assert!(result.added_left.is_empty());
        assert!(result.added_right.is_empty());
    }

    #[test]
    fn disjoint_body_edits_are_both_applied() {
        let base = "class C {\n    void a() {\n        x = 0;\n    }\n    void b() {\n        y = 0;\n    }\n}\n";
        let left = "class C {\n    void a() {\n        x = 1;\n    }\n    void b() {\n        y = 0;\n    }\n}\n";
        let right = "class C {\n    void a() {\n        x = 0;\n    }\n    void b() {\n        y = 1;\n    }\n}\n";
        let result = merge(base, left, right);
        let expected = "class C {\n    void a() {\n        x = 1;\n    }\n    void b() {\n        y = 1;\n    }\n}\n";
        assert_eq!(result.tree.to_source(), expected);
    }

    #[test]
    fn additions_follow_their_predecessor() {
        let base = "class C {\n    void a() {}\n}\n";
        let left = "class C {\n    void a() {}\n\n    void l() {}\n}\n";
        let right = "class C {\n    void a() {}\n\n    void r() {}\n}\n";
        let result = merge(base, left, right);
        let expected = "class C {\n    void a() {}\n\n    void l() {}\n\n    void r() {}\n}\n";
        assert_eq!(result.tree.to_source(), expected);
        assert_eq!(result.added_left.len(), 1);
        assert_eq!(result.added_right.len(), 1);
    }

    #[test]
    fn equal_concurrent_additions_are_collapsed() {
        let base = "class C {\n}\n";
        let both = "class C {\n    int shared() {\n        return 0;\n    }\n}\n";
        let result = merge(base, both, both);
        assert_eq!(result.tree.to_source(), both);
    }

    #[test]
    fn differing_concurrent_additions_conflict() {
        let base = "class C {\n}\n";
        let left = "class C {\n    int f() { return 1; }\n}\n";
        let right = "class C {\n    int f() { return 2; }\n}\n";
        let result = merge(base, left, right);
        let output = result.tree.to_source();
        assert!(output.contains("<<<<<<< MINE"));
        assert!(output.contains("int f() { return 1; }"));
        assert!(output.contains("int f() { return 2; }"));
    }

    #[test]
    fn deletion_of_untouched_declaration_keeps_survivor() {
        // identifier matching alone cannot tell a deletion from a renaming,
        // so the surviving side's copy is kept for the handlers to decide
        let base = "class C {\n    void a() {}\n    void b() {}\n}\n";
        let left = "class C {\n    void b() {}\n}\n";
        let right = base;
        let result = merge(base, left, right);
        assert_eq!(result.tree.to_source(), base);
    }

    #[test]
    fn concurrent_deletion_is_applied() {
        let base = "class C {\n    void a() {}\n    void b() {}\n}\n";
        let both = "class C {\n    void b() {}\n}\n";
        let result = merge(base, both, both);
        assert_eq!(result.tree.to_source(), both);
    }

    #[test]
    fn nested_classes_are_merged_recursively() {
        let base = "class Outer {\n    class Inner {\n        void m() {\n            x = 0;\n        }\n    }\n}\n";
        let left = "class Outer {\n    class Inner {\n        void m() {\n            x = 1;\n        }\n    }\n}\n";
        let right = base;
        let result = merge(base, left, right);
        assert_eq!(result.tree.to_source(), left);
    }
}
