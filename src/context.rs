use log::debug;

use crate::{
    config::MergeConfig,
    parsed_merge::ParsedMerge,
    settings::DisplaySettings,
    tree::{DeclTree, NodeId},
};

/// One of the two contributions to a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Counters for the situations the conflict handlers intervened on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Renamings applied silently because the other side left the declaration alone
    pub benign_renamings: usize,
    /// Deletions applied silently for the same reason
    pub deletions_applied: usize,
    /// Renaming or deletion collisions resolved according to the strategy
    pub renaming_conflicts: usize,
    /// Collisions the strategy merged away without a conflict
    pub renamings_merged: usize,
    /// Duplicate declarations collapsed or conflicted
    pub duplicate_declarations: usize,
    /// Initializer blocks re-matched by similarity
    pub initialization_blocks: usize,
    /// New declarations referencing a declaration edited on the other side
    pub referencing_conflicts: usize,
    /// Imports making a simple type name ambiguous
    pub import_ambiguities: usize,
}

impl Diagnostics {
    pub fn log_summary(&self) {
        debug!(
            "handler interventions: {} benign renamings, {} deletions, \
             {} renaming conflicts, {} merged renamings, {} duplicates, \
             {} initializer blocks, {} reference conflicts, {} import ambiguities",
            self.benign_renamings,
            self.deletions_applied,
            self.renaming_conflicts,
            self.renamings_merged,
            self.duplicate_declarations,
            self.initialization_blocks,
            self.referencing_conflicts,
            self.import_ambiguities,
        );
    }
}

/// The working state of a single file merge, shared by all conflict handlers.
///
/// The input trees own their nodes; everything else refers to them through
/// [`NodeId`]s. Handlers mutate only the superimposed tree, the
/// classification buckets and the diagnostics.
pub struct MergeContext {
    pub base_tree: DeclTree,
    pub left_tree: DeclTree,
    pub right_tree: DeclTree,
    /// The composition of the three trees, edited in place by the handlers
    /// and serialized into the final output
    pub superimposed: DeclTree,
    /// Terminals of the left tree whose identifier does not appear in base
    pub added_left: Vec<NodeId>,
    /// Terminals of the right tree whose identifier does not appear in base
    pub added_right: Vec<NodeId>,
    /// Base declarations absent from one side but present, under a new name
    /// and with an unchanged body, among that side's additions
    pub renamed_without_body_changes: Vec<(Side, NodeId)>,
    /// Base declarations absent from one side with no addition carrying
    /// their body: deleted, or renamed with body changes
    pub deleted_or_renamed_with_body_changes: Vec<(Side, NodeId)>,
    /// The line-based merge of the raw files, kept in chunk form
    pub unstructured: ParsedMerge,
    /// The same line-based merge, rendered with the configured markers
    pub unstructured_output: String,
    pub settings: DisplaySettings,
    pub config: MergeConfig,
    pub diagnostics: Diagnostics,
}

impl MergeContext {
    pub fn contribution_tree(&self, side: Side) -> &DeclTree {
        match side {
            Side::Left => &self.left_tree,
            Side::Right => &self.right_tree,
        }
    }

    pub fn added_nodes(&self, side: Side) -> &[NodeId] {
        match side {
            Side::Left => &self.added_left,
            Side::Right => &self.added_right,
        }
    }
}
