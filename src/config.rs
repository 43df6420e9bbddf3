/// Policy applied by the renaming/deletion handler when a rename or deletion
/// collides with an edit of the same declaration on the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RenamingStrategy {
    /// Surface every collision as an explicit conflict block
    #[default]
    Safe,
    /// Keep both the renamed and the edited declaration as siblings
    KeepBoth,
    /// Re-run a three-way textual merge over the colliding bodies and
    /// install the result under the renamed declaration
    Merge,
    /// Splice in the corresponding hunk of the line-based merge
    UnstructuredMerge,
}

impl std::fmt::Display for RenamingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Safe => "safe",
            Self::KeepBoth => "keep-both",
            Self::Merge => "merge",
            Self::UnstructuredMerge => "unstructured-merge",
        })
    }
}

/// Process-wide merge configuration, immutable once built from the CLI.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub renaming_strategy: RenamingStrategy,
    /// Collapse equal declarations added on both sides, conflict on unequal ones
    pub handle_duplicate_declarations: bool,
    /// Re-match initializer blocks across revisions by body similarity
    pub handle_initialization_blocks: bool,
    /// Flag new declarations which reference a declaration edited on the other side
    pub handle_new_element_referencing_edited_one: bool,
    /// Recover method/constructor renamings and deletions lost by superimposition
    pub handle_method_and_constructor_renaming_deletion: bool,
    /// Flag imports added on both sides which make a simple type name ambiguous
    pub handle_type_ambiguity_error: bool,
    /// Treat whitespace-only body differences as no difference at all
    pub ignore_whitespace_change: bool,
    /// Match renamed declarations against the most similar candidate instead
    /// of the first sufficiently similar one in traversal order
    pub prefer_most_similar: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            renaming_strategy: RenamingStrategy::default(),
            handle_duplicate_declarations: true,
            handle_initialization_blocks: true,
            handle_new_element_referencing_edited_one: true,
            handle_method_and_constructor_renaming_deletion: true,
            handle_type_ambiguity_error: true,
            ignore_whitespace_change: false,
            prefer_most_similar: false,
        }
    }
}
