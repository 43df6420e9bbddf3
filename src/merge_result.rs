use crate::{context::Diagnostics, parsed_merge::ParsedMerge, settings::DisplaySettings};

/// A merged output (represented as a string) together with statistics
/// about the conflicts it contains.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MergeResult {
    /// The output of the merge (the file contents possibly with conflicts)
    pub contents: String,
    /// The number of conflicts
    pub conflict_count: usize,
    /// The sum of the sizes of conflicts
    pub conflict_mass: usize,
    /// A name for the merge, identifying with which technique it was produced
    pub method: &'static str,
    /// Counts of the situations the conflict handlers intervened on
    pub diagnostics: Diagnostics,
}

impl MergeResult {
    pub(crate) fn from_parsed_merge(
        parsed: &ParsedMerge,
        method: &'static str,
        settings: &DisplaySettings,
    ) -> Self {
        Self {
            contents: parsed.render(settings),
            conflict_count: parsed.conflict_count(),
            conflict_mass: parsed.conflict_mass(),
            method,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Builds a result by scanning `contents` for conflict markers.
    ///
    /// Used for outputs assembled from a declaration tree, where marker
    /// blocks are embedded in the serialized text rather than tracked as
    /// chunks.
    pub(crate) fn from_contents(
        contents: String,
        method: &'static str,
        settings: &DisplaySettings,
    ) -> Self {
        let (conflict_count, conflict_mass) = scan_conflicts(&contents, settings);
        Self { contents, conflict_count, conflict_mass, method, diagnostics: Diagnostics::default() }
    }
}

/// Counts conflict blocks and their total size by scanning for marker lines.
fn scan_conflicts(contents: &str, settings: &DisplaySettings) -> (usize, usize) {
    let size = settings.conflict_marker_size;
    let start: String = "<".repeat(size);
    let middle: String = "=".repeat(size);
    let base: String = "|".repeat(size);
    let end: String = ">".repeat(size);
    let is_marker = |line: &str, marker: &str| {
        line.starts_with(marker) && !line.starts_with(&format!("{marker}{}", &marker[..1]))
    };

    let mut count = 0;
    let mut mass = 0;
    let mut in_conflict = false;
    for line in contents.lines() {
        if !in_conflict && is_marker(line, &start) {
            in_conflict = true;
        } else if in_conflict && is_marker(line, &end) {
            in_conflict = false;
            count += 1;
        } else if in_conflict && !is_marker(line, &base) && !is_marker(line, &middle) {
            mass += line.len() + 1;
        }
    }
    (count, mass)
}
