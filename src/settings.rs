/// Parameters controlling how conflicts are rendered in the merged output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    /// The number of characters for conflict markers (7 by default)
    pub conflict_marker_size: usize,
    /// The string that identifies the left revision in conflict markers
    pub left_revision_name: String,
    /// The string that identifies the base revision in conflict markers
    pub base_revision_name: String,
    /// The string that identifies the right revision in conflict markers
    pub right_revision_name: String,
}

impl DisplaySettings {
    /// The marker at the beginning of the "left" (first) part of a conflict.
    /// It does not contain any newline character.
    pub fn left_marker(&self) -> String {
        format!("{} {}", "<".repeat(self.conflict_marker_size), self.left_revision_name)
    }

    /// The marker at the beginning of the "base" part of a conflict.
    /// It does not contain any newline character.
    pub fn base_marker(&self) -> String {
        format!("{} {}", "|".repeat(self.conflict_marker_size), self.base_revision_name)
    }

    /// The marker at the end of the "right" (last) part of a conflict.
    /// It does not contain any newline character.
    pub fn right_marker(&self) -> String {
        format!("{} {}", ">".repeat(self.conflict_marker_size), self.right_revision_name)
    }

    /// The marker separating the "base" and "right" parts of a conflict.
    /// It does not contain any newline character.
    pub fn middle_marker(&self) -> String {
        "=".repeat(self.conflict_marker_size)
    }

    /// Renders a full conflict block.
    ///
    /// The block starts directly with the left marker and ends with the right
    /// marker, without a trailing newline. Sections are padded with a newline
    /// when they do not already end with one.
    pub fn render_conflict(&self, left: &str, base: &str, right: &str) -> String {
        let mut output = String::new();
        output.push_str(&self.left_marker());
        output.push('\n');
        if !left.trim().is_empty() {
            output.push_str(left);
        }
        Self::close_section(&mut output);
        output.push_str(&self.base_marker());
        output.push('\n');
        if !base.trim().is_empty() {
            output.push_str(base);
        }
        Self::close_section(&mut output);
        output.push_str(&self.middle_marker());
        output.push('\n');
        if !right.trim().is_empty() {
            output.push_str(right);
        }
        Self::close_section(&mut output);
        output.push_str(&self.right_marker());
        output
    }

    fn close_section(output: &mut String) {
        if !output.ends_with('\n') {
            output.push('\n');
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            conflict_marker_size: 7,
            left_revision_name: "MINE".to_string(),
            base_revision_name: "BASE".to_string(),
            right_revision_name: "YOURS".to_string(),
        }
    }
}
