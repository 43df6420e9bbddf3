//! Detection of import pairs that make a simple type name ambiguous.
//!
//! When one side imports `a.Widget` and the other imports `b.Widget`, the
//! superimposed file carries both and every unqualified use of `Widget`
//! stops compiling. Superimposition cannot see this because the two imports
//! have different identifiers.

use crate::{context::MergeContext, error::TextualMergeError, tree::NodeKind};

use super::ConflictHandler;

pub struct TypeAmbiguityHandler;

impl ConflictHandler for TypeAmbiguityHandler {
    fn name(&self) -> &'static str {
        "type_ambiguity"
    }

    fn handle(&self, context: &mut MergeContext) -> Result<(), TextualMergeError> {
        let left_imports: Vec<_> = context
            .added_left
            .iter()
            .map(|&id| context.left_tree.node(id))
            .filter(|node| node.kind == NodeKind::Import)
            .cloned()
            .collect();
        let right_imports: Vec<_> = context
            .added_right
            .iter()
            .map(|&id| context.right_tree.node(id))
            .filter(|node| node.kind == NodeKind::Import)
            .cloned()
            .collect();

        for left in &left_imports {
            for right in &right_imports {
                if left.identifier == right.identifier
                    || simple_type_name(&left.name) != simple_type_name(&right.name)
                    || simple_type_name(&left.name) == "*"
                {
                    continue;
                }
                let (Some(left_corr), Some(right_corr)) = (
                    context.superimposed.find_terminal(left),
                    context.superimposed.find_terminal(right),
                ) else {
                    continue;
                };
                let conflict = context.settings.render_conflict(&left.body, "", &right.body);
                context.superimposed.detach(right_corr);
                context.superimposed.node_mut(left_corr).body = conflict;
                context.superimposed.dedent_before_conflict(left_corr);
                context.diagnostics.import_ambiguities += 1;
            }
        }
        Ok(())
    }
}

/// The last segment of an import path (`a.b.C` gives `C`, `a.b.*` gives `*`).
fn simple_type_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MergeConfig, test_utils::context_from_sources};

    #[test]
    fn clashing_imports_are_conflicted() {
        let base = "class C {\n}\n";
        let left = "import java.util.List;\n\nclass C {\n}\n";
        let right = "import java.awt.List;\n\nclass C {\n}\n";
        let mut context = context_from_sources(base, left, right, MergeConfig::default());
        TypeAmbiguityHandler.handle(&mut context).unwrap();
        let output = context.superimposed.to_source();
        assert!(output.contains("<<<<<<< MINE\nimport java.util.List;\n"));
        assert!(output.contains("=======\nimport java.awt.List;\n>>>>>>> YOURS"));
        assert_eq!(context.diagnostics.import_ambiguities, 1);
        // the clashing import appears only inside the conflict
        assert_eq!(output.matches("java.awt.List").count(), 1);
    }

    #[test]
    fn distinct_simple_names_do_not_clash() {
        let base = "class C {\n}\n";
        let left = "import java.util.List;\n\nclass C {\n}\n";
        let right = "import java.util.Map;\n\nclass C {\n}\n";
        let mut context = context_from_sources(base, left, right, MergeConfig::default());
        TypeAmbiguityHandler.handle(&mut context).unwrap();
        assert_eq!(context.diagnostics.import_ambiguities, 0);
        assert!(!context.superimposed.to_source().contains("<<<<<<<"));
    }

    #[test]
    fn wildcard_imports_are_left_alone() {
        let base = "class C {\n}\n";
        let left = "import java.util.*;\n\nclass C {\n}\n";
        let right = "import java.awt.*;\n\nclass C {\n}\n";
        let mut context = context_from_sources(base, left, right, MergeConfig::default());
        TypeAmbiguityHandler.handle(&mut context).unwrap();
        assert_eq!(context.diagnostics.import_ambiguities, 0);
    }

    #[test]
    fn identical_imports_on_both_sides_are_fine() {
        let base = "class C {\n}\n";
        let both = "import java.util.List;\n\nclass C {\n}\n";
        let mut context = context_from_sources(base, both, both, MergeConfig::default());
        TypeAmbiguityHandler.handle(&mut context).unwrap();
        assert_eq!(context.diagnostics.import_ambiguities, 0);
    }
}
