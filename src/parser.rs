//! Turns a source file into a [`DeclTree`].
//!
//! The tree-sitter syntax tree is flattened into the coarse declaration tree:
//! type declarations become containers, their members become terminals whose
//! body is the exact source span of the member. Text between declarations
//! (whitespace, comments) is attached as the prefix of the following node, so
//! an unmodified tree serializes back to the original file byte for byte.

use itertools::Itertools;
use tree_sitter::{Node as TsNode, Parser as TsParser};

use crate::{
    error::ParseError,
    lang::LangProfile,
    similarity::strip_whitespace,
    tree::{DeclTree, Node, NodeId, NodeKind},
};

/// Identifier shared by all instance initializer blocks; they carry no name
/// and are re-matched by body similarity in a dedicated handler.
pub const INITIALIZER_IDENTIFIER: &str = "<initializer>";
/// Identifier shared by all static initializer blocks.
pub const STATIC_INITIALIZER_IDENTIFIER: &str = "<static-initializer>";
/// Identifier of the package declaration (at most one per file).
pub const PACKAGE_IDENTIFIER: &str = "<package>";

/// Parses a source text into a declaration tree.
///
/// Fails if the grammar cannot be loaded or if the parse contains errors:
/// merging a file we do not fully understand structurally is worse than
/// falling back to a line-based merge.
pub fn parse_declarations(source: &str, lang_profile: &LangProfile) -> Result<DeclTree, ParseError> {
    let mut parser = TsParser::new();
    parser
        .set_language(&lang_profile.language)
        .map_err(|err| ParseError(format!("error loading {} grammar: {err}", lang_profile.name)))?;
    let ts_tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError("tree-sitter did not return a tree".to_string()))?;
    let root = ts_tree.root_node();
    if root.has_error() {
        return Err(ParseError("the file contains syntax errors".to_string()));
    }

    let mut tree = DeclTree::new(Node::container(NodeKind::CompilationUnit, ""));
    let compilation_unit = tree.root();
    let builder = Builder { source };
    builder.fill_container(&mut tree, compilation_unit, root, "", 0, source.len())?;
    Ok(tree)
}

struct Builder<'s> {
    source: &'s str,
}

impl Builder<'_> {
    fn text(&self, node: TsNode) -> &str {
        &self.source[node.byte_range()]
    }

    /// Populates `container` with the members found directly under `ts_node`
    /// (the compilation unit or a type body), threading the byte offset so
    /// that inter-declaration text ends up in prefixes and the footer.
    fn fill_container(
        &self,
        tree: &mut DeclTree,
        container: NodeId,
        ts_node: TsNode,
        qualifier: &str,
        children_start: usize,
        children_end: usize,
    ) -> Result<(), ParseError> {
        let mut prev_end = children_start;
        let members = self.member_nodes(ts_node);
        for member in members {
            let prefix = self.source[prev_end..member.start_byte()].to_string();
            let child = self.build_member(tree, member, qualifier)?;
            tree.node_mut(child).prefix = prefix;
            tree.attach_child(container, child);
            prev_end = member.end_byte();
        }
        tree.node_mut(container).footer.push_str(&self.source[prev_end..children_end]);
        Ok(())
    }

    /// The declaration-level children of a compilation unit or type body,
    /// with comments skipped (they travel with the prefix of the next
    /// declaration) and enum bodies flattened.
    fn member_nodes<'t>(&self, ts_node: TsNode<'t>) -> Vec<TsNode<'t>> {
        let mut members = Vec::new();
        let mut cursor = ts_node.walk();
        for child in ts_node.named_children(&mut cursor) {
            if child.is_extra() {
                continue;
            }
            if child.kind() == "enum_body_declarations" {
                let mut inner_cursor = child.walk();
                members.extend(child.named_children(&mut inner_cursor).filter(|c| !c.is_extra()));
            } else {
                members.push(child);
            }
        }
        members
    }

    fn build_member(
        &self,
        tree: &mut DeclTree,
        ts_node: TsNode,
        qualifier: &str,
    ) -> Result<NodeId, ParseError> {
        match ts_node.kind() {
            "class_declaration" | "record_declaration" => {
                self.build_container(tree, ts_node, NodeKind::Class, qualifier)
            }
            "interface_declaration" => {
                self.build_container(tree, ts_node, NodeKind::Interface, qualifier)
            }
            "enum_declaration" => self.build_container(tree, ts_node, NodeKind::Enum, qualifier),
            "method_declaration" => Ok(self.build_callable(tree, ts_node, NodeKind::Method)),
            "constructor_declaration" | "compact_constructor_declaration" => {
                Ok(self.build_callable(tree, ts_node, NodeKind::Constructor))
            }
            "field_declaration" | "constant_declaration" => Ok(self.build_field(tree, ts_node)),
            "static_initializer" => Ok(tree.add_node(Node::terminal(
                NodeKind::InitializerBlock,
                STATIC_INITIALIZER_IDENTIFIER,
                self.text(ts_node),
            ))),
            "block" => Ok(tree.add_node(Node::terminal(
                NodeKind::InitializerBlock,
                INITIALIZER_IDENTIFIER,
                self.text(ts_node),
            ))),
            "import_declaration" => Ok(self.build_import(tree, ts_node)),
            "package_declaration" => Ok(tree.add_node(Node::terminal(
                NodeKind::Other,
                PACKAGE_IDENTIFIER,
                self.text(ts_node),
            ))),
            "enum_constant" => {
                let name = self.field_text(ts_node, "name").unwrap_or_default();
                let mut node = Node::terminal(NodeKind::Other, name.clone(), self.text(ts_node));
                node.name = name;
                Ok(tree.add_node(node))
            }
            kind => Ok(tree.add_node(Node::terminal(
                NodeKind::Other,
                format!("<{kind}>"),
                self.text(ts_node),
            ))),
        }
    }

    fn build_container(
        &self,
        tree: &mut DeclTree,
        ts_node: TsNode,
        kind: NodeKind,
        qualifier: &str,
    ) -> Result<NodeId, ParseError> {
        let name = self.field_text(ts_node, "name").unwrap_or_default();
        let identifier = if qualifier.is_empty() {
            name.clone()
        } else {
            format!("{qualifier}.{name}")
        };
        let Some(body) = ts_node.child_by_field_name("body") else {
            // a bodyless type declaration is kept opaque
            let mut node =
                Node::terminal(NodeKind::Other, identifier, self.text(ts_node));
            node.name = name;
            return Ok(tree.add_node(node));
        };
        let mut node = Node::container(kind, identifier.clone());
        node.name = name;
        // the header runs up to and including the opening brace of the body
        node.header = self.source[ts_node.start_byte()..=body.start_byte()].to_string();
        let id = tree.add_node(node);
        self.fill_container(
            tree,
            id,
            body,
            &identifier,
            body.start_byte() + 1,
            ts_node.end_byte(),
        )?;
        Ok(id)
    }

    fn build_callable(&self, tree: &mut DeclTree, ts_node: TsNode, kind: NodeKind) -> NodeId {
        let name = self.field_text(ts_node, "name").unwrap_or_default();
        let param_types = self.parameter_types(ts_node);
        let identifier = format!("{name}({})", param_types.iter().join(","));
        let mut node = Node::terminal(kind, identifier, self.text(ts_node));
        node.name = name;
        node.param_types = param_types;
        node.return_type = (kind == NodeKind::Method)
            .then(|| self.field_text(ts_node, "type").map(|t| strip_whitespace(&t)))
            .flatten();
        tree.add_node(node)
    }

    fn parameter_types(&self, ts_node: TsNode) -> Vec<String> {
        let Some(parameters) = ts_node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = parameters.walk();
        parameters
            .named_children(&mut cursor)
            .filter_map(|parameter| match parameter.kind() {
                "formal_parameter" => parameter
                    .child_by_field_name("type")
                    .map(|t| strip_whitespace(self.text(t))),
                "spread_parameter" => {
                    // the type is the first named child, the declarator comes after
                    let mut inner = parameter.walk();
                    parameter
                        .named_children(&mut inner)
                        .next()
                        .map(|t| format!("{}...", strip_whitespace(self.text(t))))
                }
                _ => None,
            })
            .collect()
    }

    fn build_field(&self, tree: &mut DeclTree, ts_node: TsNode) -> NodeId {
        let mut cursor = ts_node.walk();
        let names: Vec<String> = ts_node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "variable_declarator")
            .filter_map(|declarator| {
                declarator.child_by_field_name("name").map(|n| self.text(n).to_string())
            })
            .collect();
        let name = names.first().cloned().unwrap_or_default();
        let mut node = Node::terminal(NodeKind::Field, names.iter().join(","), self.text(ts_node));
        node.name = name;
        tree.add_node(node)
    }

    fn build_import(&self, tree: &mut DeclTree, ts_node: TsNode) -> NodeId {
        let text = self.text(ts_node);
        let inner = text.trim().strip_prefix("import").unwrap_or(text).trim_start();
        let (is_static, inner) = match inner.strip_prefix("static") {
            Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim_start()),
            _ => (false, inner),
        };
        let path = strip_whitespace(inner.trim_end().trim_end_matches(';'));
        let identifier = if is_static { format!("static {path}") } else { path.clone() };
        let mut node = Node::terminal(NodeKind::Import, identifier, text);
        node.name = path;
        tree.add_node(node)
    }

    fn field_text(&self, ts_node: TsNode, field: &str) -> Option<String> {
        ts_node.child_by_field_name(field).map(|n| self.text(n).to_string())
    }
}
