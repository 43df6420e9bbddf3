//! The coarse declaration tree that semistructured merging operates on.
//!
//! A source file is partitioned into named declarations: containers
//! (compilation unit, classes, interfaces, enums) whose children are ordered,
//! and terminals (methods, constructors, fields, initializer blocks, imports)
//! whose text is treated as an opaque body. Nodes live in an index arena owned
//! by the tree, so handlers can freely edit child lists without fighting
//! ownership: a [`NodeId`] stays valid for the lifetime of its tree.

use std::fmt;

/// Index of a node inside its owning [`DeclTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The kind of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    CompilationUnit,
    Class,
    Interface,
    Enum,
    Method,
    Constructor,
    Field,
    InitializerBlock,
    Import,
    /// Anything we do not model structurally (package declarations,
    /// enum constants, stray semicolons, ...)
    Other,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        matches!(self, Self::CompilationUnit | Self::Class | Self::Interface | Self::Enum)
    }

    /// Kinds handled by the renaming/deletion recovery
    pub fn is_callable(self) -> bool {
        matches!(self, Self::Method | Self::Constructor)
    }
}

/// A single declaration.
///
/// Containers use `header`/`footer` to hold the text surrounding their child
/// list (for a class: everything up to and including the opening brace, and
/// the closing brace). Terminals hold their full source text in `body`.
/// `prefix` is the text separating a node from its preceding sibling
/// (whitespace and comments), so that concatenating prefixes, headers, bodies
/// and footers in document order reproduces the file byte for byte.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Matching key: qualified name for containers, signature for methods and
    /// constructors, declared name(s) for fields, import path for imports.
    /// Derived from the signature only, never from the body.
    pub identifier: String,
    /// Simple name (empty for nodes without one)
    pub name: String,
    /// Parameter types, for methods and constructors
    pub param_types: Vec<String>,
    /// Return type, for methods
    pub return_type: Option<String>,
    pub prefix: String,
    pub header: String,
    pub footer: String,
    pub body: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    /// A fresh container node with no children attached yet.
    pub fn container(kind: NodeKind, identifier: impl Into<String>) -> Self {
        debug_assert!(kind.is_container());
        Self {
            kind,
            identifier: identifier.into(),
            name: String::new(),
            param_types: Vec::new(),
            return_type: None,
            prefix: String::new(),
            header: String::new(),
            footer: String::new(),
            body: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// A fresh terminal node.
    pub fn terminal(kind: NodeKind, identifier: impl Into<String>, body: impl Into<String>) -> Self {
        debug_assert!(!kind.is_container());
        Self {
            kind,
            identifier: identifier.into(),
            name: String::new(),
            param_types: Vec::new(),
            return_type: None,
            prefix: String::new(),
            header: String::new(),
            footer: String::new(),
            body: body.into(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Do two nodes denote the same declaration, as far as identifier-based
    /// matching can tell?
    pub fn matches(&self, other: &Self) -> bool {
        self.kind == other.kind && self.identifier == other.identifier
    }
}

/// A declaration tree: an arena of [`Node`]s plus the id of the root
/// (always a [`NodeKind::CompilationUnit`]).
#[derive(Debug, Clone)]
pub struct DeclTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DeclTree {
    /// Creates a tree holding just the given root node.
    pub fn new(root: Node) -> Self {
        Self { nodes: vec![root], root: NodeId(0) }
    }

    /// An empty compilation unit (the tree of an absent file).
    pub fn empty() -> Self {
        Self::new(Node::container(NodeKind::CompilationUnit, ""))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Makes `id` the new root. The previous root stays in the arena,
    /// unreachable.
    pub fn set_root(&mut self, id: NodeId) {
        self.nodes[id.index()].parent = None;
        self.root = id;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Adds a node to the arena without attaching it anywhere.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Appends `child` at the end of `parent`'s child list.
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Replaces `parent`'s child list, updating the back-references.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child.index()].parent = Some(parent);
        }
        self.nodes[parent.index()].children = children;
    }

    /// Detaches `child` from its parent. The node stays in the arena but is
    /// no longer reachable from the root.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.index()].parent {
            self.nodes[parent.index()].children.retain(|&c| c != child);
            self.nodes[child.index()].parent = None;
        }
    }

    /// All terminals of the tree, depth-first, children in declared order.
    /// Handlers rely on this order for deterministic tie-breaks.
    pub fn terminals(&self) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_terminals(self.root, &mut result);
        result
    }

    fn collect_terminals(&self, id: NodeId, result: &mut Vec<NodeId>) {
        let node = self.node(id);
        if node.kind.is_container() {
            for &child in &node.children {
                self.collect_terminals(child, result);
            }
        } else {
            result.push(id);
        }
    }

    /// All containers of the tree (root included), depth-first.
    pub fn containers(&self) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_containers(self.root, &mut result);
        result
    }

    fn collect_containers(&self, id: NodeId, result: &mut Vec<NodeId>) {
        if self.node(id).kind.is_container() {
            result.push(id);
            for &child in &self.node(id).children {
                self.collect_containers(child, result);
            }
        }
    }

    /// The first terminal matching `like` by kind and identifier,
    /// in traversal order.
    pub fn find_terminal(&self, like: &Node) -> Option<NodeId> {
        self.terminals().into_iter().find(|&id| self.node(id).matches(like))
    }

    /// Is a declaration with this kind and identifier present in the tree?
    pub fn contains(&self, like: &Node) -> bool {
        self.find_terminal(like).is_some()
    }

    /// Unindents a node so that a conflict block stored in its body starts
    /// at a line boundary, where merge tooling expects the markers.
    pub fn dedent_before_conflict(&mut self, id: NodeId) {
        let prefix = &mut self.nodes[id.index()].prefix;
        while prefix.ends_with(' ') || prefix.ends_with('\t') {
            prefix.pop();
        }
    }

    /// Deep-copies a subtree of `source` into this arena and returns the id
    /// of the copied root, left detached.
    pub fn import_subtree(&mut self, source: &Self, source_id: NodeId) -> NodeId {
        let mut node = source.node(source_id).clone();
        let source_children = std::mem::take(&mut node.children);
        node.parent = None;
        let id = self.add_node(node);
        let children = source_children
            .iter()
            .map(|&child| {
                let copied = self.import_subtree(source, child);
                self.nodes[copied.index()].parent = Some(id);
                copied
            })
            .collect();
        self.nodes[id.index()].children = children;
        id
    }

    /// Serializes the tree back to source text.
    pub fn to_source(&self) -> String {
        let mut output = String::new();
        self.write_node(self.root, &mut output);
        output
    }

    fn write_node(&self, id: NodeId, output: &mut String) {
        let node = self.node(id);
        output.push_str(&node.prefix);
        if node.kind.is_container() {
            output.push_str(&node.header);
            for &child in &node.children {
                self.write_node(child, output);
            }
            output.push_str(&node.footer);
        } else {
            output.push_str(&node.body);
        }
    }
}
