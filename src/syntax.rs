//! Immutable syntax arena for JavaScript and TypeScript sources.
//!
//! Sources are parsed with tree-sitter and lowered into a flat `Vec` of
//! [`SyntaxNode`]s addressed by [`NodeId`]. Each node knows its parent, so the
//! chain relation in [`crate::chain`] is a pure walk over indices. Only the
//! shapes that matter to chain resolution are modelled; everything else is
//! [`NodeKind::Other`].

use crate::error::{GuardError, Result};
use anyhow::Context;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Extensions of the source files that can be analyzed.
pub const SUPPORTED_EXTENSIONS: [&str; 8] = ["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// Grammar used to parse a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDialect {
    JavaScript,
    TypeScript,
    Tsx,
}

impl SourceDialect {
    /// Dialect for a file extension without the dot; `None` when unsupported.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::JavaScript),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    /// Dialect for `path`, decided by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    fn language(self) -> tree_sitter::Language {
        match self {
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Index of a node in its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena; ids are assigned in pre-order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Byte range plus 1-based start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// `callee(arguments...)`. A tagged template has its template as the
    /// single argument.
    Call {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    /// `object.property`, including optional chaining.
    Member { object: NodeId, property: String },
    /// Plain identifier or `this`.
    Identifier(String),
    /// Wrapper with no effect on chaining: parentheses, `x!`, `x as T`,
    /// `x satisfies T`.
    Transparent(NodeId),
    /// Any function body boundary.
    Function,
    /// Anything else, tagged with its grammar kind.
    Other(&'static str),
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub span: Span,
}

/// Lowered parse of one source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    source: String,
    has_errors: bool,
}

fn parser_for(dialect: SourceDialect) -> anyhow::Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&dialect.language())
        .context("Failed to set tree-sitter language")?;
    Ok(parser)
}

impl SyntaxTree {
    /// Parses `source` and lowers it into an arena.
    ///
    /// Syntax errors do not fail the parse; tree-sitter recovers and the
    /// recovered tree is used. [`SyntaxTree::has_errors`] reports whether that
    /// happened.
    ///
    /// # Errors
    ///
    /// [`GuardError::ParseError`] when the grammar cannot be loaded or the
    /// parser gives up.
    pub fn parse(source: &str, dialect: SourceDialect) -> Result<Self> {
        let tree = parser_for(dialect)
            .and_then(|mut parser| {
                parser
                    .parse(source, None)
                    .context("tree-sitter returned no tree")
            })
            .map_err(|e| GuardError::parse_error(format!("{e:#}")))?;

        let root = tree.root_node();
        let mut lowered = Self {
            nodes: Vec::new(),
            source: source.to_string(),
            has_errors: root.has_error(),
        };
        lowered.lower(root);
        Ok(lowered)
    }

    /// The root node (the program).
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether tree-sitter had to recover from syntax errors.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// # Panics
    ///
    /// When `id` comes from a different tree.
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    /// Lowered kind of `id`.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Parent of `id`; `None` only for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Byte range and 1-based start position of `id`.
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span
    }

    /// Source text covered by `id`.
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.span(id);
        &self.source[span.start_byte..span.end_byte]
    }

    /// All node ids in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Follows transparent wrappers down to the wrapped expression.
    pub fn strip(&self, mut id: NodeId) -> NodeId {
        while let NodeKind::Transparent(inner) = self.kind(id) {
            id = *inner;
        }
        id
    }

    /// Climbs out of the transparent wrappers enclosing `id`.
    pub fn lift(&self, mut id: NodeId) -> NodeId {
        while let Some(parent) = self.parent(id)
            && matches!(self.kind(parent), NodeKind::Transparent(inner) if *inner == id)
        {
            id = parent;
        }
        id
    }

    /// Lowers the tree rooted at `root` without recursing, so nesting depth
    /// is bounded by heap, not stack.
    ///
    /// Nodes are pushed in pre-order, then classified in reverse so every
    /// child is classified before its parent.
    fn lower(&mut self, root: Node<'_>) {
        let mut pending = vec![(root, None)];
        let mut visited: Vec<Node<'_>> = Vec::new();
        while let Some((node, parent)) = pending.pop() {
            let id = NodeId(self.nodes.len());
            let start = node.start_position();
            self.nodes.push(SyntaxNode {
                kind: NodeKind::Other(node.kind()),
                parent,
                children: Vec::new(),
                span: Span {
                    start_byte: node.start_byte(),
                    end_byte: node.end_byte(),
                    line: start.row + 1,
                    column: start.column + 1,
                },
            });
            if let Some(parent) = parent {
                self.nodes[parent.0].children.push(id);
            }
            visited.push(node);

            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "comment")
                .collect();
            pending.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        }

        for (index, node) in visited.iter().enumerate().rev() {
            let children: Vec<(usize, NodeId)> = self.nodes[index]
                .children
                .iter()
                .map(|child| (visited[child.0].id(), *child))
                .collect();
            let kind = self.classify(*node, &children);
            self.nodes[index].kind = kind;
        }
    }

    fn classify(&self, node: Node<'_>, children: &[(usize, NodeId)]) -> NodeKind {
        let lookup = |field: &str| -> Option<NodeId> {
            let target = node.child_by_field_name(field)?;
            children
                .iter()
                .find(|(ts_id, _)| *ts_id == target.id())
                .map(|(_, id)| *id)
        };

        match node.kind() {
            "call_expression" => {
                let Some(callee) = lookup("function") else {
                    return NodeKind::Other("call_expression");
                };
                let arguments = match lookup("arguments") {
                    Some(args) => match self.kind(args) {
                        NodeKind::Other("arguments") => self.node(args).children.clone(),
                        _ => vec![args],
                    },
                    None => Vec::new(),
                };
                NodeKind::Call { callee, arguments }
            }
            "member_expression" => match (lookup("object"), node.child_by_field_name("property")) {
                (Some(object), Some(property)) => NodeKind::Member {
                    object,
                    property: self.source[property.start_byte()..property.end_byte()].to_string(),
                },
                _ => NodeKind::Other("member_expression"),
            },
            "identifier" | "this" => {
                NodeKind::Identifier(self.source[node.start_byte()..node.end_byte()].to_string())
            }
            "parenthesized_expression"
            | "non_null_expression"
            | "as_expression"
            | "satisfies_expression" => match children.first() {
                Some((_, inner)) => NodeKind::Transparent(*inner),
                None => NodeKind::Other(node.kind()),
            },
            "arrow_function"
            | "function_expression"
            | "function"
            | "function_declaration"
            | "generator_function"
            | "generator_function_declaration"
            | "method_definition" => NodeKind::Function,
            other => NodeKind::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calls(tree: &SyntaxTree) -> Vec<NodeId> {
        tree.ids()
            .filter(|id| matches!(tree.kind(*id), NodeKind::Call { .. }))
            .collect()
    }

    #[test]
    fn test_dialect_from_extension() {
        assert_eq!(SourceDialect::from_extension("ts"), Some(SourceDialect::TypeScript));
        assert_eq!(SourceDialect::from_extension("tsx"), Some(SourceDialect::Tsx));
        assert_eq!(SourceDialect::from_extension("mjs"), Some(SourceDialect::JavaScript));
        assert_eq!(SourceDialect::from_extension("rs"), None);
        assert_eq!(
            SourceDialect::from_path(Path::new("src/db/queries.cts")),
            Some(SourceDialect::TypeScript)
        );
    }

    #[test]
    fn test_lowers_method_call() {
        let tree = SyntaxTree::parse("db.delete(users);", SourceDialect::JavaScript).unwrap();
        let calls = calls(&tree);
        assert_eq!(calls.len(), 1);
        let NodeKind::Call { callee, arguments } = tree.kind(calls[0]) else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 1);
        assert_eq!(tree.text(arguments[0]), "users");
        let NodeKind::Member { object, property } = tree.kind(*callee) else {
            panic!("expected member callee");
        };
        assert_eq!(property, "delete");
        assert_eq!(tree.kind(*object), &NodeKind::Identifier("db".to_string()));
    }

    #[test]
    fn test_parent_links_are_consistent() {
        let tree = SyntaxTree::parse(
            "const x = db.delete(users).where(eq(users.id, 1));",
            SourceDialect::TypeScript,
        )
        .unwrap();
        assert_eq!(tree.parent(tree.root()), None);
        for id in tree.ids().skip(1) {
            let parent = tree.parent(id).unwrap();
            assert!(tree.node(parent).children.contains(&id));
            assert!(parent < id);
        }
    }

    #[test]
    fn test_non_null_and_parentheses_are_transparent() {
        let tree = SyntaxTree::parse("(db!).delete(users);", SourceDialect::TypeScript).unwrap();
        let call = calls(&tree)[0];
        let NodeKind::Call { callee, .. } = tree.kind(call) else {
            panic!("expected call");
        };
        let NodeKind::Member { object, .. } = tree.kind(*callee) else {
            panic!("expected member callee");
        };
        let inner = tree.strip(*object);
        assert_eq!(tree.text(inner), "db");
        assert_eq!(tree.lift(inner), *object);
    }

    #[test]
    fn test_tagged_template_is_a_single_argument() {
        let tree = SyntaxTree::parse("const v = sql`views + 1`;", SourceDialect::TypeScript).unwrap();
        let call = calls(&tree)[0];
        let NodeKind::Call { arguments, .. } = tree.kind(call) else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 1);
    }

    #[test]
    fn test_arrow_function_is_a_boundary() {
        let tree = SyntaxTree::parse("run((q) => q.where(x));", SourceDialect::JavaScript).unwrap();
        assert!(tree.ids().any(|id| tree.kind(id) == &NodeKind::Function));
    }

    #[test]
    fn test_positions_are_one_based() {
        let tree = SyntaxTree::parse("\n  db.delete(users);", SourceDialect::JavaScript).unwrap();
        let span = tree.span(calls(&tree)[0]);
        assert_eq!((span.line, span.column), (2, 3));
    }

    #[test]
    fn test_very_long_chain_is_lowered() {
        let mut source = String::from("db.delete(users)");
        source.push_str(&".returning()".repeat(20_000));
        source.push(';');
        let tree = SyntaxTree::parse(&source, SourceDialect::TypeScript).unwrap();
        assert_eq!(calls(&tree).len(), 20_001);
        for id in tree.ids().skip(1) {
            assert!(tree.parent(id).unwrap() < id);
        }
    }

    #[test]
    fn test_children_keep_source_order() {
        let tree = SyntaxTree::parse("f(a, /* note */ b, c);", SourceDialect::JavaScript).unwrap();
        let NodeKind::Call { arguments, .. } = tree.kind(calls(&tree)[0]) else {
            panic!("expected call");
        };
        let texts: Vec<&str> = arguments.iter().map(|id| tree.text(*id)).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn test_recovers_from_syntax_errors() {
        let tree = SyntaxTree::parse("db.delete(users;", SourceDialect::JavaScript).unwrap();
        assert!(tree.has_errors());
    }
}
