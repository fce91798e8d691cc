//! Arena-backed lossless syntax tree.
//!
//! Nodes and tokens live in flat vectors and refer to each other by id.
//! Tokens are stored in document order, each with its leading trivia, so
//! the tree reproduces the input byte for byte. Construction goes through
//! [`TreeBuilder`], which only the parser uses; the finished tree is
//! read-only.

use std::fmt::Write as _;

use crate::ast::NodeKind;
use crate::token::{Span, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(usize);

impl TokenId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A child slot of a node, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Node(NodeId),
    Token(TokenId),
    /// Zero-width placeholder for a token the parser expected but did not
    /// find, located at `offset`.
    Missing {
        expected: &'static str,
        offset: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<Child>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    tokens: Vec<Token>,
    token_parents: Vec<NodeId>,
    root: NodeId,
}

impl SyntaxTree {
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[Child] {
        &self.nodes[id.0].children
    }

    /// Child nodes only, skipping tokens and placeholders.
    pub fn child_nodes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().filter_map(|child| match child {
            Child::Node(node) => Some(*node),
            _ => None,
        })
    }

    /// Direct token children of a node.
    pub fn child_tokens(&self, id: NodeId) -> impl Iterator<Item = &Token> + '_ {
        self.children(id).iter().filter_map(|child| match child {
            Child::Token(token) => Some(&self.tokens[token.0]),
            _ => None,
        })
    }

    #[must_use]
    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.0]
    }

    /// Node that owns a token as a direct child.
    #[must_use]
    pub fn token_parent(&self, id: TokenId) -> NodeId {
        self.token_parents[id.0]
    }

    /// All significant tokens in document order. Trivia hangs off each
    /// token's `leading_trivia`.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Ids of all significant tokens, in document order.
    pub fn token_ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        (0..self.tokens.len()).map(TokenId)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn sibling(&self, id: NodeId, step: isize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings: Vec<NodeId> = self.child_nodes(parent).collect();
        let index = siblings.iter().position(|&s| s == id)?;
        let target = index.checked_add_signed(step)?;
        siblings.get(target).copied()
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, 1)
    }

    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, -1)
    }

    /// `id` and every node below it, pre-order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Error nodes in document order.
    pub fn errors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.root)
            .filter(|&id| self.kind(id).is_error())
    }

    /// Missing-token placeholders in document order, with their parent.
    pub fn missing(&self) -> impl Iterator<Item = (NodeId, &'static str, usize)> + '_ {
        self.descendants(self.root).flat_map(move |id| {
            self.children(id).iter().filter_map(move |child| match *child {
                Child::Missing { expected, offset } => Some((id, expected, offset)),
                _ => None,
            })
        })
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.nodes.iter().any(|node| node.kind.is_error())
    }

    /// Innermost node whose span contains `offset`.
    #[must_use]
    pub fn covering_node(&self, offset: usize) -> NodeId {
        let mut current = self.root;
        'descend: loop {
            for child in self.child_nodes(current) {
                let span = self.span(child);
                if !span.is_empty() && span.contains_offset(offset) && offset < span.end {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Significant token whose span (or leading trivia) contains `offset`.
    #[must_use]
    pub fn covering_token(&self, offset: usize) -> Option<TokenId> {
        let index = self
            .tokens
            .partition_point(|token| token.span.end <= offset)
            .min(self.tokens.len().checked_sub(1)?);
        Some(TokenId(index))
    }

    /// Exact source text of the subtree at `id`, trivia included.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack: Vec<Child> = vec![Child::Node(id)];
        while let Some(child) = stack.pop() {
            match child {
                Child::Node(node) => stack.extend(self.children(node).iter().rev().copied()),
                Child::Token(token) => {
                    let token = &self.tokens[token.0];
                    for trivia in &token.leading_trivia {
                        out.push_str(&trivia.text);
                    }
                    out.push_str(&token.text);
                }
                Child::Missing { .. } => {}
            }
        }
        out
    }

    /// Lossless reconstruction of the whole input.
    #[must_use]
    pub fn text(&self) -> String {
        self.node_text(self.root)
    }

    /// Indented outline of the tree, one node, token or placeholder per
    /// line.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(Child, usize)> = vec![(Child::Node(self.root), 0)];
        while let Some((child, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            match child {
                Child::Node(id) => {
                    let node = self.node(id);
                    let _ = writeln!(
                        out,
                        "{indent}{} {}..{}",
                        describe_kind(&node.kind),
                        node.span.start,
                        node.span.end
                    );
                    stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
                }
                Child::Token(id) => {
                    let token = self.token(id);
                    let _ = writeln!(
                        out,
                        "{indent}{} {:?} {}..{}",
                        token.kind.describe(),
                        token.text,
                        token.span.start,
                        token.span.end
                    );
                }
                Child::Missing { expected, offset } => {
                    let _ = writeln!(out, "{indent}missing '{expected}' @{offset}");
                }
            }
        }
        out
    }
}

fn describe_kind(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Error { code, .. } => format!("Error({code})"),
        NodeKind::Variable { name } | NodeKind::Name { name } => {
            format!("{}({name})", kind.name())
        }
        NodeKind::Binary { op } | NodeKind::Assignment { op } => {
            format!("{}({})", kind.name(), op.as_str())
        }
        _ => kind.name().to_string(),
    }
}

/// Pre-order walk produced by [`SyntaxTree::descendants`].
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let before = self.stack.len();
        self.stack.extend(self.tree.child_nodes(id));
        self.stack[before..].reverse();
        Some(id)
    }
}

/// Position in the open node stack, used to wrap already-built children
/// in a node decided on later (binary operators, postfix chains, error
/// wrappers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    depth: usize,
    len: usize,
}

/// Bottom-up tree construction with a stack of open nodes.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    tokens: Vec<Token>,
    stack: Vec<Vec<Child>>,
    offset: usize,
}

impl TreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// End offset of the last token added.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub fn start_node(&mut self) {
        self.stack.push(Vec::new());
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            depth: self.stack.len(),
            len: self.stack.last().map_or(0, Vec::len),
        }
    }

    /// Open a node whose first child is whatever was added since
    /// `checkpoint`.
    pub fn start_node_at(&mut self, checkpoint: Checkpoint) {
        let depth = self.stack.len();
        let adopted = match self.stack.last_mut() {
            Some(frame) if checkpoint.depth == depth => {
                frame.split_off(checkpoint.len.min(frame.len()))
            }
            _ => Vec::new(),
        };
        self.stack.push(adopted);
    }

    /// Number of children added to the innermost open node since
    /// `checkpoint`.
    #[must_use]
    pub fn added_since(&self, checkpoint: Checkpoint) -> usize {
        if checkpoint.depth != self.stack.len() {
            return 0;
        }
        self.stack
            .last()
            .map_or(0, |frame| frame.len().saturating_sub(checkpoint.len))
    }

    pub fn token(&mut self, token: Token) -> TokenId {
        let id = TokenId(self.tokens.len());
        self.offset = token.span.end;
        self.tokens.push(token);
        self.push_child(Child::Token(id));
        id
    }

    /// Zero-width placeholder at the end of the last token.
    pub fn missing(&mut self, expected: &'static str) {
        self.push_child(Child::Missing {
            expected,
            offset: self.offset,
        });
    }

    pub fn finish_node(&mut self, kind: NodeKind) -> NodeId {
        let children = self.stack.pop().unwrap_or_default();
        let id = self.push_node(kind, children);
        self.push_child(Child::Node(id));
        id
    }

    /// Close every open node into the program root spanning `0..len`.
    #[must_use]
    pub fn finish(mut self, len: usize) -> SyntaxTree {
        // Well-formed parses leave exactly the program frame open. Any
        // frames above it are folded in so no token goes missing.
        let mut children = Vec::new();
        for frame in std::mem::take(&mut self.stack) {
            children.extend(frame);
        }
        let root = self.push_node(NodeKind::Program, children);
        self.nodes[root.0].span = Span::new(0, len);

        let mut token_parents = vec![root; self.tokens.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for child in &node.children {
                if let Child::Token(token) = child {
                    token_parents[token.0] = NodeId(index);
                }
            }
        }

        SyntaxTree {
            nodes: self.nodes,
            tokens: self.tokens,
            token_parents,
            root,
        }
    }

    fn push_child(&mut self, child: Child) {
        if let Some(frame) = self.stack.last_mut() {
            frame.push(child);
        } else {
            self.stack.push(vec![child]);
        }
    }

    fn push_node(&mut self, kind: NodeKind, children: Vec<Child>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut span: Option<Span> = None;
        for child in &children {
            let child_span = match *child {
                Child::Node(node) => {
                    self.nodes[node.0].parent = Some(id);
                    self.nodes[node.0].span
                }
                Child::Token(token) => self.tokens[token.0].span,
                Child::Missing { offset, .. } => Span::empty(offset),
            };
            span = Some(span.map_or(child_span, |s| s.merge(child_span)));
        }
        self.nodes.push(NodeData {
            kind,
            span: span.unwrap_or_else(|| Span::empty(self.offset)),
            parent: None,
            children,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceBuffer;
    use crate::lexer::tokenize;

    fn build(input: &str) -> SyntaxTree {
        let source = SourceBuffer::new(input);
        let mut builder = TreeBuilder::new();
        builder.start_node();
        let mut tokens = tokenize(&source).into_iter();
        // `$a = 1`: wrap the variable and literal in an assignment after
        // the fact, as the expression parser does.
        let variable = tokens.next().expect("variable");
        let checkpoint = builder.checkpoint();
        builder.start_node();
        builder.token(variable);
        builder.finish_node(NodeKind::Variable {
            name: "a".to_string(),
        });
        for token in tokens {
            if token.is_eof() {
                builder.token(token);
                break;
            }
            if token.kind.is_trivia() {
                continue;
            }
            builder.token(token);
        }
        builder.start_node_at(checkpoint);
        builder.missing(";");
        builder.finish_node(NodeKind::ExpressionStatement);
        builder.finish(source.len())
    }

    #[test]
    fn checkpoint_wraps_prior_children() {
        let tree = build("$a=1");
        let root = tree.root();
        let statement = tree.child_nodes(root).next().expect("statement");
        assert_eq!(tree.kind(statement), &NodeKind::ExpressionStatement);
        assert_eq!(tree.parent(statement), Some(root));
        assert_eq!(tree.span(statement), Span::new(0, 4));
        assert_eq!(tree.span(root), Span::new(0, 4));
        assert_eq!(tree.missing().count(), 1);
    }

    #[test]
    fn checkpoint_from_another_depth_adopts_nothing() {
        let source = SourceBuffer::new("$a");
        let mut tokens = tokenize(&source).into_iter();
        let mut builder = TreeBuilder::new();
        builder.start_node();
        let outer = builder.checkpoint();
        builder.start_node();
        builder.token(tokens.next().expect("variable"));
        builder.start_node_at(outer);
        builder.missing(";");
        builder.finish_node(NodeKind::ExpressionStatement);
        builder.finish_node(NodeKind::Variable {
            name: "a".to_string(),
        });
        for token in tokens {
            builder.token(token);
        }
        let tree = builder.finish(source.len());

        let variable = tree.child_nodes(tree.root()).next().expect("variable");
        let inner: Vec<_> = tree.child_nodes(variable).collect();
        assert_eq!(inner.len(), 1);
        assert_eq!(tree.kind(inner[0]), &NodeKind::ExpressionStatement);
        assert_eq!(tree.children(inner[0]).len(), 1);
        assert_eq!(tree.span(inner[0]), Span::empty(2));
        assert_eq!(tree.text(), "$a");
    }

    #[test]
    fn descendants_are_pre_order() {
        let tree = build("$a=1");
        let names: Vec<_> = tree
            .descendants(tree.root())
            .map(|id| tree.kind(id).name())
            .collect();
        assert_eq!(names, vec!["Program", "ExpressionStatement", "Variable"]);
    }

    #[test]
    fn covering_node_finds_innermost() {
        let tree = build("$a=1");
        let id = tree.covering_node(1);
        assert_eq!(tree.kind(id).name(), "Variable");
        let token = tree.covering_token(3).expect("token");
        assert_eq!(tree.token(token).text, "1");
    }

    #[test]
    fn dump_lists_missing_placeholders() {
        let tree = build("$a=1");
        let dump = tree.dump();
        assert!(dump.starts_with("Program 0..4\n"));
        assert!(dump.contains("missing ';' @4"));
    }
}
