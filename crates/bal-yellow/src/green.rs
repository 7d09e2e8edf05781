//! Position independent, immutable tree storage.
//!
//! Green nodes know their kind, their children and their width, but not
//! where they sit in the file. Equal subtrees built through one
//! [`NodeCache`] are the same allocation, so reparsing can share everything
//! an edit did not touch.

use std::fmt;
use std::hash::{Hash, Hasher};

use hashbrown::HashTable;
use hashbrown::hash_table::Entry;
use rustc_hash::FxHasher;
use text_size::{TextLen, TextSize};
use triomphe::Arc;

use crate::{GreenTrivia, NodeOrToken, SyntaxKind};

pub type GreenElement = NodeOrToken<GreenNode, GreenToken>;

impl GreenElement {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    pub fn text_len(&self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.text_len(),
            NodeOrToken::Token(token) => token.text_len(),
        }
    }

    fn structural_hash(&self) -> u64 {
        match self {
            NodeOrToken::Node(node) => node.data.hash,
            NodeOrToken::Token(token) => token.data.hash,
        }
    }

    /// Identity comparison, used by the cache where children are already
    /// deduplicated.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeOrToken::Node(lhs), NodeOrToken::Node(rhs)) => lhs.ptr_eq(rhs),
            (NodeOrToken::Token(lhs), NodeOrToken::Token(rhs)) => lhs.ptr_eq(rhs),
            _ => false,
        }
    }
}

struct GreenNodeData {
    kind: SyntaxKind,
    text_len: TextSize,
    hash: u64,
    children: Box<[GreenElement]>,
}

#[derive(Clone)]
pub struct GreenNode {
    data: Arc<GreenNodeData>,
}

impl GreenNode {
    pub fn new(kind: SyntaxKind, children: Vec<GreenElement>) -> Self {
        let hash = node_hash(kind, &children);
        Self::from_parts(kind, children, hash)
    }

    fn from_parts(kind: SyntaxKind, children: Vec<GreenElement>, hash: u64) -> Self {
        let text_len = children.iter().map(GreenElement::text_len).sum();
        Self {
            data: Arc::new(GreenNodeData {
                kind,
                text_len,
                hash,
                children: children.into_boxed_slice(),
            }),
        }
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data.kind
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        self.data.text_len
    }

    #[inline]
    pub fn children(&self) -> &[GreenElement] {
        &self.data.children
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Returns a copy of this node with the child at `index` replaced.
    /// All other children are shared with `self`.
    pub fn replace_child(&self, index: usize, new_child: GreenElement) -> Self {
        let mut children = self.children().to_vec();
        children[index] = new_child;
        Self::new(self.kind(), children)
    }

    /// Number of tokens in this subtree, missing placeholders included.
    pub fn token_count(&self) -> usize {
        self.children()
            .iter()
            .map(|child| match child {
                NodeOrToken::Node(node) => node.token_count(),
                NodeOrToken::Token(_) => 1,
            })
            .sum()
    }

    fn write_text(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for child in self.children() {
            match child {
                NodeOrToken::Node(node) => node.write_text(out)?,
                NodeOrToken::Token(token) => out.write_str(token.text())?,
            }
        }
        Ok(())
    }
}

impl PartialEq for GreenNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.data.hash == other.data.hash
                && self.kind() == other.kind()
                && self.text_len() == other.text_len()
                && self.children() == other.children())
    }
}

impl Eq for GreenNode {}

impl Hash for GreenNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.data.hash);
    }
}

impl fmt::Debug for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenNode")
            .field("kind", &self.kind())
            .field("text_len", &self.text_len())
            .field("children", &self.children().len())
            .finish()
    }
}

impl fmt::Display for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f)
    }
}

struct GreenTokenData {
    kind: SyntaxKind,
    hash: u64,
    text: Box<str>,
    leading: GreenTrivia,
    trailing: GreenTrivia,
}

/// A token together with its attached trivia. `text` is the full text,
/// leading trivia first and trailing trivia last.
#[derive(Clone)]
pub struct GreenToken {
    data: Arc<GreenTokenData>,
}

impl GreenToken {
    pub fn new(kind: SyntaxKind, text: &str, leading: GreenTrivia, trailing: GreenTrivia) -> Self {
        debug_assert!(leading.len() + trailing.len() <= text.text_len());
        let hash = token_hash(kind, text, &leading, &trailing);
        Self { data: Arc::new(GreenTokenData { kind, hash, text: text.into(), leading, trailing }) }
    }

    /// A zero width placeholder for a token the parser expected but did not find.
    pub fn missing(kind: SyntaxKind) -> Self {
        Self::new(kind, "", GreenTrivia::empty(), GreenTrivia::empty())
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data.kind
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.data.text
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        self.data.text.text_len()
    }

    pub fn leading(&self) -> &GreenTrivia {
        &self.data.leading
    }

    pub fn trailing(&self) -> &GreenTrivia {
        &self.data.trailing
    }

    pub fn text_trimmed(&self) -> &str {
        let start: usize = self.leading().len().into();
        let end: usize = (self.text_len() - self.trailing().len()).into();
        &self.text()[start..end]
    }

    pub fn is_missing(&self) -> bool {
        self.data.text.is_empty() && self.kind() != SyntaxKind::EOF
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for GreenToken {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.kind() == other.kind()
                && self.text() == other.text()
                && self.leading() == other.leading()
                && self.trailing() == other.trailing())
    }
}

impl Eq for GreenToken {}

impl Hash for GreenToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.data.hash);
    }
}

impl fmt::Debug for GreenToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenToken")
            .field("kind", &self.kind())
            .field("text", &self.text())
            .finish_non_exhaustive()
    }
}

fn node_hash(kind: SyntaxKind, children: &[GreenElement]) -> u64 {
    let mut hasher = FxHasher::default();
    kind.hash(&mut hasher);
    for child in children {
        hasher.write_u64(child.structural_hash());
    }
    hasher.finish()
}

fn token_hash(kind: SyntaxKind, text: &str, leading: &GreenTrivia, trailing: &GreenTrivia) -> u64 {
    let mut hasher = FxHasher::default();
    kind.hash(&mut hasher);
    text.hash(&mut hasher);
    leading.pieces().hash(&mut hasher);
    trailing.pieces().hash(&mut hasher);
    hasher.finish()
}

/// Hash-consing interner for green nodes and tokens.
#[derive(Default)]
pub struct NodeCache {
    nodes: HashTable<GreenNode>,
    tokens: HashTable<GreenToken>,
}

impl fmt::Debug for NodeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCache")
            .field("nodes", &self.nodes.len())
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl NodeCache {
    /// Nodes with more children than this are rarely repeated.
    const MAX_CACHED_CHILDREN: usize = 3;

    pub fn node(&mut self, kind: SyntaxKind, children: Vec<GreenElement>) -> GreenNode {
        let hash = node_hash(kind, &children);
        if children.len() > Self::MAX_CACHED_CHILDREN {
            return GreenNode::from_parts(kind, children, hash);
        }

        let entry = self.nodes.entry(
            hash,
            |node| {
                node.kind() == kind
                    && node.children().len() == children.len()
                    && node.children().iter().zip(&children).all(|(lhs, rhs)| lhs.ptr_eq(rhs))
            },
            |node| node.data.hash,
        );

        match entry {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let node = GreenNode::from_parts(kind, children, hash);
                entry.insert(node.clone());
                node
            }
        }
    }

    pub fn token(
        &mut self,
        kind: SyntaxKind,
        text: &str,
        leading: GreenTrivia,
        trailing: GreenTrivia,
    ) -> GreenToken {
        let hash = token_hash(kind, text, &leading, &trailing);
        let entry = self.tokens.entry(
            hash,
            |token| {
                token.kind() == kind
                    && token.text() == text
                    && *token.leading() == leading
                    && *token.trailing() == trailing
            },
            |token| token.data.hash,
        );

        match entry {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let token = GreenToken::new(kind, text, leading, trailing);
                entry.insert(token.clone());
                token
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TriviaPiece, TriviaPieceKind};

    fn whitespace(len: u32) -> GreenTrivia {
        GreenTrivia::new(&[TriviaPiece::new(TriviaPieceKind::Whitespace, len.into())])
    }

    #[test]
    fn token_text() {
        let token =
            GreenToken::new(SyntaxKind::VAR_KW, "\t var  ", whitespace(2), whitespace(2));

        assert_eq!("\t var  ", token.text());
        assert_eq!("var", token.text_trimmed());
        assert!(!token.is_missing());
        assert!(GreenToken::missing(SyntaxKind::SEMICOLON).is_missing());
    }

    #[test]
    fn cache_shares_equal_subtrees() {
        let mut cache = NodeCache::default();
        let name = |cache: &mut NodeCache| {
            let token = cache.token(SyntaxKind::NAME, "x", GreenTrivia::empty(), GreenTrivia::empty());
            cache.node(SyntaxKind::NAME_REF, vec![NodeOrToken::Token(token)])
        };

        let first = name(&mut cache);
        let second = name(&mut cache);
        assert!(first.ptr_eq(&second));
        assert_eq!(first.to_string(), "x");
    }

    #[test]
    fn replace_child_shares_siblings() {
        let a = GreenToken::new(SyntaxKind::NAME, "a", GreenTrivia::empty(), GreenTrivia::empty());
        let plus =
            GreenToken::new(SyntaxKind::PLUS, "+", GreenTrivia::empty(), GreenTrivia::empty());
        let b = GreenToken::new(SyntaxKind::NAME, "b", GreenTrivia::empty(), GreenTrivia::empty());
        let node = GreenNode::new(
            SyntaxKind::BINARY_EXPR,
            vec![NodeOrToken::Token(a.clone()), NodeOrToken::Token(plus), NodeOrToken::Token(b)],
        );

        let c = GreenToken::new(SyntaxKind::NAME, "cc", GreenTrivia::empty(), GreenTrivia::empty());
        let replaced = node.replace_child(2, NodeOrToken::Token(c));

        assert_eq!(replaced.to_string(), "a+cc");
        assert_eq!(replaced.text_len(), TextSize::new(4));
        let Some(NodeOrToken::Token(first)) = replaced.children().first() else {
            panic!("expected a token");
        };
        assert!(first.ptr_eq(&a));
    }
}
