//! Public syntax tree API: positioned views over green nodes.
//!
//! A [`SyntaxNode`] is created on demand while walking down from the root.
//! It knows its parent, its index in the parent and its absolute offset,
//! so every navigation step is a few pointer hops.

use std::fmt;
use std::hash::{Hash, Hasher};

use text_size::{TextRange, TextSize};
use triomphe::Arc;

use crate::cursor::{Preorder, PreorderWithTokens};
use crate::{GreenElement, GreenNode, GreenToken, GreenTrivia, SyntaxKind};

struct NodeData {
    parent: Option<SyntaxNode>,
    index: u32,
    offset: TextSize,
    green: GreenNode,
}

#[derive(Clone)]
pub struct SyntaxNode {
    data: Arc<NodeData>,
}

impl SyntaxNode {
    pub fn new_root(green: GreenNode) -> Self {
        Self { data: Arc::new(NodeData { parent: None, index: 0, offset: 0.into(), green }) }
    }

    fn new_child(parent: &Self, index: usize, offset: TextSize, green: GreenNode) -> Self {
        Self {
            data: Arc::new(NodeData {
                parent: Some(parent.clone()),
                index: index as u32,
                offset,
                green,
            }),
        }
    }

    fn element(&self, index: usize, offset: TextSize, green: &GreenElement) -> SyntaxElement {
        match green {
            NodeOrToken::Node(node) => {
                NodeOrToken::Node(Self::new_child(self, index, offset, node.clone()))
            }
            NodeOrToken::Token(token) => NodeOrToken::Token(SyntaxToken {
                parent: self.clone(),
                index: index as u32,
                offset,
                green: token.clone(),
            }),
        }
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data.green.kind()
    }

    #[inline]
    pub fn green(&self) -> &GreenNode {
        &self.data.green
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.data.index as usize
    }

    /// Returns the range covered by this node, trivia included.
    #[inline]
    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.data.offset, self.data.green.text_len())
    }

    /// Returns the range without the leading trivia of the first token and
    /// the trailing trivia of the last one.
    pub fn trimmed_range(&self) -> TextRange {
        match (self.first_token(), self.last_token()) {
            (Some(first), Some(last)) => {
                let start = first.trimmed_range().start();
                let end = last.trimmed_range().end().max(start);
                TextRange::new(start, end)
            }
            _ => TextRange::empty(self.data.offset),
        }
    }

    /// Reconstructs the exact source text covered by this node.
    pub fn text(&self) -> String {
        self.data.green.to_string()
    }

    pub fn text_trimmed(&self) -> String {
        let text = self.text();
        let trimmed = self.trimmed_range() - self.data.offset;
        text[trimmed].to_owned()
    }

    #[inline]
    pub fn parent(&self) -> Option<Self> {
        self.data.parent.clone()
    }

    /// Returns an iterator of ancestors starting from this node.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> + use<> {
        std::iter::successors(Some(self.clone()), Self::parent)
    }

    pub fn children_with_tokens(&self) -> SyntaxElementChildren {
        SyntaxElementChildren { parent: self.clone(), next: 0, offset: self.data.offset }
    }

    pub fn children(&self) -> SyntaxNodeChildren {
        SyntaxNodeChildren { inner: self.children_with_tokens() }
    }

    pub fn first_child_or_token(&self) -> Option<SyntaxElement> {
        let green = self.data.green.children().first()?;
        Some(self.element(0, self.data.offset, green))
    }

    pub fn last_child_or_token(&self) -> Option<SyntaxElement> {
        let children = self.data.green.children();
        let green = children.last()?;
        let offset = self.text_range().end() - green.text_len();
        Some(self.element(children.len() - 1, offset, green))
    }

    pub fn first_child(&self) -> Option<Self> {
        self.children().next()
    }

    pub fn last_child(&self) -> Option<Self> {
        let mut element = self.last_child_or_token()?;
        loop {
            match element {
                NodeOrToken::Node(node) => return Some(node),
                NodeOrToken::Token(token) => element = token.prev_sibling_or_token()?,
            }
        }
    }

    pub fn next_sibling_or_token(&self) -> Option<SyntaxElement> {
        let parent = self.parent()?;
        let index = self.index() + 1;
        let green = parent.data.green.children().get(index)?;
        Some(parent.element(index, self.text_range().end(), green))
    }

    pub fn prev_sibling_or_token(&self) -> Option<SyntaxElement> {
        let parent = self.parent()?;
        let index = self.index().checked_sub(1)?;
        let green = parent.data.green.children().get(index)?;
        Some(parent.element(index, self.data.offset - green.text_len(), green))
    }

    pub fn next_sibling(&self) -> Option<Self> {
        let mut element = self.next_sibling_or_token()?;
        loop {
            match element {
                NodeOrToken::Node(node) => return Some(node),
                NodeOrToken::Token(token) => element = token.next_sibling_or_token()?,
            }
        }
    }

    pub fn prev_sibling(&self) -> Option<Self> {
        let mut element = self.prev_sibling_or_token()?;
        loop {
            match element {
                NodeOrToken::Node(node) => return Some(node),
                NodeOrToken::Token(token) => element = token.prev_sibling_or_token()?,
            }
        }
    }

    /// Returns the first token in this subtree. Nodes without tokens are skipped.
    pub fn first_token(&self) -> Option<SyntaxToken> {
        self.children_with_tokens().find_map(|child| match child {
            NodeOrToken::Node(node) => node.first_token(),
            NodeOrToken::Token(token) => Some(token),
        })
    }

    pub fn last_token(&self) -> Option<SyntaxToken> {
        let mut element = self.last_child_or_token()?;
        loop {
            let found = match &element {
                NodeOrToken::Node(node) => node.last_token(),
                NodeOrToken::Token(token) => Some(token.clone()),
            };
            if found.is_some() {
                return found;
            }
            element = element.prev_sibling_or_token()?;
        }
    }

    /// Iterates every node of the subtree in preorder, `self` included.
    pub fn descendants(&self) -> impl Iterator<Item = Self> + use<> {
        self.preorder().filter_map(|event| match event {
            WalkEvent::Enter(node) => Some(node),
            WalkEvent::Leave(_) => None,
        })
    }

    pub fn descendants_tokens(&self) -> impl Iterator<Item = SyntaxToken> + use<> {
        self.preorder_with_tokens().filter_map(|event| match event {
            WalkEvent::Enter(NodeOrToken::Token(token)) => Some(token),
            _ => None,
        })
    }

    #[inline]
    pub fn preorder(&self) -> Preorder {
        Preorder::new(self.clone())
    }

    #[inline]
    pub fn preorder_with_tokens(&self) -> PreorderWithTokens {
        PreorderWithTokens::new(self.clone())
    }

    /// Returns the token(s) touching `offset`. Zero width tokens are never
    /// reported.
    pub fn token_at_offset(&self, offset: TextSize) -> TokenAtOffset<SyntaxToken> {
        let range = self.text_range();
        if range.is_empty() || offset < range.start() || offset > range.end() {
            return TokenAtOffset::None;
        }

        let mut children = self.children_with_tokens().filter(|child| {
            let range = child.text_range();
            !range.is_empty() && range.start() <= offset && offset <= range.end()
        });

        let Some(left) = children.next() else {
            return TokenAtOffset::None;
        };
        match children.next() {
            None => left.token_at_offset(offset),
            Some(right) => {
                match (
                    left.token_at_offset(offset).left_biased(),
                    right.token_at_offset(offset).right_biased(),
                ) {
                    (Some(left), Some(right)) => TokenAtOffset::Between(left, right),
                    (Some(token), None) | (None, Some(token)) => TokenAtOffset::Single(token),
                    (None, None) => TokenAtOffset::None,
                }
            }
        }
    }

    /// Returns the smallest element that fully covers `range`.
    pub fn covering_element(&self, range: TextRange) -> SyntaxElement {
        let mut node = self.clone();
        if !node.text_range().contains_range(range) {
            return NodeOrToken::Node(node);
        }
        loop {
            let child = node.children_with_tokens().find(|child| {
                let child_range = child.text_range();
                !child_range.is_empty() && child_range.contains_range(range)
            });
            match child {
                Some(NodeOrToken::Node(child)) => node = child,
                Some(NodeOrToken::Token(token)) => return NodeOrToken::Token(token),
                None => return NodeOrToken::Node(node),
            }
        }
    }

    /// Rebuilds the ancestor spine with `replacement` in place of this
    /// node and returns the new root. Siblings are shared, not copied.
    pub fn replace_with(&self, replacement: GreenNode) -> GreenNode {
        match self.parent() {
            None => replacement,
            Some(parent) => {
                let new_parent =
                    parent.green().replace_child(self.index(), NodeOrToken::Node(replacement));
                parent.replace_with(new_parent)
            }
        }
    }

    /// Indented dump of the tree, one element per line.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let mut depth = 0usize;
        for event in self.preorder_with_tokens() {
            match event {
                WalkEvent::Enter(NodeOrToken::Node(node)) => {
                    out.push_str(&format!(
                        "{:indent$}{:?}@{:?}\n",
                        "",
                        node.kind(),
                        node.text_range(),
                        indent = depth * 2
                    ));
                    depth += 1;
                }
                WalkEvent::Enter(NodeOrToken::Token(token)) => {
                    let suffix = if token.is_missing() {
                        " (missing)".to_owned()
                    } else {
                        format!(" {:?}", token.text_trimmed())
                    };
                    out.push_str(&format!(
                        "{:indent$}{:?}@{:?}{suffix}\n",
                        "",
                        token.kind(),
                        token.trimmed_range(),
                        indent = depth * 2
                    ));
                }
                WalkEvent::Leave(NodeOrToken::Node(_)) => depth = depth.saturating_sub(1),
                WalkEvent::Leave(NodeOrToken::Token(_)) => {}
            }
        }
        out
    }
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
            || (self.data.offset == other.data.offset && self.data.green.ptr_eq(&other.data.green))
    }
}

impl Eq for SyntaxNode {}

impl Hash for SyntaxNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.offset.hash(state);
        self.data.green.hash(state);
    }
}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?}", self.kind(), self.text_range())
    }
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.green(), f)
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SyntaxToken {
    parent: SyntaxNode,
    index: u32,
    offset: TextSize,
    green: GreenToken,
}

impl SyntaxToken {
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.green.kind()
    }

    #[inline]
    pub fn green(&self) -> &GreenToken {
        &self.green
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Returns the token text including trivia.
    #[inline]
    pub fn text(&self) -> &str {
        self.green.text()
    }

    /// Returns the token text excluding trivia.
    #[inline]
    pub fn text_trimmed(&self) -> &str {
        self.green.text_trimmed()
    }

    #[inline]
    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.offset, self.green.text_len())
    }

    pub fn trimmed_range(&self) -> TextRange {
        let range = self.text_range();
        TextRange::new(
            range.start() + self.green.leading().len(),
            range.end() - self.green.trailing().len(),
        )
    }

    pub fn leading_trivia(&self) -> &GreenTrivia {
        self.green.leading()
    }

    pub fn trailing_trivia(&self) -> &GreenTrivia {
        self.green.trailing()
    }

    /// `true` for zero width placeholders inserted during error recovery.
    #[inline]
    pub fn is_missing(&self) -> bool {
        self.green.is_missing()
    }

    #[inline]
    pub fn parent(&self) -> SyntaxNode {
        self.parent.clone()
    }

    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode> + use<> {
        self.parent.ancestors()
    }

    pub fn next_sibling_or_token(&self) -> Option<SyntaxElement> {
        let index = self.index() + 1;
        let green = self.parent.data.green.children().get(index)?;
        Some(self.parent.element(index, self.text_range().end(), green))
    }

    pub fn prev_sibling_or_token(&self) -> Option<SyntaxElement> {
        let index = self.index().checked_sub(1)?;
        let green = self.parent.data.green.children().get(index)?;
        Some(self.parent.element(index, self.offset - green.text_len(), green))
    }

    /// Returns the next token in the file, crossing node boundaries.
    pub fn next_token(&self) -> Option<Self> {
        let mut element: SyntaxElement = NodeOrToken::Token(self.clone());
        loop {
            match element.next_sibling_or_token() {
                Some(NodeOrToken::Token(token)) => return Some(token),
                Some(NodeOrToken::Node(node)) => match node.first_token() {
                    Some(token) => return Some(token),
                    None => element = NodeOrToken::Node(node),
                },
                None => element = NodeOrToken::Node(element.parent()?),
            }
        }
    }

    pub fn prev_token(&self) -> Option<Self> {
        let mut element: SyntaxElement = NodeOrToken::Token(self.clone());
        loop {
            match element.prev_sibling_or_token() {
                Some(NodeOrToken::Token(token)) => return Some(token),
                Some(NodeOrToken::Node(node)) => match node.last_token() {
                    Some(token) => return Some(token),
                    None => element = NodeOrToken::Node(node),
                },
                None => element = NodeOrToken::Node(element.parent()?),
            }
        }
    }

    /// Rebuilds the ancestor spine with `replacement` in place of this
    /// token and returns the new root.
    pub fn replace_with(&self, replacement: GreenToken) -> GreenNode {
        let new_parent =
            self.parent.green().replace_child(self.index(), NodeOrToken::Token(replacement));
        self.parent.replace_with(new_parent)
    }
}

impl fmt::Debug for SyntaxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?} {:?}", self.kind(), self.trimmed_range(), self.text_trimmed())
    }
}

impl fmt::Display for SyntaxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Node or token element inside the tree.
pub type SyntaxElement = NodeOrToken<SyntaxNode, SyntaxToken>;

impl SyntaxElement {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    pub fn text_range(&self) -> TextRange {
        match self {
            NodeOrToken::Node(node) => node.text_range(),
            NodeOrToken::Token(token) => token.text_range(),
        }
    }

    pub fn parent(&self) -> Option<SyntaxNode> {
        match self {
            NodeOrToken::Node(node) => node.parent(),
            NodeOrToken::Token(token) => Some(token.parent()),
        }
    }

    pub fn next_sibling_or_token(&self) -> Option<Self> {
        match self {
            NodeOrToken::Node(node) => node.next_sibling_or_token(),
            NodeOrToken::Token(token) => token.next_sibling_or_token(),
        }
    }

    pub fn prev_sibling_or_token(&self) -> Option<Self> {
        match self {
            NodeOrToken::Node(node) => node.prev_sibling_or_token(),
            NodeOrToken::Token(token) => token.prev_sibling_or_token(),
        }
    }

    fn token_at_offset(&self, offset: TextSize) -> TokenAtOffset<SyntaxToken> {
        match self {
            NodeOrToken::Node(node) => node.token_at_offset(offset),
            NodeOrToken::Token(token) => TokenAtOffset::Single(token.clone()),
        }
    }
}

/// Iterator over the direct children of a node, tokens included.
#[derive(Clone)]
pub struct SyntaxElementChildren {
    parent: SyntaxNode,
    next: usize,
    offset: TextSize,
}

impl Iterator for SyntaxElementChildren {
    type Item = SyntaxElement;

    fn next(&mut self) -> Option<Self::Item> {
        let green = self.parent.data.green.children().get(self.next)?;
        let element = self.parent.element(self.next, self.offset, green);
        self.next += 1;
        self.offset += green.text_len();
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.parent.data.green.children().len() - self.next;
        (len, Some(len))
    }
}

impl ExactSizeIterator for SyntaxElementChildren {}

/// Iterator over child nodes only.
#[derive(Clone)]
pub struct SyntaxNodeChildren {
    inner: SyntaxElementChildren,
}

impl Iterator for SyntaxNodeChildren {
    type Item = SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find_map(NodeOrToken::into_node)
    }
}

/// Preorder walk event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent<T> {
    Enter(T),
    Leave(T),
}

/// Stable identifier for a node by kind and text range.
///
/// Survives dropping the red tree, so analysis results can be keyed by it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxNodePtr {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

impl SyntaxNodePtr {
    pub fn new(node: &SyntaxNode) -> Self {
        Self { kind: node.kind(), range: node.text_range() }
    }

    /// Attempts to resolve this pointer within the tree rooted at `root`.
    pub fn to_node(&self, root: &SyntaxNode) -> Option<SyntaxNode> {
        let start = match root.covering_element(self.range) {
            NodeOrToken::Node(node) => node,
            NodeOrToken::Token(token) => token.parent(),
        };
        let matches = |node: &SyntaxNode| node.kind() == self.kind && node.text_range() == self.range;

        start.ancestors().find(matches).or_else(|| start.descendants().find(matches))
    }
}

/// Node-or-token wrapper used throughout the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeOrToken<N, T> {
    Node(N),
    Token(T),
}

impl<N, T> NodeOrToken<N, T> {
    pub fn into_node(self) -> Option<N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn into_token(self) -> Option<T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }

    pub fn as_node(&self) -> Option<&N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }
}

impl<N: fmt::Display, T: fmt::Display> fmt::Display for NodeOrToken<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeOrToken::Node(node) => fmt::Display::fmt(node, f),
            NodeOrToken::Token(token) => fmt::Display::fmt(token, f),
        }
    }
}

/// There might be zero, one or two tokens at a given offset.
#[derive(Clone, Debug)]
pub enum TokenAtOffset<T> {
    /// No tokens at offset.
    None,
    /// Only a single token at offset.
    Single(T),
    /// Offset is exactly between two tokens.
    Between(T, T),
}

impl<T> TokenAtOffset<T> {
    pub fn map<F: Fn(T) -> U, U>(self, f: F) -> TokenAtOffset<U> {
        match self {
            TokenAtOffset::None => TokenAtOffset::None,
            TokenAtOffset::Single(it) => TokenAtOffset::Single(f(it)),
            TokenAtOffset::Between(l, r) => TokenAtOffset::Between(f(l), f(r)),
        }
    }

    /// Convert to option, preferring the right token in case of a tie.
    pub fn right_biased(self) -> Option<T> {
        match self {
            Self::None => None,
            Self::Single(node) => Some(node),
            Self::Between(_, right) => Some(right),
        }
    }

    /// Convert to option, preferring the left token in case of a tie.
    pub fn left_biased(self) -> Option<T> {
        match self {
            Self::None => None,
            Self::Single(node) => Some(node),
            Self::Between(left, _) => Some(left),
        }
    }
}

impl<T> Iterator for TokenAtOffset<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::None) {
            Self::None => None,
            Self::Single(node) => Some(node),
            Self::Between(left, right) => {
                *self = Self::Single(right);
                Some(left)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::None => (0, Some(0)),
            Self::Single(_) => (1, Some(1)),
            Self::Between(_, _) => (2, Some(2)),
        }
    }
}

impl<T> ExactSizeIterator for TokenAtOffset<T> {}
