//! Incremental builder for green trees.

use text_size::{TextRange, TextSize};

use crate::{GreenElement, GreenNode, GreenToken, GreenTrivia, NodeCache, NodeOrToken, SyntaxKind};

/// Builds a green tree from a flat stream of start/token/finish calls.
///
/// Tokens must be pushed in source order and together cover `text`
/// exactly; the builder slices each token's text out of it.
#[derive(Debug)]
pub struct Builder<'a> {
    text: &'a str,
    offset: TextSize,
    cache: NodeCache,
    parents: Vec<(SyntaxKind, usize)>,
    children: Vec<GreenElement>,
}

impl<'a> Builder<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::with_cache(text, NodeCache::default())
    }

    pub fn with_cache(text: &'a str, cache: NodeCache) -> Self {
        Self {
            text,
            offset: TextSize::new(0),
            cache,
            parents: Vec::with_capacity(128),
            children: Vec::with_capacity(1024),
        }
    }

    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.parents.push((kind, self.children.len()));
    }

    pub fn finish_node(&mut self) {
        let (kind, first_child) = self.parents.pop().expect("`finish_node` without `start_node`");
        let children = self.children.split_off(first_child);
        let node = self.cache.node(kind, children);
        self.children.push(NodeOrToken::Node(node));
    }

    /// Adds a token whose trimmed text is `len` bytes long, with its
    /// leading and trailing trivia.
    pub fn token(
        &mut self,
        leading: GreenTrivia,
        kind: SyntaxKind,
        len: TextSize,
        trailing: GreenTrivia,
    ) {
        let total = leading.len() + len + trailing.len();
        let range = TextRange::at(self.offset, total);
        self.offset += total;
        let token = self.cache.token(kind, &self.text[range], leading, trailing);
        self.children.push(NodeOrToken::Token(token));
    }

    /// Adds a zero width placeholder token.
    pub fn missing(&mut self, kind: SyntaxKind) {
        self.children.push(NodeOrToken::Token(GreenToken::missing(kind)));
    }

    /// Moves the start of the next token forward, for trees built from a
    /// slice in the middle of `text`.
    pub fn skip_to(&mut self, offset: TextSize) {
        assert!(offset >= self.offset, "`skip_to` cannot move backwards");
        self.offset = offset;
    }

    pub fn current_offset(&self) -> TextSize {
        self.offset
    }

    /// Finishes building and returns the root, along with the cache so a
    /// later build can keep sharing nodes with this one.
    pub fn finish_with_cache(mut self) -> (GreenNode, NodeCache) {
        assert!(self.parents.is_empty(), "unfinished nodes at `finish`");
        match self.children.pop() {
            Some(NodeOrToken::Node(root)) if self.children.is_empty() => (root, self.cache),
            _ => panic!("the builder must produce exactly one root node"),
        }
    }

    pub fn finish(self) -> GreenNode {
        self.finish_with_cache().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SyntaxNode, TriviaPiece, TriviaPieceKind};

    #[test]
    fn builds_lossless_tree() {
        let text = "x = 1;\n";
        let space = || GreenTrivia::new(&[TriviaPiece::new(TriviaPieceKind::Whitespace, 1.into())]);
        let newline = GreenTrivia::new(&[TriviaPiece::new(TriviaPieceKind::Newline, 1.into())]);

        let mut builder = Builder::new(text);
        builder.start_node(SyntaxKind::MODULE);
        builder.start_node(SyntaxKind::ASSIGN_STMT);
        builder.start_node(SyntaxKind::NAME_REF);
        builder.token(GreenTrivia::empty(), SyntaxKind::NAME, 1.into(), space());
        builder.finish_node();
        builder.token(GreenTrivia::empty(), SyntaxKind::EQ, 1.into(), space());
        builder.start_node(SyntaxKind::LITERAL);
        builder.token(GreenTrivia::empty(), SyntaxKind::DECIMAL_INT, 1.into(), GreenTrivia::empty());
        builder.finish_node();
        builder.token(GreenTrivia::empty(), SyntaxKind::SEMICOLON, 1.into(), newline);
        builder.finish_node();
        builder.missing(SyntaxKind::EOF);
        builder.finish_node();

        let root = SyntaxNode::new_root(builder.finish());
        assert_eq!(root.text(), text);

        let stmt = root.first_child().expect("statement");
        assert_eq!(stmt.kind(), SyntaxKind::ASSIGN_STMT);
        assert_eq!(stmt.trimmed_range(), TextRange::new(0.into(), 6.into()));

        let literal = stmt.children().nth(1).expect("literal");
        assert_eq!(literal.text_range(), TextRange::new(4.into(), 5.into()));
        assert_eq!(literal.parent(), Some(stmt.clone()));

        let token = root.token_at_offset(4.into()).right_biased().expect("token");
        assert_eq!(token.kind(), SyntaxKind::DECIMAL_INT);
        assert_eq!(token.next_token().map(|token| token.kind()), Some(SyntaxKind::SEMICOLON));
        assert_eq!(token.prev_token().map(|token| token.kind()), Some(SyntaxKind::EQ));

        let ptr = crate::SyntaxNodePtr::new(&literal);
        assert_eq!(ptr.to_node(&root), Some(literal));
    }
}
