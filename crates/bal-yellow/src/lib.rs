//! Lossless, immutable syntax tree with parent pointers and attached trivia.
//!
//! Green nodes are shared and position independent. Red handles add parent
//! links and absolute offsets on demand.

/// Typed AST wrappers around the raw syntax tree.
pub mod ast;
mod builder;
mod cursor;
mod green;
mod syntax;
mod syntax_kind;
mod syntax_set;
mod trivia;

/// Incremental builder for constructing a green tree.
pub use builder::Builder;
pub use cursor::{Preorder, PreorderWithTokens};
pub use green::{GreenElement, GreenNode, GreenToken, NodeCache};
/// Primary syntax tree API types and adapters.
pub use syntax::{
    NodeOrToken, SyntaxElement, SyntaxElementChildren, SyntaxNode, SyntaxNodeChildren,
    SyntaxNodePtr, SyntaxToken, TokenAtOffset, WalkEvent,
};
/// Token and node kinds used throughout the tree.
pub use syntax_kind::SyntaxKind;
/// Compact set for grouping `SyntaxKind` values.
pub use syntax_set::SyntaxSet;
/// Trivia pieces attached to tokens.
pub use trivia::{GreenTrivia, TriviaPiece, TriviaPieceKind};
pub use text_size::{TextRange, TextSize};
