//! Error tolerant parser producing lossless syntax trees.
//!
//! [`parse`] always returns a tree covering the whole input, along with
//! the lexical and syntax diagnostics found on the way. [`Parse::reparse`]
//! applies a text edit and reuses as much of the old tree as it can.

use bal_errors::Diagnostic;
use bal_inputs::{Cancellation, NeverCancel, TextEdit};
use bal_tokenizer::{LexerFlags, LexerState, Tokenizer};
use bal_yellow::SyntaxKind::{self, *};
use bal_yellow::ast::{self, AstNode as _};
use bal_yellow::{GreenNode, GreenToken, NodeOrToken, SyntaxNode, SyntaxToken};
use text_size::{TextRange, TextSize};

mod grammar;
mod parser;
#[cfg(test)]
mod tests;

use parser::{MAX_DEPTH, Output, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Complete,
    /// Parsing stopped early; the tree covers only a prefix of the input.
    Cancelled,
}

/// A syntax tree together with the diagnostics found while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    green: GreenNode,
    diagnostics: Vec<Diagnostic>,
    status: Status,
}

pub fn parse(text: &str) -> Parse {
    parse_with(text, &NeverCancel)
}

/// Parses `text`, polling `cancellation` between items and statements.
pub fn parse_with(text: &str, cancellation: &dyn Cancellation) -> Parse {
    let _span = tracing::debug_span!("parse", len = text.len()).entered();

    let mut parser = Parser::new(text, cancellation);
    grammar::items::module(&mut parser);
    let parse = Parse::from_output(parser.finish());

    tracing::trace!(diagnostics = parse.diagnostics.len(), status = ?parse.status, "parsed module");
    parse
}

impl Parse {
    pub fn new(green: GreenNode, diagnostics: Vec<Diagnostic>) -> Self {
        Self { green, diagnostics, status: Status::Complete }
    }

    fn from_output(output: Output) -> Self {
        let status = if output.cancelled { Status::Cancelled } else { Status::Complete };
        Self { green: output.green, diagnostics: output.diagnostics, status }
    }

    pub fn syntax_node(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn module(&self) -> ast::Module {
        ast::Module::cast(self.syntax_node()).expect("the root of a parse is a module")
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// The tree dump followed by the diagnostic messages.
    pub fn debug_tree(&self) -> String {
        let mut out = self.syntax_node().debug_dump();
        out.push_str("Errors:\n");
        for diagnostic in &self.diagnostics {
            out.push_str(&format!("  {:?} {}\n", diagnostic.range(), diagnostic.message()));
        }
        out
    }

    pub fn into_parts(self) -> (GreenNode, Vec<Diagnostic>) {
        (self.green, self.diagnostics)
    }

    /// Applies `edit` and returns the parse of the new text, or `None` when
    /// the edit does not fit the old text. A cancelled parse does not cover
    /// its text and cannot be reparsed.
    ///
    /// Editing inside a single identifier or literal replaces just that
    /// token. Otherwise the innermost block or class body around the edit
    /// is parsed again on its own and spliced in. Everything else falls
    /// back to a full parse. The result always equals `parse` of the new
    /// text.
    pub fn reparse(&self, edit: &TextEdit) -> Option<Self> {
        if self.status == Status::Cancelled {
            return None;
        }
        let root = self.syntax_node();
        let new_text = edit.apply(&root.text())?;

        if let Some(parse) = self.relex_token(&root, edit, &new_text) {
            tracing::debug!("reparse: relexed a single token");
            return Some(parse);
        }
        if let Some(parse) = self.reparse_block(&root, edit, &new_text) {
            tracing::debug!("reparse: reparsed a block");
            return Some(parse);
        }

        tracing::debug!("reparse: full parse");
        Some(parse(&new_text))
    }

    fn relex_token(&self, root: &SyntaxNode, edit: &TextEdit, new_text: &str) -> Option<Self> {
        let token = relexable_token(root, edit.delete)?;
        let old_range = token.trimmed_range();

        if edit.delete.start() == old_range.start()
            && let Some(prev) = token.prev_token()
            && prev.trimmed_range().end() == old_range.start()
            && (prev.kind() == NAME || prev.kind().is_keyword() || prev.kind().is_literal())
        {
            return None;
        }

        // Lexical errors feed back into the parser's lookahead decisions.
        let lexical_error = self.diagnostics.iter().any(|diagnostic| {
            diagnostic.code().is_lexical() && old_range.contains_range(diagnostic.range())
        });
        if lexical_error {
            return None;
        }

        let new_range = shift_end(old_range, edit.delta())?;
        let state = LexerState::default();
        let mut tokenizer = Tokenizer::with_state(new_text, new_range.start(), state);
        tokenizer.set_flags(LexerFlags::QUERY | LexerFlags::TRANSACTION | LexerFlags::TABLE_TYPE);
        let relexed = tokenizer.next_token();

        if relexed.kind != token.kind()
            || relexed.range != new_range
            || !relexed.leading.is_empty()
            || !tokenizer.diagnostics().is_empty()
        {
            return None;
        }

        let green = token.green();
        let text = format!(
            "{}{}{}",
            &green.text()[..usize::from(green.leading().len())],
            &new_text[new_range],
            &green.text()[usize::from(green.text_len() - green.trailing().len())..],
        );
        let replacement =
            GreenToken::new(token.kind(), &text, green.leading().clone(), green.trailing().clone());
        let green = token.replace_with(replacement);

        let diagnostics = self
            .diagnostics
            .iter()
            .filter_map(|diagnostic| {
                let range = diagnostic.range();
                if range == old_range {
                    Some(diagnostic.clone().with_range(new_range))
                } else if range.end() <= old_range.start() {
                    Some(diagnostic.clone())
                } else if range.start() >= old_range.end() {
                    let range = shift(range, edit.delta())?;
                    Some(diagnostic.clone().with_range(range))
                } else {
                    None
                }
            })
            .collect();

        Some(Self { green, diagnostics, status: Status::Complete })
    }

    fn reparse_block(&self, root: &SyntaxNode, edit: &TextEdit, new_text: &str) -> Option<Self> {
        let node = reparsable_block(root, edit.delete)?;
        let (open, close) = (node.first_token()?, node.last_token()?);
        let next = std::iter::successors(close.next_token(), SyntaxToken::next_token)
            .find(|token| !token.is_missing())?;
        let expected_next = edit.map_offset(next.trimmed_range().start())?;

        let cancellation = NeverCancel;
        let mut p = Parser::with_state(
            new_text,
            node.text_range().start(),
            LexerState::default(),
            &cancellation,
        );
        match node.kind() {
            BLOCK => grammar::stmts::block(&mut p),
            _ => grammar::items::class_body(&mut p),
        }

        let state = p.lexer_state();
        if p.position() != expected_next || !state.is_default() || state.flags() != LexerFlags::NONE
        {
            return None;
        }
        p.unlex_current();
        let output = p.finish();

        let depth = u32::try_from(node.ancestors().count()).ok()?;
        if depth + output.max_depth >= MAX_DEPTH {
            return None;
        }
        let closed = SyntaxNode::new_root(output.green.clone())
            .last_token()
            .is_some_and(|token| token.kind() == close.kind() && !token.is_missing());
        if !closed {
            return None;
        }

        let green = node.replace_with(output.green);

        let region = TextRange::new(open.trimmed_range().start(), close.trimmed_range().end());
        let mut diagnostics: Vec<_> = self
            .diagnostics
            .iter()
            .filter(|diagnostic| !inside(diagnostic.range(), region))
            .filter_map(|diagnostic| {
                let range = diagnostic.range();
                if range.end() <= edit.delete.start() {
                    Some(diagnostic.clone())
                } else {
                    Some(diagnostic.clone().with_range(shift(range, edit.delta())?))
                }
            })
            .chain(output.diagnostics)
            .collect();
        diagnostics.sort_by_key(|diagnostic| diagnostic.range().start());

        Some(Self { green, diagnostics, status: Status::Complete })
    }
}

/// A name or literal token whose trimmed text contains `range`.
fn relexable_token(root: &SyntaxNode, range: TextRange) -> Option<SyntaxToken> {
    let at = root.token_at_offset(range.start());
    [at.clone().left_biased(), at.right_biased()].into_iter().flatten().find(|token| {
        matches!(
            token.kind(),
            NAME | DECIMAL_INT | HEX_INT | DECIMAL_FLOAT | HEX_FLOAT | STRING_LITERAL
        ) && token.trimmed_range().contains_range(range)
    })
}

/// Blocks under these kinds are never reparsed on their own. Templates,
/// queries and transactions lex their contents with a mode or flag, and a
/// type at the start of a statement is first parsed speculatively, so its
/// contents decide how the whole statement parses.
const OPAQUE: [SyntaxKind; 7] = [
    STRING_TEMPLATE_EXPR,
    XML_TEMPLATE_EXPR,
    INTERPOLATION,
    QUERY_EXPR,
    TRANSACTION_STMT,
    RECORD_TYPE,
    FUNCTION_TYPE,
];

/// The innermost block or class body with `range` strictly between its
/// braces.
fn reparsable_block(root: &SyntaxNode, range: TextRange) -> Option<SyntaxNode> {
    let start = match root.covering_element(range) {
        NodeOrToken::Node(node) => node,
        NodeOrToken::Token(token) => token.parent(),
    };

    let node = start.ancestors().find(|node| {
        matches!(node.kind(), BLOCK | CLASS_BODY)
            && node.first_token().is_some_and(|open| {
                open.kind() == LEFT_BRACE && open.trimmed_range().end() <= range.start()
            })
            && node.last_token().is_some_and(|close| {
                close.kind() == RIGHT_BRACE
                    && !close.is_missing()
                    && range.end() <= close.trimmed_range().start()
            })
    })?;

    if node.ancestors().any(|ancestor| OPAQUE.contains(&ancestor.kind())) {
        return None;
    }
    Some(node)
}

/// Whether a diagnostic was reported while parsing `region`. Diagnostics
/// starting at the opening brace, or empty ones right after the closing
/// brace, come from the surrounding code.
fn inside(range: TextRange, region: TextRange) -> bool {
    if range.start() <= region.start() || range.end() > region.end() {
        return false;
    }
    !(range.is_empty() && range.start() == region.end())
}

fn shift_offset(offset: TextSize, delta: i64) -> Option<TextSize> {
    let shifted = i64::from(u32::from(offset)) + delta;
    u32::try_from(shifted).ok().map(TextSize::new)
}

fn shift(range: TextRange, delta: i64) -> Option<TextRange> {
    Some(TextRange::new(shift_offset(range.start(), delta)?, shift_offset(range.end(), delta)?))
}

fn shift_end(range: TextRange, delta: i64) -> Option<TextRange> {
    let end = shift_offset(range.end(), delta)?;
    (end >= range.start()).then(|| TextRange::new(range.start(), end))
}
