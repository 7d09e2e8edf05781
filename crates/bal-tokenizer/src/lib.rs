//! Mode-stack lexer.
//!
//! Lexing is a pure function of the remaining input and a [`LexerState`],
//! so the parser can snapshot and restore the tokenizer at any token
//! boundary.

mod code;
mod cursor;
mod literal;
mod state;
#[cfg(test)]
mod tests;

use bal_errors::{Diagnostic, DiagnosticCode};
pub use bal_yellow::SyntaxKind;
use bal_yellow::SyntaxKind::*;
use bal_yellow::{GreenTrivia, TriviaPiece, TriviaPieceKind};
use cursor::Cursor;
pub use state::{LexerFlags, LexerMode, LexerState};
use state::TriviaPolicy;
use text_size::{TextRange, TextSize};

#[derive(Debug, Clone)]
pub struct Token {
    pub leading: GreenTrivia,
    pub kind: SyntaxKind,
    /// Range of the token without its trivia.
    pub range: TextRange,
    pub trailing: GreenTrivia,
}

impl Token {
    /// Range including leading and trailing trivia.
    pub fn full_range(&self) -> TextRange {
        TextRange::new(self.range.start() - self.leading.len(), self.range.end() + self.trailing.len())
    }
}

/// A restorable position of the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    offset: TextSize,
    state: LexerState,
    diagnostics: usize,
}

impl Snapshot {
    pub fn offset(&self) -> TextSize {
        self.offset
    }

    pub fn state(&self) -> &LexerState {
        &self.state
    }
}

pub struct Tokenizer<'a> {
    text: &'a str,
    cursor: Cursor<'a>,
    state: LexerState,
    diagnostics: Vec<Diagnostic>,
    trivia_pieces: Vec<TriviaPiece>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::with_state(text, TextSize::new(0), LexerState::default())
    }

    /// Starts lexing in the middle of `text`. `offset` must be a token
    /// boundary that was reached with `state`.
    pub fn with_state(text: &'a str, offset: TextSize, state: LexerState) -> Self {
        Self {
            text,
            cursor: Cursor::at(text, offset),
            state,
            diagnostics: Vec::new(),
            trivia_pieces: Vec::with_capacity(4),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn offset(&self) -> TextSize {
        self.cursor.offset()
    }

    pub fn state(&self) -> &LexerState {
        &self.state
    }

    pub fn flags(&self) -> LexerFlags {
        self.state.flags()
    }

    pub fn set_flags(&mut self, flags: LexerFlags) {
        self.state.set_flags(flags);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            offset: self.cursor.offset(),
            state: self.state.clone(),
            diagnostics: self.diagnostics.len(),
        }
    }

    /// Rewinds to `snapshot`, dropping diagnostics reported after it.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.cursor = Cursor::at(self.text, snapshot.offset);
        self.state = snapshot.state;
        self.diagnostics.truncate(snapshot.diagnostics);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Lexes the next token. At the end of input this keeps returning `EOF`.
    pub fn next_token(&mut self) -> Token {
        self.trivia_pieces.clear();
        self.trivia(false);
        let trailing_start = self.trivia_pieces.len();

        self.cursor.reset_pos_within_token();
        let start = self.cursor.offset();
        let kind = self.token_kind();
        let range = TextRange::new(start, self.cursor.offset());
        self.cursor.reset_pos_within_token();
        if kind != EOF {
            self.state.set_prev(kind);
        }

        self.trivia(true);

        let (leading, trailing) = self.trivia_pieces.split_at(trailing_start);
        Token { leading: GreenTrivia::new(leading), kind, range, trailing: GreenTrivia::new(trailing) }
    }

    /// Collects trivia allowed by the current mode. Trailing trivia stops
    /// after the first newline.
    fn trivia(&mut self, trailing: bool) {
        loop {
            let policy = self.state.mode().trivia();
            let kind = match self.cursor.peek() {
                _ if self.cursor.is_eof() => break,
                '\n' if policy != TriviaPolicy::None => {
                    self.cursor.advance();
                    TriviaPieceKind::Newline
                }
                '/' if policy == TriviaPolicy::Code && self.cursor.second() == '/' => {
                    self.cursor.advance_while(|c| c != '\n');
                    TriviaPieceKind::SingleLineComment
                }
                c if c.is_whitespace()
                    && matches!(
                        policy,
                        TriviaPolicy::Code | TriviaPolicy::XmlTag | TriviaPolicy::DocLine
                    ) =>
                {
                    self.cursor.advance_while(|c| c.is_whitespace() && c != '\n');
                    TriviaPieceKind::Whitespace
                }
                _ => break,
            };

            self.trivia_pieces.push(TriviaPiece::new(kind, self.cursor.pos_within_token()));
            self.cursor.reset_pos_within_token();

            if kind == TriviaPieceKind::Newline {
                if self.state.mode().is_documentation() {
                    self.end_documentation_line();
                }
                if trailing {
                    break;
                }
            }
        }
    }

    fn end_documentation_line(&mut self) {
        while self.state.mode().is_documentation() {
            if let LexerMode::Backtick(_) = self.state.pop() {
                let at = self.cursor.offset() - TextSize::of('\n');
                self.error(
                    DiagnosticCode::UnterminatedCodeSpan,
                    "unterminated code span",
                    TextRange::empty(at),
                );
            }
        }
    }

    fn token_kind(&mut self) -> SyntaxKind {
        if self.cursor.is_eof() {
            return self.eof();
        }

        match self.state.mode() {
            LexerMode::Default | LexerMode::Interpolation { .. } => self.code(),
            LexerMode::StringTemplate => self.string_template(),
            LexerMode::Xml => self.xml_content(),
            LexerMode::XmlTag => self.xml_tag(),
            LexerMode::XmlAttrValue { quote } => self.xml_attr_value(quote),
            LexerMode::XmlComment => self.xml_comment(),
            LexerMode::XmlPi => self.xml_pi(),
            LexerMode::Documentation => self.documentation(),
            LexerMode::DocumentationParam => self.documentation_param(),
            LexerMode::Backtick(n) => self.code_span(n),
        }
    }

    /// Reports the innermost construct left open at the end of input and
    /// resets the mode stack, so repeated calls stay silent.
    fn eof(&mut self) -> SyntaxKind {
        let at = TextRange::empty(self.cursor.offset());
        let open = self.state.modes().iter().rev().find_map(|mode| match mode {
            LexerMode::Interpolation { .. }
            | LexerMode::StringTemplate
            | LexerMode::Xml
            | LexerMode::XmlTag
            | LexerMode::XmlAttrValue { .. } => {
                Some((DiagnosticCode::UnterminatedTemplate, "unterminated template literal"))
            }
            LexerMode::XmlComment => {
                Some((DiagnosticCode::UnterminatedXmlComment, "unterminated XML comment"))
            }
            LexerMode::XmlPi => Some((
                DiagnosticCode::UnterminatedXmlSection,
                "unterminated processing instruction",
            )),
            LexerMode::Backtick(_) => {
                Some((DiagnosticCode::UnterminatedCodeSpan, "unterminated code span"))
            }
            LexerMode::Default | LexerMode::Documentation | LexerMode::DocumentationParam => None,
        });
        if let Some((code, message)) = open {
            self.error(code, message, at);
        }
        self.state.reset();
        EOF
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, range: TextRange) {
        self.diagnostics.push(Diagnostic::error(code, message, range));
    }

    fn token_range(&self) -> TextRange {
        TextRange::at(self.cursor.offset() - self.cursor.pos_within_token(), self.cursor.pos_within_token())
    }
}

/// Lexes all of `text`, including the final `EOF` token.
pub fn tokenize(text: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut tokenizer = Tokenizer::new(text);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token();
        let kind = token.kind;
        tokens.push(token);
        if kind == EOF {
            break;
        }
    }
    (tokens, tokenizer.finish())
}
