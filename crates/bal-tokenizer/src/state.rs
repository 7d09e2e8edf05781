use std::ops::BitOr;

use bal_yellow::SyntaxKind;

/// Lexical context. The tokenizer keeps a stack of these; the bottom is
/// always [`LexerMode::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexerMode {
    Default,
    /// Code inside `${ ... }`. `depth` counts unclosed braces opened inside.
    Interpolation { depth: u32 },
    StringTemplate,
    Xml,
    XmlTag,
    /// A quoted attribute value, closed by the same quote.
    XmlAttrValue { quote: char },
    XmlComment,
    /// A processing instruction, `<?target ...?>`.
    XmlPi,
    Documentation,
    DocumentationParam,
    /// Inline code in documentation, opened by 1 to 3 backticks.
    Backtick(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TriviaPolicy {
    Code,
    XmlTag,
    DocLine,
    NewlineOnly,
    None,
}

impl LexerMode {
    pub(crate) fn trivia(self) -> TriviaPolicy {
        match self {
            Self::Default | Self::Interpolation { .. } => TriviaPolicy::Code,
            Self::XmlTag => TriviaPolicy::XmlTag,
            Self::Documentation | Self::DocumentationParam => TriviaPolicy::DocLine,
            Self::Backtick(_) => TriviaPolicy::NewlineOnly,
            Self::StringTemplate
            | Self::Xml
            | Self::XmlAttrValue { .. }
            | Self::XmlComment
            | Self::XmlPi => TriviaPolicy::None,
        }
    }

    pub(crate) fn is_documentation(self) -> bool {
        matches!(self, Self::Documentation | Self::DocumentationParam | Self::Backtick(_))
    }
}

/// Parser controlled switches for contextual keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LexerFlags(u8);

impl LexerFlags {
    pub const NONE: Self = Self(0);
    /// `where`, `select`, `let` and `limit` are keywords.
    pub const QUERY: Self = Self(1);
    /// `commit` and `rollback` are keywords.
    pub const TRANSACTION: Self = Self(1 << 1);
    /// `key` is a keyword.
    pub const TABLE_TYPE: Self = Self(1 << 2);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for LexerFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Everything besides the input position that determines the next token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LexerState {
    modes: Vec<LexerMode>,
    flags: LexerFlags,
    prev: SyntaxKind,
}

impl Default for LexerState {
    fn default() -> Self {
        Self { modes: vec![LexerMode::Default], flags: LexerFlags::NONE, prev: SyntaxKind::TOMBSTONE }
    }
}

impl LexerState {
    pub fn mode(&self) -> LexerMode {
        self.modes.last().copied().unwrap_or(LexerMode::Default)
    }

    pub fn modes(&self) -> &[LexerMode] {
        &self.modes
    }

    pub fn flags(&self) -> LexerFlags {
        self.flags
    }

    /// The kind of the last token produced, `TOMBSTONE` at the start.
    pub fn prev(&self) -> SyntaxKind {
        self.prev
    }

    pub fn is_default(&self) -> bool {
        self.modes.len() == 1
    }

    pub(crate) fn set_flags(&mut self, flags: LexerFlags) {
        self.flags = flags;
    }

    pub(crate) fn set_prev(&mut self, kind: SyntaxKind) {
        self.prev = kind;
    }

    pub(crate) fn push(&mut self, mode: LexerMode) {
        self.modes.push(mode);
    }

    pub(crate) fn pop(&mut self) -> LexerMode {
        if self.modes.len() > 1 {
            self.modes.pop().unwrap_or(LexerMode::Default)
        } else {
            LexerMode::Default
        }
    }

    pub(crate) fn replace_top(&mut self, mode: LexerMode) {
        if self.modes.len() > 1
            && let Some(top) = self.modes.last_mut()
        {
            *top = mode;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.modes.truncate(1);
    }

    pub(crate) fn enter_brace(&mut self) {
        if let Some(LexerMode::Interpolation { depth }) = self.modes.last_mut() {
            *depth += 1;
        }
    }

    /// Handles a closing brace; returns `true` if it closed an interpolation.
    pub(crate) fn leave_brace(&mut self) -> bool {
        match self.modes.last_mut() {
            Some(LexerMode::Interpolation { depth: 0 }) => {
                self.pop();
                true
            }
            Some(LexerMode::Interpolation { depth }) => {
                *depth -= 1;
                false
            }
            _ => false,
        }
    }
}
