use std::fmt;

use bal_yellow::SyntaxToken;

/// An identifier with the `'` that escapes reserved words removed, so that
/// `'int` and `int` name the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Box<str>);

impl Name {
    pub fn new(text: &str) -> Self {
        Self(text.strip_prefix('\'').unwrap_or(text).into())
    }

    /// `None` for placeholder tokens inserted by error recovery.
    pub fn from_token(token: &SyntaxToken) -> Option<Self> {
        (!token.is_missing()).then(|| Self::new(token.text_trimmed()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `_`, which discards a value instead of naming one.
    pub fn is_wildcard(&self) -> bool {
        &*self.0 == "_"
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
