use std::str::Chars;

use text_size::TextSize;

pub(crate) const EOF_CHAR: char = '\0';

#[derive(Clone)]
pub(crate) struct Cursor<'a> {
    text: &'a str,
    chars: Chars<'a>,
    token_start: TextSize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn at(text: &'a str, offset: TextSize) -> Self {
        let rest = &text[usize::from(offset)..];
        Self { text, chars: rest.chars(), token_start: offset }
    }

    pub(crate) fn offset(&self) -> TextSize {
        TextSize::new((self.text.len() - self.chars.as_str().len()) as u32)
    }

    pub(crate) fn pos_within_token(&self) -> TextSize {
        self.offset() - self.token_start
    }

    pub(crate) fn reset_pos_within_token(&mut self) {
        self.token_start = self.offset();
    }

    pub(crate) fn token_text(&self) -> &'a str {
        let start = usize::from(self.token_start);
        let end = usize::from(self.offset());
        &self.text[start..end]
    }

    /// Text before the cursor.
    pub(crate) fn before(&self) -> &'a str {
        &self.text[..usize::from(self.offset())]
    }

    pub(crate) fn rest(&self) -> &'a str {
        self.chars.as_str()
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub(crate) fn peek(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    pub(crate) fn second(&self) -> char {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next().unwrap_or(EOF_CHAR)
    }

    pub(crate) fn third(&self) -> char {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next();
        chars.next().unwrap_or(EOF_CHAR)
    }

    pub(crate) fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub(crate) fn advance(&mut self) -> char {
        self.chars.next().unwrap_or(EOF_CHAR)
    }

    pub(crate) fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    pub(crate) fn eat(&mut self, c: char) -> bool {
        if !self.is_eof() && self.peek() == c {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances while `f` holds and returns how many chars were consumed.
    pub(crate) fn advance_while(&mut self, f: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while !self.is_eof() && f(self.peek()) {
            self.advance();
            count += 1;
        }
        count
    }

    /// Length of the run of `c` starting at the cursor.
    pub(crate) fn run_len(&self, c: char) -> usize {
        self.rest().chars().take_while(|&next| next == c).count()
    }
}
