use bal_errors::DiagnosticCode;
use bal_yellow::SyntaxKind::{self, *};
use text_size::TextRange;

use crate::cursor::EOF_CHAR;
use crate::{LexerFlags, LexerMode, Tokenizer};

impl Tokenizer<'_> {
    /// Ordinary code, also used inside `${ ... }`.
    pub(crate) fn code(&mut self) -> SyntaxKind {
        let at_line_start = self.at_line_start();

        match self.cursor.advance() {
            '#' if at_line_start && self.state.is_default() => {
                self.state.push(LexerMode::Documentation);
                DOC_LINE_START
            }
            ';' => SEMICOLON,
            ',' => COMMA,
            ':' => COLON,
            '(' => LEFT_PAREN,
            ')' => RIGHT_PAREN,
            '[' => LEFT_BRACKET,
            ']' => RIGHT_BRACKET,
            '@' => AT,
            '~' => TILDE,
            '%' => PERCENT,
            '{' => {
                self.state.enter_brace();
                if self.cursor.eat('|') { LEFT_CLOSED_RECORD } else { LEFT_BRACE }
            }
            '}' => {
                self.state.leave_brace();
                RIGHT_BRACE
            }
            '|' => {
                if self.cursor.eat('}') {
                    self.state.leave_brace();
                    RIGHT_CLOSED_RECORD
                } else if self.cursor.eat('|') {
                    PIPE2
                } else if self.cursor.eat('=') {
                    PIPE_EQ
                } else {
                    PIPE
                }
            }
            '.' => {
                if self.cursor.peek() == '.' && self.cursor.second() == '.' {
                    self.cursor.advance_by(2);
                    ELLIPSIS
                } else if self.cursor.peek() == '.' && self.cursor.second() == '<' {
                    self.cursor.advance_by(2);
                    DOUBLE_DOT_LT
                } else {
                    DOT
                }
            }
            '?' => {
                if self.cursor.eat('.') {
                    OPTIONAL_CHAINING
                } else if self.cursor.eat(':') {
                    ELVIS
                } else {
                    QUESTION
                }
            }
            '=' => {
                if self.cursor.eat('=') {
                    if self.cursor.eat('=') { EQ3 } else { EQ2 }
                } else if self.cursor.eat('>') {
                    FAT_ARROW
                } else {
                    EQ
                }
            }
            '!' => {
                if self.cursor.eat('=') {
                    if self.cursor.eat('=') { NEQ2 } else { NEQ }
                } else {
                    BANG
                }
            }
            '+' => if self.cursor.eat('=') { PLUS_EQ } else { PLUS },
            '-' => {
                if self.cursor.eat('=') {
                    MINUS_EQ
                } else if self.cursor.eat('>') {
                    RIGHT_ARROW
                } else {
                    MINUS
                }
            }
            '*' => if self.cursor.eat('=') { STAR_EQ } else { STAR },
            '/' => if self.cursor.eat('=') { SLASH_EQ } else { SLASH },
            '^' => if self.cursor.eat('=') { CARET_EQ } else { CARET },
            '&' => {
                if self.cursor.eat('&') {
                    AMP2
                } else if self.cursor.eat('=') {
                    AMP_EQ
                } else {
                    AMP
                }
            }
            '<' => {
                if self.cursor.eat('<') {
                    if self.cursor.eat('=') { SHL_EQ } else { SHL }
                } else if self.cursor.eat('=') {
                    LT_EQ
                } else {
                    LT
                }
            }
            // Right shifts are composed by the parser from adjacent `>`
            // tokens, so `map<map<int>>` needs no splitting.
            '>' => if self.cursor.eat('=') { GT_EQ } else { GT },
            '`' => {
                let mode = if self.state.prev() == XML_KW {
                    LexerMode::Xml
                } else {
                    LexerMode::StringTemplate
                };
                self.state.push(mode);
                BACKTICK
            }
            '"' => self.string(),
            '\'' => self.quoted_identifier(),
            first @ '0'..='9' => self.number(first),
            c if is_ident_start(c) => {
                self.cursor.advance_while(is_ident_continue);
                keyword(self.cursor.token_text(), self.state.flags()).unwrap_or(NAME)
            }
            c => {
                let range = self.token_range();
                self.error(
                    DiagnosticCode::UnexpectedCharacter,
                    format!("unexpected character `{}`", c.escape_debug()),
                    range,
                );
                UNKNOWN
            }
        }
    }

    /// Only spaces and tabs between the previous newline and the cursor.
    fn at_line_start(&self) -> bool {
        let before = self.cursor.before();
        let line = before.rfind('\n').map_or(before, |newline| &before[newline + 1..]);
        line.chars().all(|c| c == ' ' || c == '\t')
    }

    fn string(&mut self) -> SyntaxKind {
        loop {
            match self.cursor.peek() {
                _ if self.cursor.is_eof() => break,
                '\n' => break,
                '"' => {
                    self.cursor.advance();
                    return STRING_LITERAL;
                }
                '\\' => self.escape(),
                _ => {
                    self.cursor.advance();
                }
            }
        }
        let range = self.token_range();
        self.error(DiagnosticCode::UnterminatedString, "unterminated string literal", range);
        STRING_LITERAL
    }

    fn escape(&mut self) {
        let start = self.cursor.offset();
        self.cursor.advance();
        match self.cursor.peek() {
            'n' | 't' | 'r' | '\\' | '"' | '\'' => {
                self.cursor.advance();
            }
            'u' if self.cursor.second() == '{' => {
                self.cursor.advance_by(2);
                let digits_start = self.cursor.rest();
                let count = self.cursor.advance_while(|c| c.is_ascii_hexdigit());
                let valid = (1..=6).contains(&count)
                    && u32::from_str_radix(&digits_start[..count], 16)
                        .ok()
                        .and_then(char::from_u32)
                        .is_some();
                let closed = self.cursor.eat('}');
                if !(valid && closed) {
                    let range = TextRange::new(start, self.cursor.offset());
                    self.error(DiagnosticCode::InvalidEscape, "invalid unicode escape", range);
                }
            }
            c => {
                if !self.cursor.is_eof() && c != '\n' {
                    self.cursor.advance();
                }
                let range = TextRange::new(start, self.cursor.offset());
                self.error(
                    DiagnosticCode::InvalidEscape,
                    format!("invalid escape sequence `\\{}`", c.escape_debug()),
                    range,
                );
            }
        }
    }

    /// `'name`, where `\` escapes the following character.
    fn quoted_identifier(&mut self) -> SyntaxKind {
        let mut len = 0;
        loop {
            match self.cursor.peek() {
                '\\' if !self.cursor.second().is_whitespace() && self.cursor.second() != EOF_CHAR => {
                    self.cursor.advance_by(2);
                }
                c if is_ident_continue(c) && !self.cursor.is_eof() => {
                    self.cursor.advance();
                }
                _ => break,
            }
            len += 1;
        }
        if len == 0 {
            let range = self.token_range();
            self.error(DiagnosticCode::UnexpectedCharacter, "unexpected character `'`", range);
            return UNKNOWN;
        }
        NAME
    }

    fn number(&mut self, first: char) -> SyntaxKind {
        if first == '0' && matches!(self.cursor.peek(), 'x' | 'X') {
            self.cursor.advance();
            return self.hex_number();
        }

        self.cursor.advance_while(|c| c.is_ascii_digit());
        let mut float = false;

        if self.cursor.peek() == '.' && self.cursor.second().is_ascii_digit() {
            self.cursor.advance();
            self.cursor.advance_while(|c| c.is_ascii_digit());
            float = true;
        }

        if matches!(self.cursor.peek(), 'e' | 'E') {
            let second = self.cursor.second();
            let signed = matches!(second, '+' | '-') && self.cursor.third().is_ascii_digit();
            if second.is_ascii_digit() || signed {
                self.cursor.advance_by(if signed { 2 } else { 1 });
                self.cursor.advance_while(|c| c.is_ascii_digit());
                float = true;
            }
        }

        if matches!(self.cursor.peek(), 'f' | 'F' | 'd' | 'D')
            && !is_ident_continue(self.cursor.second())
        {
            self.cursor.advance();
            float = true;
        }

        if float { DECIMAL_FLOAT } else { DECIMAL_INT }
    }

    fn hex_number(&mut self) -> SyntaxKind {
        let digits = self.cursor.advance_while(|c| c.is_ascii_hexdigit());
        let mut float = false;

        if self.cursor.peek() == '.' && self.cursor.second().is_ascii_hexdigit() {
            self.cursor.advance();
            self.cursor.advance_while(|c| c.is_ascii_hexdigit());
            float = true;
        }

        if matches!(self.cursor.peek(), 'p' | 'P') {
            self.cursor.advance();
            if matches!(self.cursor.peek(), '+' | '-') {
                self.cursor.advance();
            }
            if self.cursor.advance_while(|c| c.is_ascii_digit()) == 0 {
                let range = self.token_range();
                self.error(DiagnosticCode::MalformedNumber, "missing exponent digits", range);
            }
            float = true;
        }

        if digits == 0 && !float {
            let range = self.token_range();
            self.error(
                DiagnosticCode::MalformedNumber,
                "hexadecimal literal has no digits",
                range,
            );
        }

        if float { HEX_FLOAT } else { HEX_INT }
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn keyword(text: &str, flags: LexerFlags) -> Option<SyntaxKind> {
    Some(match text {
        "import" => IMPORT_KW,
        "as" => AS_KW,
        "public" => PUBLIC_KW,
        "final" => FINAL_KW,
        "isolated" => ISOLATED_KW,
        "function" => FUNCTION_KW,
        "returns" => RETURNS_KW,
        "return" => RETURN_KW,
        "type" => TYPE_KW,
        "record" => RECORD_KW,
        "object" => OBJECT_KW,
        "class" => CLASS_KW,
        "const" => CONST_KW,
        "var" => VAR_KW,
        "new" => NEW_KW,
        "if" => IF_KW,
        "else" => ELSE_KW,
        "while" => WHILE_KW,
        "foreach" => FOREACH_KW,
        "in" => IN_KW,
        "break" => BREAK_KW,
        "continue" => CONTINUE_KW,
        "panic" => PANIC_KW,
        "check" => CHECK_KW,
        "checkpanic" => CHECKPANIC_KW,
        "trap" => TRAP_KW,
        "is" => IS_KW,
        "typeof" => TYPEOF_KW,
        "true" => TRUE_KW,
        "false" => FALSE_KW,
        "null" => NULL_KW,
        "lock" => LOCK_KW,
        "transaction" => TRANSACTION_KW,
        "self" => SELF_KW,
        "from" => FROM_KW,
        "int" => INT_KW,
        "byte" => BYTE_KW,
        "float" => FLOAT_KW,
        "decimal" => DECIMAL_KW,
        "boolean" => BOOLEAN_KW,
        "string" => STRING_KW,
        "error" => ERROR_KW,
        "map" => MAP_KW,
        "json" => JSON_KW,
        "xml" => XML_KW,
        "table" => TABLE_KW,
        "any" => ANY_KW,
        "anydata" => ANYDATA_KW,
        "never" => NEVER_KW,
        "readonly" => READONLY_KW,
        "typedesc" => TYPEDESC_KW,
        "where" if flags.contains(LexerFlags::QUERY) => WHERE_KW,
        "select" if flags.contains(LexerFlags::QUERY) => SELECT_KW,
        "let" if flags.contains(LexerFlags::QUERY) => LET_KW,
        "limit" if flags.contains(LexerFlags::QUERY) => LIMIT_KW,
        "commit" if flags.contains(LexerFlags::TRANSACTION) => COMMIT_KW,
        "rollback" if flags.contains(LexerFlags::TRANSACTION) => ROLLBACK_KW,
        "key" if flags.contains(LexerFlags::TABLE_TYPE) => KEY_KW,
        _ => return None,
    })
}

