//! Modes for string templates, XML literals and documentation lines.

use bal_errors::DiagnosticCode;
use bal_yellow::SyntaxKind::{self, *};
use text_size::TextRange;

use crate::code::{is_ident_continue, is_ident_start};
use crate::{LexerMode, Tokenizer};

impl Tokenizer<'_> {
    fn interpolation_start(&mut self) -> Option<SyntaxKind> {
        if self.cursor.starts_with("${") {
            self.cursor.advance_by(2);
            self.state.push(LexerMode::Interpolation { depth: 0 });
            Some(INTERPOLATION_START)
        } else {
            None
        }
    }

    pub(crate) fn string_template(&mut self) -> SyntaxKind {
        if self.cursor.eat('`') {
            self.state.pop();
            return BACKTICK;
        }
        if let Some(kind) = self.interpolation_start() {
            return kind;
        }
        while !self.cursor.is_eof() && self.cursor.peek() != '`' && !self.cursor.starts_with("${") {
            self.cursor.advance();
        }
        TEMPLATE_STRING
    }

    pub(crate) fn xml_content(&mut self) -> SyntaxKind {
        if self.cursor.eat('`') {
            self.state.pop();
            return BACKTICK;
        }
        if let Some(kind) = self.interpolation_start() {
            return kind;
        }
        if self.cursor.starts_with("<!--") {
            self.cursor.advance_by(4);
            self.state.push(LexerMode::XmlComment);
            return XML_COMMENT_START;
        }
        if self.cursor.starts_with("<![CDATA[") {
            return self.xml_cdata();
        }
        if self.cursor.starts_with("<?") {
            self.cursor.advance_by(2);
            self.state.push(LexerMode::XmlPi);
            return XML_PI_START;
        }
        if self.cursor.starts_with("</") {
            self.cursor.advance_by(2);
            self.state.push(LexerMode::XmlTag);
            return XML_TAG_OPEN_SLASH;
        }
        if self.cursor.eat('<') {
            self.state.push(LexerMode::XmlTag);
            return XML_TAG_OPEN;
        }
        while !self.cursor.is_eof()
            && !matches!(self.cursor.peek(), '<' | '`')
            && !self.cursor.starts_with("${")
        {
            self.cursor.advance();
        }
        XML_TEXT
    }

    pub(crate) fn xml_tag(&mut self) -> SyntaxKind {
        match self.cursor.peek() {
            '>' => {
                self.cursor.advance();
                self.state.pop();
                XML_TAG_CLOSE
            }
            '/' if self.cursor.second() == '>' => {
                self.cursor.advance_by(2);
                self.state.pop();
                XML_TAG_SLASH_CLOSE
            }
            '=' => {
                self.cursor.advance();
                EQ
            }
            quote @ ('"' | '\'') => {
                self.cursor.advance();
                self.state.push(LexerMode::XmlAttrValue { quote });
                XML_ATTR_QUOTE
            }
            // The literal ends inside a tag; the parser reports the missing `>`.
            '`' => {
                self.state.pop();
                self.token_kind()
            }
            c if is_ident_start(c) => {
                self.cursor.advance_while(|c| is_ident_continue(c) || matches!(c, ':' | '-' | '.'));
                XML_NAME
            }
            c => {
                self.cursor.advance();
                let range = self.token_range();
                self.error(
                    DiagnosticCode::UnexpectedCharacter,
                    format!("unexpected character `{}` in XML tag", c.escape_debug()),
                    range,
                );
                UNKNOWN
            }
        }
    }

    /// Text and interpolations of a quoted attribute value.
    pub(crate) fn xml_attr_value(&mut self, quote: char) -> SyntaxKind {
        if self.cursor.eat(quote) {
            self.state.pop();
            return XML_ATTR_QUOTE;
        }
        if let Some(kind) = self.interpolation_start() {
            return kind;
        }
        if self.cursor.peek() == '`' {
            let at = TextRange::empty(self.cursor.offset());
            self.error(DiagnosticCode::UnterminatedString, "unterminated attribute value", at);
            self.state.pop();
            return self.token_kind();
        }
        while !self.cursor.is_eof()
            && self.cursor.peek() != '`'
            && self.cursor.peek() != quote
            && !self.cursor.starts_with("${")
        {
            self.cursor.advance();
        }
        XML_ATTR_TEXT
    }

    /// The body of `<![CDATA[ ... ]]>` is taken verbatim.
    fn xml_cdata(&mut self) -> SyntaxKind {
        self.cursor.advance_by("<![CDATA[".len());
        while !self.cursor.is_eof() && self.cursor.peek() != '`' && !self.cursor.starts_with("]]>") {
            self.cursor.advance();
        }
        if self.cursor.starts_with("]]>") {
            self.cursor.advance_by(3);
        } else {
            let range = self.token_range();
            self.error(DiagnosticCode::UnterminatedXmlSection, "unterminated CDATA section", range);
        }
        XML_CDATA
    }

    pub(crate) fn xml_pi(&mut self) -> SyntaxKind {
        if self.cursor.starts_with("?>") {
            self.cursor.advance_by(2);
            self.state.pop();
            return XML_PI_END;
        }
        if let Some(kind) = self.interpolation_start() {
            return kind;
        }
        if self.cursor.peek() == '`' {
            let at = TextRange::empty(self.cursor.offset());
            self.error(
                DiagnosticCode::UnterminatedXmlSection,
                "unterminated processing instruction",
                at,
            );
            self.state.pop();
            return self.token_kind();
        }
        while !self.cursor.is_eof()
            && self.cursor.peek() != '`'
            && !self.cursor.starts_with("?>")
            && !self.cursor.starts_with("${")
        {
            self.cursor.advance();
        }
        XML_PI_TEXT
    }

    pub(crate) fn xml_comment(&mut self) -> SyntaxKind {
        if self.cursor.starts_with("-->") {
            self.cursor.advance_by(3);
            self.state.pop();
            return XML_COMMENT_END;
        }
        if self.cursor.peek() == '`' {
            let at = TextRange::empty(self.cursor.offset());
            self.error(DiagnosticCode::UnterminatedXmlComment, "unterminated XML comment", at);
            self.state.pop();
            return self.token_kind();
        }
        while !self.cursor.is_eof() && self.cursor.peek() != '`' && !self.cursor.starts_with("-->") {
            self.cursor.advance();
        }
        XML_COMMENT_TEXT
    }

    pub(crate) fn documentation(&mut self) -> SyntaxKind {
        if self.state.prev() == DOC_LINE_START && self.cursor.peek() == '+' {
            return self.doc_param_start();
        }
        if self.cursor.peek() == '`' {
            let run = self.cursor.run_len('`');
            self.cursor.advance_by(run);
            if run <= 3 {
                self.state.push(LexerMode::Backtick(run as u8));
                return DOC_BACKTICK;
            }
        }
        self.cursor.advance_while(|c| c != '\n' && c != '`');
        DOC_TEXT
    }

    /// `+ name` or `+ return`. The latter is a single token.
    fn doc_param_start(&mut self) -> SyntaxKind {
        self.cursor.advance();
        self.state.replace_top(LexerMode::DocumentationParam);

        let rest = self.cursor.rest();
        let word = rest.trim_start_matches([' ', '\t']);
        let skipped = rest.len() - word.len();
        if let Some(after) = word.strip_prefix("return")
            && !after.starts_with(is_ident_continue)
        {
            let spaces = rest[..skipped].chars().count();
            self.cursor.advance_by(spaces + "return".len());
            return DOC_RETURN_START;
        }
        DOC_PARAM_START
    }

    pub(crate) fn documentation_param(&mut self) -> SyntaxKind {
        let c = self.cursor.peek();
        if c == '-' {
            self.cursor.advance();
            self.state.replace_top(LexerMode::Documentation);
            return DOC_DESCRIPTION_SEP;
        }
        if is_ident_start(c) {
            self.cursor.advance_while(is_ident_continue);
            return DOC_PARAM_NAME;
        }
        self.state.replace_top(LexerMode::Documentation);
        self.documentation()
    }

    pub(crate) fn code_span(&mut self, n: u8) -> SyntaxKind {
        let n = usize::from(n);
        if self.cursor.peek() == '`' && self.cursor.run_len('`') == n {
            self.cursor.advance_by(n);
            self.state.pop();
            return DOC_BACKTICK;
        }
        while !self.cursor.is_eof() && self.cursor.peek() != '\n' {
            if self.cursor.peek() == '`' {
                let run = self.cursor.run_len('`');
                if run == n {
                    break;
                }
                self.cursor.advance_by(run);
            } else {
                self.cursor.advance();
            }
        }
        DOC_CODE
    }
}
