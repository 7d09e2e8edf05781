use bal_errors::DiagnosticCode;
use bal_yellow::TriviaPieceKind;
use text_size::TextSize;

use super::*;

fn kinds(text: &str) -> Vec<SyntaxKind> {
    kinds_with(text, LexerFlags::NONE)
}

fn kinds_with(text: &str, flags: LexerFlags) -> Vec<SyntaxKind> {
    let mut tokenizer = Tokenizer::new(text);
    tokenizer.set_flags(flags);
    let mut kinds = Vec::new();
    loop {
        let token = tokenizer.next_token();
        if token.kind == EOF {
            return kinds;
        }
        kinds.push(token.kind);
    }
}

fn token_texts(text: &str) -> Vec<&str> {
    let (tokens, _) = tokenize(text);
    tokens.iter().filter(|token| token.kind != EOF).map(|token| &text[token.range]).collect()
}

fn codes(text: &str) -> Vec<DiagnosticCode> {
    tokenize(text).1.iter().map(|diagnostic| diagnostic.code()).collect()
}

#[test]
fn longest_match_operators() {
    assert_eq!(
        kinds("a ... b ..< c ?. d ?: e === f !== g => h -> i {| |} >>= <<="),
        [
            NAME,
            ELLIPSIS,
            NAME,
            DOUBLE_DOT_LT,
            NAME,
            OPTIONAL_CHAINING,
            NAME,
            ELVIS,
            NAME,
            EQ3,
            NAME,
            NEQ2,
            NAME,
            FAT_ARROW,
            NAME,
            RIGHT_ARROW,
            NAME,
            LEFT_CLOSED_RECORD,
            RIGHT_CLOSED_RECORD,
            GT,
            GT_EQ,
            SHL_EQ,
        ]
    );
}

#[test]
fn right_shift_is_split_into_adjacent_gt() {
    let text = "a >> b >>> c";
    assert_eq!(kinds(text), [NAME, GT, GT, NAME, GT, GT, GT, NAME]);

    let (tokens, _) = tokenize(text);
    assert!(tokens[1].trailing.is_empty());
    assert_eq!(tokens[1].range.end(), tokens[2].range.start());
}

#[test]
fn numeric_literals() {
    let cases = [
        ("42", DECIMAL_INT),
        ("0x1F", HEX_INT),
        ("3.14", DECIMAL_FLOAT),
        ("1e10", DECIMAL_FLOAT),
        ("2.5e-3", DECIMAL_FLOAT),
        ("10d", DECIMAL_FLOAT),
        ("1.5f", DECIMAL_FLOAT),
        ("0x1.8p3", HEX_FLOAT),
    ];

    for (text, expected) in cases {
        let (tokens, diagnostics) = tokenize(text);
        assert_eq!(tokens[0].kind, expected, "{text}");
        assert_eq!(tokens[0].range.len(), TextSize::of(text), "{text}");
        assert!(diagnostics.is_empty(), "{text}: {diagnostics:?}");
    }

    assert_eq!(kinds("1..<5"), [DECIMAL_INT, DOUBLE_DOT_LT, DECIMAL_INT]);
    assert_eq!(kinds("1.toString"), [DECIMAL_INT, DOT, NAME]);
    assert_eq!(codes("0x"), [DiagnosticCode::MalformedNumber]);
}

#[test]
fn string_literals_and_escapes() {
    let (tokens, diagnostics) = tokenize(r#""a\n\"b\u{1F600}""#);
    assert_eq!(tokens[0].kind, STRING_LITERAL);
    assert!(diagnostics.is_empty());

    assert_eq!(codes(r#""bad \q""#), [DiagnosticCode::InvalidEscape]);
    assert_eq!(codes(r#""\u{110000}""#), [DiagnosticCode::InvalidEscape]);

    let text = "\"open\nx";
    assert_eq!(kinds(text), [STRING_LITERAL, NAME]);
    assert_eq!(codes(text), [DiagnosticCode::UnterminatedString]);
}

#[test]
fn quoted_identifiers() {
    assert_eq!(kinds("'if 'a\\-b"), [NAME, NAME]);
    assert_eq!(token_texts("'a\\-b"), ["'a\\-b"]);
}

#[test]
fn contextual_keywords_follow_flags() {
    let text = "from x where y select z";
    assert_eq!(kinds(text), [FROM_KW, NAME, NAME, NAME, NAME, NAME]);
    assert_eq!(
        kinds_with(text, LexerFlags::QUERY),
        [FROM_KW, NAME, WHERE_KW, NAME, SELECT_KW, NAME]
    );
    assert_eq!(kinds("key"), [NAME]);
    assert_eq!(kinds_with("key", LexerFlags::TABLE_TYPE), [KEY_KW]);
    assert_eq!(
        kinds_with("commit rollback", LexerFlags::TRANSACTION | LexerFlags::QUERY),
        [COMMIT_KW, ROLLBACK_KW]
    );
}

#[test]
fn trailing_trivia_ends_at_first_newline() {
    let (tokens, _) = tokenize("x = 1; // done\n\n  y");
    let semicolon = &tokens[3];
    assert_eq!(semicolon.kind, SEMICOLON);
    let pieces: Vec<_> = semicolon.trailing.pieces().iter().map(|piece| piece.kind).collect();
    assert_eq!(
        pieces,
        [TriviaPieceKind::Whitespace, TriviaPieceKind::SingleLineComment, TriviaPieceKind::Newline]
    );

    let y = &tokens[4];
    let pieces: Vec<_> = y.leading.pieces().iter().map(|piece| piece.kind).collect();
    assert_eq!(pieces, [TriviaPieceKind::Newline, TriviaPieceKind::Whitespace]);
}

#[test]
fn nested_string_templates() {
    let text = "string `a ${ string `b ${c}` } d`";
    assert_eq!(
        kinds(text),
        [
            STRING_KW,
            BACKTICK,
            TEMPLATE_STRING,
            INTERPOLATION_START,
            STRING_KW,
            BACKTICK,
            TEMPLATE_STRING,
            INTERPOLATION_START,
            NAME,
            RIGHT_BRACE,
            BACKTICK,
            RIGHT_BRACE,
            TEMPLATE_STRING,
            BACKTICK,
        ]
    );
    assert!(codes(text).is_empty());
}

#[test]
fn braces_inside_interpolation() {
    assert_eq!(
        kinds("string `${ {a: 1}.a }`"),
        [
            STRING_KW,
            BACKTICK,
            INTERPOLATION_START,
            LEFT_BRACE,
            NAME,
            COLON,
            DECIMAL_INT,
            RIGHT_BRACE,
            DOT,
            NAME,
            RIGHT_BRACE,
            BACKTICK,
        ]
    );
}

#[test]
fn xml_literal_modes() {
    let text = r#"xml `<a href="x">hi ${n}<!-- c --></a>`"#;
    assert_eq!(
        kinds(text),
        [
            XML_KW,
            BACKTICK,
            XML_TAG_OPEN,
            XML_NAME,
            XML_NAME,
            EQ,
            XML_ATTR_QUOTE,
            XML_ATTR_TEXT,
            XML_ATTR_QUOTE,
            XML_TAG_CLOSE,
            XML_TEXT,
            INTERPOLATION_START,
            NAME,
            RIGHT_BRACE,
            XML_COMMENT_START,
            XML_COMMENT_TEXT,
            XML_COMMENT_END,
            XML_TAG_OPEN_SLASH,
            XML_NAME,
            XML_TAG_CLOSE,
            BACKTICK,
        ]
    );
    assert_eq!(token_texts(text)[10], "hi ");
}

#[test]
fn xml_sections_and_attribute_values() {
    let text = r#"xml `<?target data?><a k="v ${u} w"><![CDATA[x < y]]></a>`"#;
    assert_eq!(
        kinds(text),
        [
            XML_KW,
            BACKTICK,
            XML_PI_START,
            XML_PI_TEXT,
            XML_PI_END,
            XML_TAG_OPEN,
            XML_NAME,
            XML_NAME,
            EQ,
            XML_ATTR_QUOTE,
            XML_ATTR_TEXT,
            INTERPOLATION_START,
            NAME,
            RIGHT_BRACE,
            XML_ATTR_TEXT,
            XML_ATTR_QUOTE,
            XML_TAG_CLOSE,
            XML_CDATA,
            XML_TAG_OPEN_SLASH,
            XML_NAME,
            XML_TAG_CLOSE,
            BACKTICK,
        ]
    );
    let texts = token_texts(text);
    assert_eq!(texts[3], "target data");
    assert_eq!(texts[10], "v ");
    assert_eq!(texts[17], "<![CDATA[x < y]]>");
    assert_eq!(codes(text), []);

    assert_eq!(codes("xml `<?pi`"), [DiagnosticCode::UnterminatedXmlSection]);
    assert_eq!(codes("xml `<a><![CDATA[x`"), [DiagnosticCode::UnterminatedXmlSection]);
    assert_eq!(codes("xml `<a b='c`"), [DiagnosticCode::UnterminatedString]);
}

#[test]
fn documentation_lines() {
    let text = "# Adds numbers.\n# + x - first `code`\n# + return - sum\nfunction f() {}";
    assert_eq!(
        kinds(text),
        [
            DOC_LINE_START,
            DOC_TEXT,
            DOC_LINE_START,
            DOC_PARAM_START,
            DOC_PARAM_NAME,
            DOC_DESCRIPTION_SEP,
            DOC_TEXT,
            DOC_BACKTICK,
            DOC_CODE,
            DOC_BACKTICK,
            DOC_LINE_START,
            DOC_RETURN_START,
            DOC_DESCRIPTION_SEP,
            DOC_TEXT,
            FUNCTION_KW,
            NAME,
            LEFT_PAREN,
            RIGHT_PAREN,
            LEFT_BRACE,
            RIGHT_BRACE,
        ]
    );
    assert!(codes(text).is_empty());
}

#[test]
fn unterminated_code_span_ends_with_the_line() {
    let text = "# a `b\nint x;";
    assert_eq!(
        kinds(text),
        [DOC_LINE_START, DOC_TEXT, DOC_BACKTICK, DOC_CODE, INT_KW, NAME, SEMICOLON]
    );
    assert_eq!(codes(text), [DiagnosticCode::UnterminatedCodeSpan]);
}

#[test]
fn hash_outside_line_start_is_unknown() {
    assert_eq!(kinds("x # y"), [NAME, UNKNOWN, NAME]);
    assert_eq!(codes("x # y"), [DiagnosticCode::UnexpectedCharacter]);
}

#[test]
fn eof_is_sticky_and_reports_once() {
    let mut tokenizer = Tokenizer::new("string `abc");
    let mut seen = Vec::new();
    for _ in 0..6 {
        seen.push(tokenizer.next_token().kind);
    }
    assert_eq!(seen, [STRING_KW, BACKTICK, TEMPLATE_STRING, EOF, EOF, EOF]);
    let codes: Vec<_> = tokenizer.diagnostics().iter().map(|diagnostic| diagnostic.code()).collect();
    assert_eq!(codes, [DiagnosticCode::UnterminatedTemplate]);
}

#[test]
fn restore_rewinds_position_state_and_diagnostics() {
    let mut tokenizer = Tokenizer::new("a $ where");
    let start = tokenizer.snapshot();
    while tokenizer.next_token().kind != EOF {}
    assert_eq!(tokenizer.diagnostics().len(), 1);

    tokenizer.restore(start);
    assert!(tokenizer.diagnostics().is_empty());
    assert_eq!(tokenizer.next_token().kind, NAME);
    assert_eq!(tokenizer.next_token().kind, UNKNOWN);

    let before_where = tokenizer.snapshot();
    assert_eq!(tokenizer.next_token().kind, NAME);
    tokenizer.restore(before_where);
    tokenizer.set_flags(LexerFlags::QUERY);
    assert_eq!(tokenizer.next_token().kind, WHERE_KW);
}

#[test]
fn tokens_cover_input_exactly() {
    let inputs = [
        "",
        "\n\n",
        "# doc\n",
        "xml `<a>`",
        "xml `<a b=\"c`",
        "xml `<a b=\"${c}",
        "xml `<?pi ${x}",
        "xml `<![CDATA[",
        "\"unterminated\nx",
        "'q\\ x",
        "é ü",
        "\u{0}",
        "string `${`",
        "function f() { return 1; } // tail",
    ];

    for text in inputs {
        let (tokens, _) = tokenize(text);
        let mut offset = TextSize::new(0);
        for token in &tokens {
            assert_eq!(token.full_range().start(), offset, "{text:?}");
            offset = token.full_range().end();
        }
        assert_eq!(offset, TextSize::of(text), "{text:?}");
        assert_eq!(tokens.last().map(|token| token.kind), Some(EOF));
    }
}

#[test]
fn lexing_can_resume_mid_text() {
    let text = "int x = 1;";
    let mut tokenizer = Tokenizer::new(text);
    tokenizer.next_token();
    let snapshot = tokenizer.snapshot();

    let mut resumed = Tokenizer::with_state(text, snapshot.offset(), snapshot.state().clone());
    assert_eq!(resumed.next_token().kind, NAME);
    assert_eq!(resumed.next_token().kind, EQ);
}
