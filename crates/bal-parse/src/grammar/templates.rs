//! String templates and XML literals. The tokenizer switches modes on the
//! backticks, so these parsers only see template tokens between them.

use bal_errors::DiagnosticCode;
use bal_yellow::SyntaxKind::*;
use bal_yellow::SyntaxSet;
use text_size::TextRange;

use super::exprs;
use crate::parser::{CompletedMarker, Parser};

const INTERPOLATION_END: SyntaxSet = SyntaxSet::new([RIGHT_BRACE]);

/// `` string `...${e}...` `` or a bare backtick template.
pub(super) fn string_template(p: &mut Parser<'_>) -> CompletedMarker {
    let m = p.start();
    p.eat(STRING_KW);
    p.expect(BACKTICK);

    loop {
        match p.peek_kind() {
            TEMPLATE_STRING => p.advance(),
            INTERPOLATION_START => interpolation(p),
            BACKTICK => {
                p.advance();
                break;
            }
            // Reported by the tokenizer.
            EOF => {
                p.placeholder(BACKTICK);
                break;
            }
            _ => p.error_and_bump(DiagnosticCode::UnexpectedToken, "unexpected token in template"),
        }
    }

    m.complete(p, STRING_TEMPLATE_EXPR)
}

fn interpolation(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    exprs::expr(p);

    if !p.at(RIGHT_BRACE) && !p.at(EOF) {
        p.error_recover(DiagnosticCode::UnexpectedToken, "expected `}`", &INTERPOLATION_END);
    }
    p.expect_silent(RIGHT_BRACE);
    m.complete(p, INTERPOLATION);
}

pub(super) fn xml_template(p: &mut Parser<'_>) -> CompletedMarker {
    let m = p.start();
    p.advance();
    if !p.at(BACKTICK) {
        p.missing(BACKTICK);
        return m.complete(p, XML_TEMPLATE_EXPR);
    }
    p.advance();

    loop {
        xml_content(p);
        match p.peek_kind() {
            BACKTICK => {
                p.advance();
                break;
            }
            EOF => {
                p.placeholder(BACKTICK);
                break;
            }
            XML_TAG_OPEN_SLASH => stray_end_tag(p),
            _ => break,
        }
    }

    m.complete(p, XML_TEMPLATE_EXPR)
}

/// Text, interpolations, comments and elements, up to an end tag or the
/// end of the literal.
fn xml_content(p: &mut Parser<'_>) {
    loop {
        match p.peek_kind() {
            XML_TEXT | XML_CDATA => p.advance(),
            INTERPOLATION_START => interpolation(p),
            XML_COMMENT_START => xml_comment(p),
            XML_PI_START => xml_pi(p),
            XML_TAG_OPEN => {
                p.nested(xml_element);
            }
            XML_TAG_OPEN_SLASH | BACKTICK | EOF => return,
            _ => p.error_and_bump(DiagnosticCode::UnexpectedToken, "unexpected token in XML"),
        }
    }
}

fn xml_comment(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    while p.at(XML_COMMENT_TEXT) {
        p.advance();
    }
    p.expect_silent(XML_COMMENT_END);
    m.complete(p, XML_COMMENT);
}

fn xml_pi(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    loop {
        match p.peek_kind() {
            XML_PI_TEXT => p.advance(),
            INTERPOLATION_START => interpolation(p),
            _ => break,
        }
    }
    p.expect_silent(XML_PI_END);
    m.complete(p, XML_PI);
}

fn xml_element(p: &mut Parser<'_>) {
    let m = p.start();
    let tag = p.start();
    p.advance();
    let name = qname(p);

    loop {
        match p.peek_kind() {
            XML_NAME => {
                let attribute = p.start();
                qname(p);
                p.expect(EQ);
                attribute_value(p);
                attribute.complete(p, XML_ATTRIBUTE);
            }
            UNKNOWN => {
                let error = p.start();
                p.advance();
                error.complete(p, ERROR);
            }
            EQ | XML_ATTR_QUOTE => {
                p.error_and_bump(DiagnosticCode::UnexpectedToken, "expected attribute name");
            }
            _ => break,
        }
    }

    if p.eat(XML_TAG_SLASH_CLOSE) {
        tag.complete(p, XML_EMPTY_ELEMENT);
        m.abandon(p);
        return;
    }
    p.expect(XML_TAG_CLOSE);
    tag.complete(p, XML_START_TAG);

    xml_content(p);

    if p.at(XML_TAG_OPEN_SLASH) {
        let end = p.start();
        p.advance();
        let end_name = qname(p);
        p.expect(XML_TAG_CLOSE);
        end.complete(p, XML_END_TAG);

        if let (Some((open, _)), Some((close, range))) = (name, end_name)
            && open != close
        {
            let message = format!("mismatched closing tag: expected `</{open}>`, found `</{close}>`");
            p.report(DiagnosticCode::XmlTagMismatch, message, range);
        }
    } else if let Some((open, range)) = name
        && !p.at(EOF)
    {
        let message = format!("missing closing tag for `<{open}>`");
        p.report(DiagnosticCode::XmlTagMismatch, message, range);
    }

    m.complete(p, XML_ELEMENT);
}

/// `"..."` or `'...'`, with interpolations.
fn attribute_value(p: &mut Parser<'_>) {
    if !p.at(XML_ATTR_QUOTE) {
        p.missing(XML_ATTR_QUOTE);
        return;
    }
    let m = p.start();
    p.advance();
    loop {
        match p.peek_kind() {
            XML_ATTR_TEXT => p.advance(),
            INTERPOLATION_START => interpolation(p),
            _ => break,
        }
    }
    // An unterminated value is reported by the tokenizer.
    p.expect_silent(XML_ATTR_QUOTE);
    m.complete(p, XML_ATTR_VALUE);
}

/// A tag name, returned with its range.
fn qname<'t>(p: &mut Parser<'t>) -> Option<(&'t str, TextRange)> {
    if !p.at(XML_NAME) {
        p.missing(XML_NAME);
        return None;
    }
    let text = p.current_text();
    let range = p.current().range;
    let m = p.start();
    p.advance();
    m.complete(p, XML_QNAME);
    Some((text, range))
}

fn stray_end_tag(p: &mut Parser<'_>) {
    p.error(DiagnosticCode::XmlTagMismatch, "closing tag without a matching opening tag");
    let m = p.start();
    p.advance();
    if p.at(XML_NAME) {
        p.advance();
    }
    p.expect_silent(XML_TAG_CLOSE);
    m.complete(p, ERROR);
}
