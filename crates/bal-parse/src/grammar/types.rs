use bal_errors::DiagnosticCode;
use bal_tokenizer::LexerFlags;
use bal_yellow::SyntaxKind::{self, *};
use bal_yellow::SyntaxSet;

use super::{EXPR_RECOVERY, at_qualified_name, exprs, items, name};
use crate::parser::{CompletedMarker, Parser};

/// Tokens that can start a type descriptor.
pub(crate) const TYPE_FIRST: SyntaxSet = SyntaxSet::new([
    INT_KW,
    BYTE_KW,
    FLOAT_KW,
    DECIMAL_KW,
    BOOLEAN_KW,
    STRING_KW,
    ERROR_KW,
    MAP_KW,
    JSON_KW,
    XML_KW,
    TABLE_KW,
    ANY_KW,
    ANYDATA_KW,
    NEVER_KW,
    READONLY_KW,
    TYPEDESC_KW,
    NAME,
    RECORD_KW,
    OBJECT_KW,
    FUNCTION_KW,
    LEFT_PAREN,
]);

const FIELD_SKIP: SyntaxSet = SyntaxSet::new([RIGHT_BRACE, RIGHT_CLOSED_RECORD, STAR]);
const RECORD_RECOVERY: SyntaxSet = SyntaxSet::new([
    SEMICOLON,
    RIGHT_BRACE,
    RIGHT_CLOSED_RECORD,
    QUESTION,
    EQ,
    STAR,
]);

pub(crate) fn can_start(kind: SyntaxKind) -> bool {
    TYPE_FIRST.contains(kind)
}

pub(crate) fn type_(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    p.nested(union).flatten()
}

fn union(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let mut lhs = intersection(p)?;
    let mut levels = 0;
    while p.at(PIPE) && p.deepen(&mut levels) {
        let m = lhs.precede(p);
        p.advance();
        p.nested(intersection);
        lhs = m.complete(p, UNION_TYPE);
    }
    p.unwind(levels);
    Some(lhs)
}

fn intersection(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let mut lhs = postfix(p)?;
    let mut levels = 0;
    while p.at(AMP) && p.deepen(&mut levels) {
        let m = lhs.precede(p);
        p.advance();
        p.nested(postfix);
        lhs = m.complete(p, INTERSECTION_TYPE);
    }
    p.unwind(levels);
    Some(lhs)
}

/// `T?`, `T[]`, `T[N]` and `T[*]`.
fn postfix(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let mut ty = primary(p)?;
    let mut levels = 0;
    while matches!(p.peek_kind(), QUESTION | LEFT_BRACKET) && p.deepen(&mut levels) {
        ty = match p.peek_kind() {
            QUESTION => {
                let m = ty.precede(p);
                p.advance();
                m.complete(p, OPTIONAL_TYPE)
            }
            LEFT_BRACKET => {
                let m = ty.precede(p);
                p.advance();
                if !p.eat(DECIMAL_INT) && !p.eat(HEX_INT) {
                    p.eat(STAR);
                }
                p.expect(RIGHT_BRACKET);
                m.complete(p, ARRAY_TYPE)
            }
            _ => unreachable!(),
        };
    }
    p.unwind(levels);
    Some(ty)
}

fn primary(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let m = p.start();
    let kind = match p.peek_kind() {
        MAP_KW => {
            p.advance();
            type_params(p);
            MAP_TYPE
        }
        TABLE_KW => {
            p.advance();
            type_params(p);
            p.with_flags(LexerFlags::TABLE_TYPE, |p| {
                if p.at(KEY_KW) {
                    key_specifier(p);
                }
            });
            TABLE_TYPE
        }
        ERROR_KW => {
            p.advance();
            if p.at(LT) {
                type_params(p);
            }
            ERROR_TYPE
        }
        kind if kind.is_builtin_type_keyword() => {
            p.advance();
            BUILTIN_TYPE
        }
        NAME => {
            if at_qualified_name(p) {
                p.advance();
                p.advance();
            }
            p.advance();
            TYPE_REF
        }
        RECORD_KW => {
            p.advance();
            record_body(p);
            RECORD_TYPE
        }
        OBJECT_KW => {
            p.advance();
            if p.eat(LEFT_BRACE) {
                items::members(p, false);
                p.expect(RIGHT_BRACE);
            } else {
                p.missing(LEFT_BRACE);
            }
            OBJECT_TYPE
        }
        FUNCTION_KW => {
            p.advance();
            items::type_signature(p);
            FUNCTION_TYPE
        }
        LEFT_PAREN if p.nth(1) == RIGHT_PAREN => {
            p.advance();
            p.advance();
            NIL_TYPE
        }
        LEFT_PAREN => {
            p.advance();
            type_(p);
            p.expect(RIGHT_PAREN);
            PAREN_TYPE
        }
        _ => {
            m.abandon(p);
            if p.at_set(&EXPR_RECOVERY) || p.at(LEFT_BRACE) || p.at(EOF) {
                p.error(DiagnosticCode::ExpectedType, "expected a type");
            } else {
                p.error_and_bump(DiagnosticCode::ExpectedType, "expected a type");
            }
            return None;
        }
    };
    Some(m.complete(p, kind))
}

/// `<T>` after `map`, `table` and `error`.
fn type_params(p: &mut Parser<'_>) {
    if !p.eat(LT) {
        p.missing(LT);
        return;
    }
    type_(p);
    p.expect(GT);
}

fn key_specifier(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    if p.eat(LEFT_PAREN) {
        while p.eat(NAME) {
            if !p.eat(COMMA) {
                break;
            }
        }
        p.expect(RIGHT_PAREN);
    } else {
        p.missing(LEFT_PAREN);
    }
    m.complete(p, KEY_SPECIFIER);
}

/// `{ ... }` for open records, `{| ... |}` for closed ones.
fn record_body(p: &mut Parser<'_>) {
    let close = match p.peek_kind() {
        LEFT_BRACE => RIGHT_BRACE,
        LEFT_CLOSED_RECORD => RIGHT_CLOSED_RECORD,
        _ => {
            p.missing(LEFT_BRACE);
            return;
        }
    };
    p.advance();

    while !p.at(close) && !p.at(EOF) {
        if p.is_cancelled() {
            break;
        }
        let before = p.position();
        record_member(p, close);
        if p.position() == before {
            break;
        }
    }
    p.expect(close);
}

fn record_member(p: &mut Parser<'_>, close: SyntaxKind) {
    if p.at(STAR) {
        let m = p.start();
        p.advance();
        type_(p);
        p.expect(SEMICOLON);
        m.complete(p, TYPE_INCLUSION);
        return;
    }

    if !can_start(p.peek_kind()) {
        if !matches!(p.peek_kind(), RIGHT_BRACE | RIGHT_CLOSED_RECORD) {
            p.error_skip(DiagnosticCode::UnexpectedToken, "expected a record field", &FIELD_SKIP);
        }
        return;
    }

    let m = p.start();
    if readonly_qualifier(p) {
        p.advance();
    }
    type_(p);

    if p.eat(ELLIPSIS) {
        p.expect(SEMICOLON);
        m.complete(p, RECORD_REST);
        return;
    }

    name(p, &RECORD_RECOVERY.with(close));
    p.eat(QUESTION);
    if p.eat(EQ) {
        exprs::expr(p);
    }
    p.expect(SEMICOLON);
    m.complete(p, RECORD_FIELD);
}

/// `readonly` is a qualifier unless it is the field type itself, as in
/// `readonly r;`.
fn readonly_qualifier(p: &mut Parser<'_>) -> bool {
    if !p.at(READONLY_KW) {
        return false;
    }
    match p.nth(1) {
        NAME => !matches!(p.nth(2), SEMICOLON | QUESTION | EQ),
        kind => can_start(kind),
    }
}
