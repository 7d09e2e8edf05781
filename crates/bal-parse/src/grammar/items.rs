use bal_errors::DiagnosticCode;
use bal_yellow::SyntaxKind::*;
use bal_yellow::SyntaxSet;

use super::{ITEM_START, delimited, exprs, name, qualifiers, stmts, typed_binding, types};
use crate::parser::Parser;

const IMPORT_RECOVERY: SyntaxSet = ITEM_START.with(SEMICOLON);
const DECL_RECOVERY: SyntaxSet = ITEM_START.union(&SyntaxSet::new([SEMICOLON, EQ]));
const SIGNATURE_RECOVERY: SyntaxSet =
    ITEM_START.union(&SyntaxSet::new([LEFT_PAREN, LEFT_BRACE, RETURNS_KW, SEMICOLON]));
const PARAM_RECOVERY: SyntaxSet =
    SyntaxSet::new([COMMA, RIGHT_PAREN, EQ, LEFT_BRACE, RETURNS_KW]);
const PARAM_STOP: SyntaxSet = ITEM_START.union(&SyntaxSet::new([LEFT_BRACE, SEMICOLON]));
const MEMBER_RECOVERY: SyntaxSet = SyntaxSet::new([
    RIGHT_BRACE,
    FUNCTION_KW,
    PUBLIC_KW,
    ISOLATED_KW,
    FINAL_KW,
    STAR,
    DOC_LINE_START,
]);

pub(crate) fn module(p: &mut Parser<'_>) {
    let m = p.start();

    while !p.at(EOF) {
        if p.is_cancelled() {
            break;
        }

        let before = p.position();
        match p.peek_kind() {
            IMPORT_KW => import(p),
            _ => item(p),
        }
        if p.position() == before && !p.at(EOF) {
            p.error_and_bump(DiagnosticCode::ExpectedItem, "expected an item");
        }
    }

    p.eof();
    m.complete(p, MODULE);
}

fn import(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();

    if p.at(NAME) && p.nth(1) == SLASH {
        let org = p.start();
        p.advance();
        p.advance();
        org.complete(p, IMPORT_ORG);
    }

    let names = p.start();
    name(p, &IMPORT_RECOVERY);
    while p.eat(DOT) {
        name(p, &IMPORT_RECOVERY);
    }
    names.complete(p, IMPORT_MODULE_NAME);

    if p.at(AS_KW) {
        let prefix = p.start();
        p.advance();
        name(p, &IMPORT_RECOVERY);
        prefix.complete(p, IMPORT_PREFIX);
    }

    p.expect(SEMICOLON);
    m.complete(p, IMPORT_DECL);
}

fn item(p: &mut Parser<'_>) {
    let start = p.position();
    let m = p.start();
    if p.at(DOC_LINE_START) {
        documentation(p);
    }
    qualifiers(p);

    let kind = match p.peek_kind() {
        FUNCTION_KW if p.nth(1) != LEFT_PAREN => {
            function_def(p);
            FUNCTION_DEF
        }
        TYPE_KW => {
            type_def(p);
            TYPE_DEF
        }
        CONST_KW => {
            const_decl(p);
            CONST_DECL
        }
        CLASS_KW => {
            p.advance();
            name(p, &ITEM_START.with(LEFT_BRACE));
            class_body(p);
            CLASS_DEF
        }
        kind if kind == VAR_KW || types::can_start(kind) => {
            typed_binding(p, &DECL_RECOVERY);
            if p.eat(EQ) {
                exprs::expr(p);
            }
            p.expect(SEMICOLON);
            MODULE_VAR_DECL
        }
        SEMICOLON if p.position() == start => {
            m.abandon(p);
            p.error_and_bump(DiagnosticCode::ExpectedItem, "expected an item, found `;`");
            return;
        }
        _ if p.position() == start => {
            m.abandon(p);
            p.error_skip(DiagnosticCode::ExpectedItem, "expected an item", &ITEM_START);
            return;
        }
        _ => {
            p.error(DiagnosticCode::ExpectedItem, "expected an item after qualifiers");
            ERROR
        }
    };

    m.complete(p, kind);
}

fn function_def(p: &mut Parser<'_>) {
    p.advance();
    name(p, &SIGNATURE_RECOVERY);
    signature(p);
    stmts::block(p);
}

/// Parameter list and optional `returns` clause.
pub(crate) fn signature(p: &mut Parser<'_>) {
    signature_with(p, true);
}

/// A function type signature, where parameter names are optional.
pub(crate) fn type_signature(p: &mut Parser<'_>) {
    signature_with(p, false);
}

fn signature_with(p: &mut Parser<'_>, named: bool) {
    if p.at(LEFT_PAREN) {
        param_list(p, named);
    } else {
        let m = p.start();
        p.missing(LEFT_PAREN);
        p.placeholder(RIGHT_PAREN);
        m.complete(p, PARAM_LIST);
    }

    if p.at(RETURNS_KW) {
        let m = p.start();
        p.advance();
        types::type_(p);
        m.complete(p, RETURN_TYPE);
    }
}

fn param_list(p: &mut Parser<'_>, named: bool) {
    let m = p.start();
    delimited(
        p,
        LEFT_PAREN,
        RIGHT_PAREN,
        COMMA,
        "expected parameter",
        &types::TYPE_FIRST,
        |p| param(p, named),
    );
    m.complete(p, PARAM_LIST);
}

fn param(p: &mut Parser<'_>, named: bool) -> bool {
    if !types::can_start(p.peek_kind()) {
        if p.at_set(&PARAM_STOP) {
            return false;
        }
        p.error_and_bump(DiagnosticCode::ExpectedType, "expected parameter type");
        return true;
    }

    let m = p.start();
    types::type_(p);

    if p.eat(ELLIPSIS) {
        if named || p.at(NAME) {
            name(p, &PARAM_RECOVERY);
        }
        m.complete(p, REST_PARAM);
        return true;
    }

    if named || p.at(NAME) {
        name(p, &PARAM_RECOVERY);
    }
    if p.at(EQ) {
        let default = p.start();
        p.advance();
        exprs::expr(p);
        default.complete(p, PARAM_DEFAULT);
    }
    m.complete(p, PARAM);
    true
}

fn type_def(p: &mut Parser<'_>) {
    p.advance();
    name(p, &DECL_RECOVERY.union(&types::TYPE_FIRST));
    types::type_(p);
    p.expect(SEMICOLON);
}

fn const_decl(p: &mut Parser<'_>) {
    p.advance();
    if !(p.at(NAME) && p.nth(1) == EQ) {
        types::type_(p);
    }
    name(p, &DECL_RECOVERY);
    p.expect(EQ);
    exprs::expr(p);
    p.expect(SEMICOLON);
}

pub(crate) fn class_body(p: &mut Parser<'_>) {
    let m = p.start();
    if p.eat(LEFT_BRACE) {
        members(p, true);
        p.expect(RIGHT_BRACE);
    } else {
        p.missing(LEFT_BRACE);
        p.placeholder(RIGHT_BRACE);
    }
    m.complete(p, CLASS_BODY);
}

/// Fields, methods and type inclusions of a class or object type. Class
/// fields may have initializers and class methods have bodies.
pub(crate) fn members(p: &mut Parser<'_>, class: bool) {
    while !p.at(RIGHT_BRACE) && !p.at(EOF) {
        if p.is_cancelled() {
            break;
        }

        let before = p.position();
        member(p, class);
        if p.position() == before && !p.at(RIGHT_BRACE) && !p.at(EOF) {
            p.error_and_bump(DiagnosticCode::UnexpectedToken, "expected a field or method");
        }
    }
}

fn member(p: &mut Parser<'_>, class: bool) {
    if p.at(STAR) {
        let m = p.start();
        p.advance();
        types::type_(p);
        p.expect(SEMICOLON);
        m.complete(p, TYPE_INCLUSION);
        return;
    }

    let start = p.position();
    let m = p.start();
    if p.at(DOC_LINE_START) {
        documentation(p);
    }
    qualifiers(p);

    let kind = match p.peek_kind() {
        FUNCTION_KW => {
            p.advance();
            name(p, &SIGNATURE_RECOVERY);
            signature(p);
            if class {
                stmts::block(p);
            } else {
                p.expect(SEMICOLON);
            }
            METHOD_DEF
        }
        kind if types::can_start(kind) => {
            types::type_(p);
            name(p, &MEMBER_RECOVERY.union(&SyntaxSet::new([EQ, SEMICOLON])));
            if class && p.eat(EQ) {
                exprs::expr(p);
            }
            p.expect(SEMICOLON);
            OBJECT_FIELD
        }
        _ if p.position() == start => {
            m.abandon(p);
            p.error_skip(
                DiagnosticCode::UnexpectedToken,
                "expected a field or method",
                &MEMBER_RECOVERY,
            );
            return;
        }
        _ => {
            p.error(DiagnosticCode::UnexpectedToken, "expected a field or method");
            ERROR
        }
    };

    m.complete(p, kind);
}

/// A run of `#` lines.
pub(crate) fn documentation(p: &mut Parser<'_>) {
    let m = p.start();
    while p.at(DOC_LINE_START) {
        doc_line(p);
    }
    m.complete(p, DOCUMENTATION);
}

fn doc_line(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();

    let kind = match p.peek_kind() {
        DOC_PARAM_START => {
            p.advance();
            p.expect(DOC_PARAM_NAME);
            p.expect(DOC_DESCRIPTION_SEP);
            DOC_PARAM_LINE
        }
        DOC_RETURN_START => {
            p.advance();
            p.expect(DOC_DESCRIPTION_SEP);
            DOC_PARAM_LINE
        }
        _ => DOC_LINE,
    };

    loop {
        match p.peek_kind() {
            DOC_TEXT | DOC_PARAM_NAME | DOC_DESCRIPTION_SEP => p.advance(),
            DOC_BACKTICK => code_span(p),
            _ => break,
        }
    }

    m.complete(p, kind);
}

fn code_span(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    while p.at(DOC_CODE) {
        p.advance();
    }
    // An unclosed span is reported by the tokenizer.
    p.expect_silent(DOC_BACKTICK);
    m.complete(p, DOC_CODE_SPAN);
}
