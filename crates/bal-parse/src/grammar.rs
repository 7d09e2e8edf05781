use bal_errors::DiagnosticCode;
use bal_yellow::SyntaxKind::{self, *};
use bal_yellow::SyntaxSet;

use crate::parser::Parser;

pub(crate) mod exprs;
pub(crate) mod items;
pub(crate) mod stmts;
mod templates;
pub(crate) mod types;

/// Tokens that start a module level declaration.
pub(crate) const ITEM_START: SyntaxSet = SyntaxSet::new([
    IMPORT_KW,
    PUBLIC_KW,
    ISOLATED_KW,
    FINAL_KW,
    FUNCTION_KW,
    TYPE_KW,
    CONST_KW,
    CLASS_KW,
    DOC_LINE_START,
]);

/// Keywords that can only start a statement.
pub(crate) const STMT_KEYWORDS: SyntaxSet = SyntaxSet::new([
    IF_KW,
    WHILE_KW,
    FOREACH_KW,
    RETURN_KW,
    BREAK_KW,
    CONTINUE_KW,
    PANIC_KW,
    LOCK_KW,
    TRANSACTION_KW,
    COMMIT_KW,
    ROLLBACK_KW,
    VAR_KW,
    FINAL_KW,
]);

/// Where statement level recovery stops skipping.
pub(crate) const STMT_RECOVERY: SyntaxSet =
    STMT_KEYWORDS.union(&SyntaxSet::new([SEMICOLON, RIGHT_BRACE, IMPORT_KW, TYPE_KW, CLASS_KW]));

/// Tokens an expression never starts with and never skips over.
pub(crate) const EXPR_RECOVERY: SyntaxSet = STMT_RECOVERY.union(&SyntaxSet::new([
    RIGHT_PAREN,
    RIGHT_BRACKET,
    RIGHT_CLOSED_RECORD,
    COMMA,
    COLON,
    EQ,
    BACKTICK,
    PUBLIC_KW,
    CONST_KW,
]));

/// Parses an identifier. An unexpected token outside `recovery` is wrapped
/// in an `ERROR` node in its place.
pub(crate) fn name(p: &mut Parser<'_>, recovery: &SyntaxSet) {
    if p.eat(NAME) {
        return;
    }
    if p.at_set(recovery) || p.at(EOF) {
        p.missing(NAME);
    } else {
        p.error_and_bump(DiagnosticCode::MissingToken, "expected identifier");
    }
}

/// A `bra`-`ket` enclosed list. `parser` returns `false` when the current
/// token cannot start an element.
pub(crate) fn delimited(
    p: &mut Parser<'_>,
    bra: SyntaxKind,
    ket: SyntaxKind,
    delim: SyntaxKind,
    unexpected_delim_message: &'static str,
    first_set: &SyntaxSet,
    mut parser: impl FnMut(&mut Parser<'_>) -> bool,
) {
    debug_assert_eq!(p.peek_kind(), bra);
    p.advance();

    while !p.at(ket) && !p.at(EOF) {
        if p.at(delim) {
            p.error_and_bump(DiagnosticCode::UnexpectedToken, unexpected_delim_message);
            continue;
        }

        if !parser(p) {
            break;
        }

        if !p.eat(delim) {
            if first_set.contains(p.peek_kind()) {
                p.expect(delim);
            } else {
                break;
            }
        }
    }

    p.expect(ket);
}

/// Consumes `public`, `isolated` and `final` in any order.
pub(crate) fn qualifiers(p: &mut Parser<'_>) {
    let mut seen = SyntaxSet::EMPTY;
    while matches!(p.peek_kind(), PUBLIC_KW | ISOLATED_KW | FINAL_KW) {
        let kind = p.peek_kind();
        if seen.contains(kind) {
            let message = format!("duplicate qualifier `{}`", p.current_text());
            p.error(DiagnosticCode::DuplicateQualifier, message);
        }
        seen = seen.with(kind);
        p.advance();
    }
}

/// `prefix:name` written without spaces around the colon.
pub(crate) fn at_qualified_name(p: &mut Parser<'_>) -> bool {
    if !p.at(NAME) {
        return false;
    }
    let end = p.current().range.end();
    let colon = p.nth_token(1);
    if colon.kind != COLON || colon.range.start() != end {
        return false;
    }
    let name = p.nth_token(2);
    name.kind == NAME && name.range.start() == colon.range.end()
}

/// `var` or a type descriptor followed by a name.
pub(crate) fn typed_binding(p: &mut Parser<'_>, recovery: &SyntaxSet) {
    if !p.eat(VAR_KW) {
        types::type_(p);
    }
    name(p, recovery);
}
