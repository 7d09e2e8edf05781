use bal_errors::DiagnosticCode;
use bal_tokenizer::LexerFlags;
use bal_yellow::SyntaxKind::{self, *};
use bal_yellow::SyntaxSet;

use super::{STMT_KEYWORDS, STMT_RECOVERY, exprs, items, typed_binding, types};
use crate::parser::Parser;

const DECL_RECOVERY: SyntaxSet = STMT_KEYWORDS.union(&SyntaxSet::new([EQ, SEMICOLON, RIGHT_BRACE]));
const FOREACH_RECOVERY: SyntaxSet = STMT_KEYWORDS.union(&SyntaxSet::new([IN_KW, LEFT_BRACE]));

pub(crate) fn block(p: &mut Parser<'_>) {
    if !p.at(LEFT_BRACE) {
        p.missing(LEFT_BRACE);
        return;
    }

    let m = p.start();
    p.advance();
    p.nested(stmt_list);
    p.expect(RIGHT_BRACE);
    m.complete(p, BLOCK);
}

fn stmt_list(p: &mut Parser<'_>) {
    while !p.at(RIGHT_BRACE) && !p.at(EOF) {
        if p.is_cancelled() || at_item_start(p) {
            break;
        }

        let before = p.position();
        stmt(p);
        if p.position() == before && !p.at(RIGHT_BRACE) && !p.at(EOF) {
            p.error_and_bump(DiagnosticCode::UnexpectedToken, "expected a statement");
        }
    }
}

/// A module level declaration inside a body means its closing brace is
/// missing.
fn at_item_start(p: &mut Parser<'_>) -> bool {
    match p.peek_kind() {
        IMPORT_KW | TYPE_KW | CLASS_KW | CONST_KW | PUBLIC_KW => true,
        FUNCTION_KW => p.nth(1) == NAME,
        _ => false,
    }
}

pub(crate) fn stmt(p: &mut Parser<'_>) {
    match p.peek_kind() {
        LEFT_BRACE => block(p),
        IF_KW => if_stmt(p),
        WHILE_KW => {
            let m = p.start();
            p.advance();
            exprs::expr(p);
            block(p);
            m.complete(p, WHILE_STMT);
        }
        FOREACH_KW => {
            let m = p.start();
            p.advance();
            typed_binding(p, &FOREACH_RECOVERY);
            p.expect(IN_KW);
            exprs::expr(p);
            block(p);
            m.complete(p, FOREACH_STMT);
        }
        RETURN_KW => {
            let m = p.start();
            p.advance();
            if !p.at(SEMICOLON) && exprs::can_start(p.peek_kind()) {
                exprs::expr(p);
            }
            p.expect(SEMICOLON);
            m.complete(p, RETURN_STMT);
        }
        BREAK_KW => keyword_stmt(p, BREAK_STMT),
        CONTINUE_KW => keyword_stmt(p, CONTINUE_STMT),
        COMMIT_KW => keyword_stmt(p, COMMIT_STMT),
        PANIC_KW => {
            let m = p.start();
            p.advance();
            exprs::expr(p);
            p.expect(SEMICOLON);
            m.complete(p, PANIC_STMT);
        }
        ROLLBACK_KW => {
            let m = p.start();
            p.advance();
            if exprs::can_start(p.peek_kind()) {
                exprs::expr(p);
            }
            p.expect(SEMICOLON);
            m.complete(p, ROLLBACK_STMT);
        }
        LOCK_KW => {
            let m = p.start();
            p.advance();
            block(p);
            m.complete(p, LOCK_STMT);
        }
        TRANSACTION_KW => {
            let m = p.start();
            p.advance();
            p.with_flags(LexerFlags::TRANSACTION, block);
            m.complete(p, TRANSACTION_STMT);
        }
        FINAL_KW | VAR_KW => local_var_decl(p),
        DOC_LINE_START => items::documentation(p),
        SEMICOLON => p.error_and_bump(DiagnosticCode::UnexpectedToken, "unexpected `;`"),
        kind if types::can_start(kind) && looks_like_decl(p) => local_var_decl(p),
        kind if exprs::can_start(kind) => expr_stmt(p),
        _ => p.error_skip(DiagnosticCode::UnexpectedToken, "expected a statement", &STMT_RECOVERY),
    }
}

fn keyword_stmt(p: &mut Parser<'_>, kind: SyntaxKind) {
    let m = p.start();
    p.advance();
    p.expect(SEMICOLON);
    m.complete(p, kind);
}

fn if_stmt(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    exprs::expr(p);
    block(p);

    if p.at(ELSE_KW) {
        let e = p.start();
        p.advance();
        if p.at(IF_KW) {
            p.nested(if_stmt);
        } else {
            block(p);
        }
        e.complete(p, ELSE_CLAUSE);
    }

    m.complete(p, IF_STMT);
}

/// Tries `type NAME` and rewinds. A declaration follows when the type
/// parses cleanly and is followed by a name, and either the type started
/// with a keyword or the name is followed by `=` or `;`.
fn looks_like_decl(p: &mut Parser<'_>) -> bool {
    let checkpoint = p.checkpoint();
    let keyword_start = p.peek_kind().is_keyword();

    types::type_(p);
    let decl = !p.has_errors_since(&checkpoint)
        && p.at(NAME)
        && (keyword_start || matches!(p.nth(1), EQ | SEMICOLON));

    p.rewind(checkpoint);
    decl
}

fn local_var_decl(p: &mut Parser<'_>) {
    let m = p.start();
    p.eat(FINAL_KW);
    typed_binding(p, &DECL_RECOVERY);
    if p.eat(EQ) {
        exprs::expr(p);
    }
    p.expect(SEMICOLON);
    m.complete(p, LOCAL_VAR_DECL);
}

/// An expression, an assignment or a compound assignment.
fn expr_stmt(p: &mut Parser<'_>) {
    let m = p.start();
    exprs::expr(p);

    let kind = match p.peek_kind() {
        EQ => {
            p.advance();
            exprs::expr(p);
            ASSIGN_STMT
        }
        kind if kind.is_compound_assign() => {
            p.advance();
            exprs::expr(p);
            COMPOUND_ASSIGN_STMT
        }
        // `>>=` and `>>>=` arrive as `>` tokens followed by `>=`.
        GT => match p.gt_run() {
            (n @ 1..=2, true) => {
                for _ in 0..=n {
                    p.advance();
                }
                exprs::expr(p);
                COMPOUND_ASSIGN_STMT
            }
            _ => EXPR_STMT,
        },
        _ => EXPR_STMT,
    };

    p.expect(SEMICOLON);
    m.complete(p, kind);
}
