use bal_errors::DiagnosticCode;
use bal_tokenizer::LexerFlags;
use bal_yellow::SyntaxKind::{self, *};
use bal_yellow::SyntaxSet;

use super::{EXPR_RECOVERY, at_qualified_name, delimited, items, name, stmts, templates, typed_binding, types};
use crate::parser::{CompletedMarker, Parser};

pub(crate) const EXPR_FIRST: SyntaxSet = SyntaxSet::new([
    DECIMAL_INT,
    HEX_INT,
    DECIMAL_FLOAT,
    HEX_FLOAT,
    STRING_LITERAL,
    TRUE_KW,
    FALSE_KW,
    NULL_KW,
    NAME,
    SELF_KW,
    LEFT_PAREN,
    LEFT_BRACKET,
    LEFT_BRACE,
    NEW_KW,
    ERROR_KW,
    FUNCTION_KW,
    ISOLATED_KW,
    STRING_KW,
    XML_KW,
    BACKTICK,
    FROM_KW,
    MINUS,
    PLUS,
    BANG,
    TILDE,
    TYPEOF_KW,
    CHECK_KW,
    CHECKPANIC_KW,
    TRAP_KW,
    LT,
]);

const MAPPING_FIRST: SyntaxSet = SyntaxSet::new([NAME, STRING_LITERAL]);
const CLAUSE_RECOVERY: SyntaxSet =
    EXPR_RECOVERY.union(&SyntaxSet::new([IN_KW, WHERE_KW, LET_KW, LIMIT_KW, SELECT_KW]));

pub(crate) fn can_start(kind: SyntaxKind) -> bool {
    EXPR_FIRST.contains(kind)
}

pub(crate) fn expr(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    p.nested(conditional).flatten()
}

fn conditional(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let lhs = binary(p, 2)?;
    if !p.at(QUESTION) {
        return Some(lhs);
    }

    let m = lhs.precede(p);
    p.advance();
    expr(p);
    p.expect(COLON);
    expr(p);
    Some(m.complete(p, CONDITIONAL_EXPR))
}

/// Binding power of the infix operator at the current token and the number
/// of tokens it spans.
fn infix_op(p: &mut Parser<'_>) -> Option<(u8, usize)> {
    Some(match p.peek_kind() {
        ELVIS => (2, 1),
        PIPE2 => (3, 1),
        AMP2 => (4, 1),
        PIPE => (5, 1),
        CARET => (6, 1),
        AMP => (7, 1),
        EQ2 | NEQ | EQ3 | NEQ2 => (8, 1),
        LT | LT_EQ | GT_EQ | IS_KW => (9, 1),
        GT => match p.gt_run() {
            (1, false) => (9, 1),
            (n @ 2..=3, false) => (11, n),
            // `>>=` and `>>>=` end the expression.
            _ => return None,
        },
        ELLIPSIS | DOUBLE_DOT_LT => (10, 1),
        SHL => (11, 1),
        PLUS | MINUS => (12, 1),
        STAR | SLASH | PERCENT => (13, 1),
        _ => return None,
    })
}

fn binary(p: &mut Parser<'_>, min_level: u8) -> Option<CompletedMarker> {
    let mut lhs = unary(p)?;

    let mut levels = 0;
    while let Some((level, tokens)) = infix_op(p) {
        if level < min_level || !p.deepen(&mut levels) {
            break;
        }

        let m = lhs.precede(p);
        if p.eat(IS_KW) {
            types::type_(p);
            lhs = m.complete(p, TYPE_TEST_EXPR);
            continue;
        }

        let right_assoc = p.at(ELVIS);
        for _ in 0..tokens {
            p.advance();
        }
        let next = if right_assoc { level } else { level + 1 };
        p.nested(|p| binary(p, next));
        lhs = m.complete(p, BINARY_EXPR);
    }
    p.unwind(levels);

    Some(lhs)
}

fn unary(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let kind = match p.peek_kind() {
        MINUS | PLUS | BANG | TILDE => UNARY_EXPR,
        TYPEOF_KW => TYPEOF_EXPR,
        CHECK_KW | CHECKPANIC_KW => CHECK_EXPR,
        TRAP_KW => TRAP_EXPR,
        LT => {
            let m = p.start();
            p.advance();
            types::type_(p);
            p.expect(GT);
            p.nested(unary);
            return Some(m.complete(p, CAST_EXPR));
        }
        _ => return postfix(p),
    };

    let m = p.start();
    p.advance();
    p.nested(unary);
    Some(m.complete(p, kind))
}

fn postfix(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let mut lhs = primary(p)?;

    let mut levels = 0;
    loop {
        let at_postfix =
            matches!(p.peek_kind(), LEFT_PAREN | DOT | OPTIONAL_CHAINING | LEFT_BRACKET);
        if !at_postfix || !p.deepen(&mut levels) {
            break;
        }
        lhs = match p.peek_kind() {
            LEFT_PAREN => {
                let m = lhs.precede(p);
                arg_list(p);
                m.complete(p, CALL_EXPR)
            }
            DOT => {
                let m = lhs.precede(p);
                p.advance();
                if p.at(NAME) && p.nth(1) == LEFT_PAREN {
                    p.advance();
                    arg_list(p);
                    m.complete(p, METHOD_CALL_EXPR)
                } else {
                    name(p, &EXPR_RECOVERY);
                    m.complete(p, FIELD_ACCESS_EXPR)
                }
            }
            OPTIONAL_CHAINING => {
                let m = lhs.precede(p);
                p.advance();
                name(p, &EXPR_RECOVERY);
                m.complete(p, OPTIONAL_FIELD_ACCESS_EXPR)
            }
            LEFT_BRACKET => {
                let m = lhs.precede(p);
                p.advance();
                expr(p);
                p.expect(RIGHT_BRACKET);
                m.complete(p, MEMBER_ACCESS_EXPR)
            }
            _ => unreachable!(),
        };
    }
    p.unwind(levels);

    Some(lhs)
}

pub(crate) fn arg_list(p: &mut Parser<'_>) {
    let m = p.start();
    delimited(p, LEFT_PAREN, RIGHT_PAREN, COMMA, "expected argument", &EXPR_FIRST, element);
    m.complete(p, ARG_LIST);
}

/// One element of an argument or list constructor.
fn element(p: &mut Parser<'_>) -> bool {
    if can_start(p.peek_kind()) {
        expr(p);
        return true;
    }
    if p.at_set(&EXPR_RECOVERY) || p.at(EOF) {
        return false;
    }
    p.error_and_bump(DiagnosticCode::ExpectedExpression, "expected expression");
    true
}

fn primary(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let kind = p.peek_kind();
    if kind.is_literal() {
        let m = p.start();
        p.advance();
        return Some(m.complete(p, LITERAL));
    }

    let m = p.start();
    let kind = match kind {
        NAME if p.nth(1) == FAT_ARROW => {
            let params = p.start();
            p.advance();
            params.complete(p, INFER_PARAM_LIST);
            p.advance();
            expr(p);
            ARROW_FUNCTION
        }
        NAME if at_qualified_name(p) => {
            p.advance();
            p.advance();
            p.advance();
            QUALIFIED_NAME_REF
        }
        NAME => {
            p.advance();
            NAME_REF
        }
        SELF_KW => {
            p.advance();
            SELF_REF
        }
        LEFT_PAREN if at_arrow_params(p) => {
            let params = p.start();
            p.advance();
            while p.eat(NAME) {
                if !p.eat(COMMA) {
                    break;
                }
            }
            p.expect(RIGHT_PAREN);
            params.complete(p, INFER_PARAM_LIST);
            p.expect(FAT_ARROW);
            expr(p);
            ARROW_FUNCTION
        }
        LEFT_PAREN if p.nth(1) == RIGHT_PAREN => {
            p.advance();
            p.advance();
            NIL_LITERAL
        }
        LEFT_PAREN => {
            p.advance();
            expr(p);
            p.expect(RIGHT_PAREN);
            PAREN_EXPR
        }
        LEFT_BRACKET => {
            delimited(
                p,
                LEFT_BRACKET,
                RIGHT_BRACKET,
                COMMA,
                "expected expression",
                &EXPR_FIRST,
                element,
            );
            LIST_CONSTRUCTOR
        }
        LEFT_BRACE => {
            delimited(
                p,
                LEFT_BRACE,
                RIGHT_BRACE,
                COMMA,
                "expected field",
                &MAPPING_FIRST,
                mapping_field,
            );
            MAPPING_CONSTRUCTOR
        }
        NEW_KW => {
            p.advance();
            if types::can_start(p.peek_kind()) && !p.at(LEFT_PAREN) {
                types::type_(p);
            }
            if p.at(LEFT_PAREN) {
                arg_list(p);
            }
            NEW_EXPR
        }
        ERROR_KW => {
            p.advance();
            if p.at(LEFT_PAREN) {
                arg_list(p);
            } else {
                p.missing(LEFT_PAREN);
            }
            ERROR_CONSTRUCTOR
        }
        FUNCTION_KW | ISOLATED_KW => {
            p.eat(ISOLATED_KW);
            p.expect(FUNCTION_KW);
            items::signature(p);
            stmts::block(p);
            ANON_FUNCTION
        }
        BACKTICK => {
            m.abandon(p);
            return Some(templates::string_template(p));
        }
        STRING_KW if p.nth(1) == BACKTICK => {
            m.abandon(p);
            return Some(templates::string_template(p));
        }
        XML_KW => {
            m.abandon(p);
            return Some(templates::xml_template(p));
        }
        FROM_KW => {
            p.with_flags(LexerFlags::QUERY, query);
            QUERY_EXPR
        }
        _ => {
            m.abandon(p);
            if p.at_set(&EXPR_RECOVERY) || p.at(EOF) {
                p.error(DiagnosticCode::ExpectedExpression, "expected expression");
            } else {
                p.error_and_bump(DiagnosticCode::ExpectedExpression, "expected expression");
            }
            return None;
        }
    };

    Some(m.complete(p, kind))
}

/// `(a, b) =>` or `() =>`.
fn at_arrow_params(p: &mut Parser<'_>) -> bool {
    let mut n = 1;
    while p.nth(n) == NAME {
        n += 1;
        if p.nth(n) != COMMA {
            break;
        }
        n += 1;
    }
    p.nth(n) == RIGHT_PAREN && p.nth(n + 1) == FAT_ARROW
}

fn mapping_field(p: &mut Parser<'_>) -> bool {
    if !p.at_set(&MAPPING_FIRST) {
        if p.at_set(&EXPR_RECOVERY) || p.at(EOF) {
            return false;
        }
        p.error_and_bump(DiagnosticCode::UnexpectedToken, "expected field name");
        return true;
    }

    let m = p.start();
    let shorthand = p.at(NAME) && matches!(p.nth(1), COMMA | RIGHT_BRACE);
    p.advance();
    if !shorthand {
        p.expect(COLON);
        expr(p);
    }
    m.complete(p, MAPPING_FIELD);
    true
}

/// `from T x in e (from ... | let ... | where ...)* (limit e)? select e`,
/// parsed with the query keywords enabled.
fn query(p: &mut Parser<'_>) {
    from_clause(p);

    loop {
        match p.peek_kind() {
            FROM_KW => from_clause(p),
            LET_KW => {
                let m = p.start();
                p.advance();
                typed_binding(p, &CLAUSE_RECOVERY);
                p.expect(EQ);
                expr(p);
                m.complete(p, LET_CLAUSE);
            }
            WHERE_KW => clause(p, WHERE_CLAUSE),
            LIMIT_KW => clause(p, LIMIT_CLAUSE),
            SELECT_KW => {
                clause(p, SELECT_CLAUSE);
                break;
            }
            _ => {
                p.missing(SELECT_KW);
                break;
            }
        }
    }
}

fn from_clause(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    typed_binding(p, &CLAUSE_RECOVERY);
    p.expect(IN_KW);
    expr(p);
    m.complete(p, FROM_CLAUSE);
}

fn clause(p: &mut Parser<'_>, kind: SyntaxKind) {
    let m = p.start();
    p.advance();
    expr(p);
    m.complete(p, kind);
}
