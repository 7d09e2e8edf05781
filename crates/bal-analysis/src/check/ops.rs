//! Result types of operators.

use bal_yellow::ast::{BinaryOp, UnaryOp};

use crate::env::TypeEnv;
use crate::ty::{Primitive, Ty};

/// A numeric operand, with `byte` promoted to `int`.
struct Numeric {
    primitive: Primitive,
    nullable: bool,
}

fn numeric(env: &TypeEnv<'_>, ty: &Ty) -> Option<Numeric> {
    let members = env.members(ty);
    let nullable = members.iter().any(Ty::is_nil);
    let mut primitive = None;
    for member in members.iter().filter(|member| !member.is_nil()) {
        let next = match member.as_primitive()? {
            Primitive::Byte => Primitive::Int,
            next if next.is_numeric() => next,
            _ => return None,
        };
        if primitive.is_some_and(|primitive| primitive != next) {
            return None;
        }
        primitive = Some(next);
    }
    Some(Numeric { primitive: primitive?, nullable })
}

const fn rank(primitive: Primitive) -> u8 {
    match primitive {
        Primitive::Float => 1,
        Primitive::Decimal => 2,
        _ => 0,
    }
}

fn integral(env: &TypeEnv<'_>, ty: &Ty) -> Option<Primitive> {
    env.primitive(ty).filter(|primitive| matches!(primitive, Primitive::Int | Primitive::Byte))
}

fn lift(ty: Ty, nullable: bool) -> Ty {
    if nullable { Ty::optional(ty) } else { ty }
}

/// The result of `lhs op rhs`, or `None` if the operator does not apply.
pub(super) fn binary(env: &TypeEnv<'_>, op: BinaryOp, lhs: &Ty, rhs: &Ty) -> Option<Ty> {
    if matches!(op, BinaryOp::RefEq | BinaryOp::RefNe) {
        return Some(Ty::boolean());
    }
    if env.resolve(lhs).is_unknown() || env.resolve(rhs).is_unknown() {
        return Some(fallback(op));
    }

    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            if let (Some(lhs), Some(rhs)) = (numeric(env, lhs), numeric(env, rhs)) {
                let primitive = if rank(rhs.primitive) > rank(lhs.primitive) {
                    rhs.primitive
                } else {
                    lhs.primitive
                };
                return Some(lift(Ty::primitive(primitive), lhs.nullable || rhs.nullable));
            }
            if op == BinaryOp::Add {
                for concat in [Primitive::String, Primitive::Xml] {
                    if env.primitive(lhs) == Some(concat) && env.primitive(rhs) == Some(concat) {
                        return Some(Ty::primitive(concat));
                    }
                }
            }
            None
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let comparable = match (numeric(env, lhs), numeric(env, rhs)) {
                (Some(lhs), Some(rhs)) => lhs.primitive == rhs.primitive,
                _ => {
                    let lhs = env.primitive(&env.strip_nil(lhs));
                    let rhs = env.primitive(&env.strip_nil(rhs));
                    lhs == rhs && matches!(lhs, Some(Primitive::String | Primitive::Boolean))
                }
            };
            comparable.then(Ty::boolean)
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            (env.is_assignable(lhs, rhs) || env.is_assignable(rhs, lhs)).then(Ty::boolean)
        }
        BinaryOp::And | BinaryOp::Or => {
            let boolean = Ty::boolean();
            (env.is_assignable(lhs, &boolean) && env.is_assignable(rhs, &boolean))
                .then_some(boolean)
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            let lhs = integral(env, lhs)?;
            let rhs = integral(env, rhs)?;
            let byte = match op {
                BinaryOp::BitAnd => lhs == Primitive::Byte || rhs == Primitive::Byte,
                _ => lhs == Primitive::Byte && rhs == Primitive::Byte,
            };
            Some(if byte { Ty::primitive(Primitive::Byte) } else { Ty::int() })
        }
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UnsignedShr => {
            integral(env, lhs)?;
            integral(env, rhs)?;
            Some(Ty::int())
        }
        BinaryOp::Elvis => Some(Ty::union([env.strip_nil(lhs), rhs.clone()])),
        BinaryOp::ClosedRange | BinaryOp::HalfOpenRange => {
            (integral(env, lhs).is_some() && integral(env, rhs).is_some())
                .then(|| Ty::array(Ty::int()))
        }
        BinaryOp::RefEq | BinaryOp::RefNe => Some(Ty::boolean()),
    }
}

/// The type an ill-typed `op` expression takes, so that one bad operand
/// is reported once.
pub(super) fn fallback(op: BinaryOp) -> Ty {
    match op {
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::RefEq
        | BinaryOp::RefNe
        | BinaryOp::Lt
        | BinaryOp::Gt
        | BinaryOp::Le
        | BinaryOp::Ge
        | BinaryOp::And
        | BinaryOp::Or => Ty::boolean(),
        BinaryOp::ClosedRange | BinaryOp::HalfOpenRange => Ty::array(Ty::int()),
        _ => Ty::unknown(),
    }
}

pub(super) fn unary(env: &TypeEnv<'_>, op: UnaryOp, operand: &Ty) -> Option<Ty> {
    if env.resolve(operand).is_unknown() {
        return Some(if op == UnaryOp::Not { Ty::boolean() } else { Ty::unknown() });
    }
    match op {
        UnaryOp::Neg | UnaryOp::Plus => {
            let numeric = numeric(env, operand)?;
            Some(lift(Ty::primitive(numeric.primitive), numeric.nullable))
        }
        UnaryOp::Not => {
            env.is_assignable(operand, &Ty::boolean()).then(Ty::boolean)
        }
        UnaryOp::BitNot => integral(env, operand).map(|_| Ty::int()),
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::exports::NoModules;

    fn render(op: BinaryOp, lhs: Ty, rhs: Ty) -> Option<String> {
        let types = FxHashMap::default();
        let env = TypeEnv::new(&types, &NoModules, None);
        binary(&env, op, &lhs, &rhs).map(|ty| ty.to_string())
    }

    #[test]
    fn arithmetic_widens() {
        assert_eq!(render(BinaryOp::Add, Ty::int(), Ty::int()).as_deref(), Some("int"));
        assert_eq!(render(BinaryOp::Mul, Ty::int(), Ty::float()).as_deref(), Some("float"));
        assert_eq!(
            render(BinaryOp::Sub, Ty::optional(Ty::int()), Ty::int()).as_deref(),
            Some("int?")
        );
        assert_eq!(render(BinaryOp::Add, Ty::string(), Ty::string()).as_deref(), Some("string"));
        assert_eq!(render(BinaryOp::Add, Ty::int(), Ty::string()), None);
    }

    #[test]
    fn comparisons_need_same_category() {
        assert_eq!(render(BinaryOp::Lt, Ty::int(), Ty::int()).as_deref(), Some("boolean"));
        assert_eq!(render(BinaryOp::Lt, Ty::int(), Ty::float()), None);
        assert_eq!(render(BinaryOp::Eq, Ty::int(), Ty::string()), None);
        assert_eq!(
            render(BinaryOp::Eq, Ty::optional(Ty::int()), Ty::nil()).as_deref(),
            Some("boolean")
        );
        assert_eq!(render(BinaryOp::And, Ty::boolean(), Ty::int()), None);
    }

    #[test]
    fn elvis_and_ranges() {
        assert_eq!(
            render(BinaryOp::Elvis, Ty::optional(Ty::string()), Ty::string()).as_deref(),
            Some("string")
        );
        assert_eq!(
            render(BinaryOp::HalfOpenRange, Ty::int(), Ty::int()).as_deref(),
            Some("int[]")
        );
        assert_eq!(render(BinaryOp::Add, Ty::unknown(), Ty::string()).as_deref(), Some("<unknown>"));
    }
}
