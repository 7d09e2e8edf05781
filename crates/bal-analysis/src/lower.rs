//! Lowering of type descriptors to [`Ty`].

use bal_yellow::ast::{self, HasName as _, HasQualifiers as _, HasSignature};

use crate::Name;
use crate::ty::{
    Field, FunctionTy, Method, ObjectTy, ParamTy, Primitive, RecordTy, Ty, TyKind, TypeName,
};

/// Decides what a type name refers to.
pub(crate) trait TypeScope {
    fn resolve_type(&mut self, ty: &ast::TypeRef) -> Option<TypeName>;
}

/// Missing types lower to `Unknown`.
pub(crate) fn lower_opt(scope: &mut dyn TypeScope, ty: Option<ast::Type>) -> Ty {
    match ty {
        Some(ty) => lower_type(scope, &ty),
        None => Ty::unknown(),
    }
}

pub(crate) fn lower_type(scope: &mut dyn TypeScope, ty: &ast::Type) -> Ty {
    match ty {
        ast::Type::Builtin(builtin) => builtin
            .keyword()
            .and_then(Primitive::from_keyword)
            .map_or_else(Ty::unknown, Ty::primitive),
        ast::Type::Nil(_) => Ty::nil(),
        ast::Type::Ref(type_ref) => match scope.resolve_type(type_ref) {
            Some(name) => Ty::named(name),
            None => Ty::unknown(),
        },
        ast::Type::Optional(optional) => Ty::optional(lower_opt(scope, optional.inner())),
        ast::Type::Array(array) => Ty::array(lower_opt(scope, array.element())),
        ast::Type::Map(map) => Ty::map(lower_opt(scope, map.value())),
        ast::Type::Table(table) => Ty::new(TyKind::Table(lower_opt(scope, table.row()))),
        ast::Type::Error(error) => {
            let detail = error.detail().map(|detail| lower_type(scope, &detail));
            Ty::new(TyKind::Error(detail))
        }
        ast::Type::Record(record) => Ty::new(TyKind::Record(lower_record(scope, record))),
        ast::Type::Object(object) => {
            Ty::new(TyKind::Object(lower_members(scope, object.members())))
        }
        ast::Type::Function(function) => Ty::new(TyKind::Function(signature(scope, function))),
        ast::Type::Union(union) => {
            Ty::union(union.members().iter().map(|member| lower_type(scope, member)))
        }
        ast::Type::Intersection(intersection) => {
            let mut parts: Vec<Ty> =
                intersection.members().iter().map(|member| lower_type(scope, member)).collect();
            match parts.len() {
                0 => Ty::unknown(),
                1 => parts.swap_remove(0),
                _ => Ty::new(TyKind::Intersection(parts)),
            }
        }
        ast::Type::Paren(paren) => lower_opt(scope, paren.inner()),
    }
}

fn lower_record(scope: &mut dyn TypeScope, record: &ast::RecordType) -> RecordTy {
    let mut fields = Vec::new();
    for field in record.fields() {
        let ty = lower_opt(scope, field.ty());
        let Some(name) = field.name().as_ref().and_then(Name::from_token) else { continue };
        fields.push(Field {
            name,
            ty,
            optional: field.is_optional(),
            readonly: field.is_readonly(),
            has_default: field.default_value().is_some(),
        });
    }
    RecordTy {
        fields,
        rest: record.rest().map(|rest| lower_opt(scope, rest.ty())),
        closed: record.is_closed(),
        includes: record.inclusions().map(|include| lower_opt(scope, include.ty())).collect(),
    }
}

/// The object type of a class body or object type descriptor. `init` is
/// not a method of the resulting type.
pub(crate) fn lower_members(
    scope: &mut dyn TypeScope,
    members: impl IntoIterator<Item = ast::ClassMember>,
) -> ObjectTy {
    let mut object = ObjectTy::default();
    for member in members {
        match member {
            ast::ClassMember::Field(field) => {
                let ty = lower_opt(scope, field.ty());
                let Some(name) = field.name().as_ref().and_then(Name::from_token) else { continue };
                object.fields.push(Field {
                    readonly: field.is_final(),
                    has_default: field.initializer().is_some(),
                    ..Field::new(name, ty)
                });
            }
            ast::ClassMember::Method(method) => {
                let ty = signature(scope, &method);
                let Some(name) = method.name().as_ref().and_then(Name::from_token) else { continue };
                if name.as_str() != "init" {
                    object.methods.push(Method { name, ty });
                }
            }
            ast::ClassMember::Inclusion(include) => {
                object.includes.push(lower_opt(scope, include.ty()));
            }
        }
    }
    object
}

/// A function signature. A missing `returns` clause means nil.
pub(crate) fn signature(scope: &mut dyn TypeScope, function: &impl HasSignature) -> FunctionTy {
    let mut params = Vec::new();
    let mut rest = None;
    if let Some(list) = function.param_list() {
        for param in list.params() {
            let ty = lower_opt(scope, param.ty());
            params.push(ParamTy { ty, has_default: param.default_value().is_some() });
        }
        rest = list.rest_param().map(|rest| lower_opt(scope, rest.ty()));
    }
    let ret = match function.return_type() {
        Some(ret) => lower_opt(scope, ret.ty()),
        None => Ty::nil(),
    };
    FunctionTy { params, rest, ret }
}

#[cfg(test)]
mod tests {
    use bal_yellow::ast::AstNode as _;

    use super::*;

    /// Resolves every name to itself.
    struct Verbatim;

    impl TypeScope for Verbatim {
        fn resolve_type(&mut self, ty: &ast::TypeRef) -> Option<TypeName> {
            let name = ty.name().as_ref().and_then(Name::from_token)?;
            Some(TypeName::new(None, name))
        }
    }

    fn lower_alias(text: &str) -> String {
        let parse = bal_parse::parse(text);
        let ty = parse
            .syntax_node()
            .descendants()
            .find_map(ast::TypeDef::cast)
            .and_then(|def| def.ty())
            .expect("a type definition");
        lower_type(&mut Verbatim, &ty).to_string()
    }

    #[test]
    fn lowers_type_descriptors() {
        assert_eq!(lower_alias("type T int|string?;"), "int|string?");
        assert_eq!(lower_alias("type T map<int[]>;"), "map<int[]>");
        assert_eq!(lower_alias("type T (int|string)[];"), "(int|string)[]");
        assert_eq!(lower_alias("type T error<Detail>;"), "error<Detail>");
        assert_eq!(
            lower_alias("type T function (int, string...) returns boolean;"),
            "function (int, string...) returns boolean"
        );
        assert_eq!(
            lower_alias("type T record {| string name; int age?; *Base; |};"),
            "record {| *Base; string name; int age?; |}"
        );
        assert_eq!(lower_alias("type T Point & readonly;"), "Point&readonly");
    }
}
