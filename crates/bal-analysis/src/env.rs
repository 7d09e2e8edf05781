use bal_inputs::ModulePath;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::exports::ModuleLookup;
use crate::scope::Namespace;
use crate::ty::{Field, ObjectTy, Primitive, RecordTy, Ty, TyKind, TypeName};
use crate::Name;

/// Named type definitions are unfolded at most this many times in a row.
const MAX_UNFOLD: usize = 32;
/// Structural walks give up below this depth and assume success.
const MAX_DEPTH: usize = 64;

/// Resolves named types for assignability checks: local definitions come
/// from the unit itself, qualified ones from the imported module's exports.
#[derive(Clone, Copy)]
pub struct TypeEnv<'a> {
    local: &'a FxHashMap<Name, Ty>,
    lookup: &'a dyn ModuleLookup,
    module: Option<&'a ModulePath>,
}

/// The fields of a record type with its inclusions expanded.
#[derive(Debug, Clone)]
pub struct RecordParts {
    pub fields: Vec<Field>,
    pub rest: Option<Ty>,
}

impl RecordParts {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name.as_str() == name)
    }
}

impl<'a> TypeEnv<'a> {
    pub fn new(
        local: &'a FxHashMap<Name, Ty>,
        lookup: &'a dyn ModuleLookup,
        module: Option<&'a ModulePath>,
    ) -> Self {
        Self { local, lookup, module }
    }

    pub fn lookup_named(&self, name: &TypeName) -> Option<Ty> {
        match &name.module {
            None => self.local.get(&name.name).cloned(),
            Some(module) if self.module.is_some_and(|own| own == module) => {
                self.local.get(&name.name).cloned()
            }
            Some(module) => {
                let exports = self.lookup.exports(module)?;
                exports.get(Namespace::Type, &name.name)?.ty.clone()
            }
        }
    }

    /// Unfolds named types until something structural comes out. Cyclic or
    /// missing definitions resolve to `Unknown`.
    pub fn resolve(&self, ty: &Ty) -> Ty {
        let mut current = ty.clone();
        for _ in 0..MAX_UNFOLD {
            let TyKind::Ref(name) = current.kind() else { return current };
            match self.lookup_named(name) {
                Some(next) => current = next,
                None => return Ty::unknown(),
            }
        }
        Ty::unknown()
    }

    /// The members of a union, with optionals split into their inner type
    /// and nil.
    pub fn members(&self, ty: &Ty) -> Vec<Ty> {
        let mut out = Vec::new();
        self.collect_members(ty, &mut out, 0);
        out
    }

    fn collect_members(&self, ty: &Ty, out: &mut Vec<Ty>, depth: usize) {
        let resolved = self.resolve(ty);
        if depth > MAX_DEPTH {
            out.push(resolved);
            return;
        }
        match resolved.kind() {
            TyKind::Union(members) => {
                for member in members.members() {
                    self.collect_members(member, out, depth + 1);
                }
            }
            TyKind::Optional(inner) => {
                self.collect_members(inner, out, depth + 1);
                out.push(Ty::nil());
            }
            _ if out.contains(&resolved) => {}
            _ => out.push(resolved),
        }
    }

    pub fn strip_nil(&self, ty: &Ty) -> Ty {
        self.retain(ty, |member| !member.is_nil())
    }

    pub fn strip_error(&self, ty: &Ty) -> Ty {
        self.retain(ty, |member| !matches!(member.kind(), TyKind::Error(_)))
    }

    fn retain(&self, ty: &Ty, keep: impl Fn(&Ty) -> bool) -> Ty {
        if self.resolve(ty).is_unknown() {
            return Ty::unknown();
        }
        let members = self.members(ty);
        if members.iter().all(&keep) {
            return ty.clone();
        }
        Ty::union(members.into_iter().filter(|member| keep(member)))
    }

    pub fn admits_nil(&self, ty: &Ty) -> bool {
        self.is_assignable(&Ty::nil(), ty)
    }

    pub fn may_be_error(&self, ty: &Ty) -> bool {
        self.members(ty).iter().any(|member| match member.kind() {
            TyKind::Error(_) => true,
            TyKind::Primitive(Primitive::Any) => false,
            TyKind::Intersection(parts) => parts.iter().any(|part| self.may_be_error(part)),
            _ => false,
        })
    }

    /// `Some(p)` when every member of `ty` is the primitive `p`.
    pub fn primitive(&self, ty: &Ty) -> Option<Primitive> {
        let members = self.members(ty);
        let first = members.first()?.as_primitive()?;
        members.iter().all(|member| member.as_primitive() == Some(first)).then_some(first)
    }

    pub fn record_parts(&self, ty: &Ty) -> Option<RecordParts> {
        self.record_parts_at(ty, 0)
    }

    fn record_parts_at(&self, ty: &Ty, depth: usize) -> Option<RecordParts> {
        if depth > MAX_DEPTH {
            return None;
        }
        match self.resolve(ty).kind() {
            TyKind::Record(record) => Some(self.expand_record(record, depth)),
            TyKind::Intersection(parts) => {
                parts.iter().find_map(|part| self.record_parts_at(part, depth + 1))
            }
            _ => None,
        }
    }

    fn expand_record(&self, record: &RecordTy, depth: usize) -> RecordParts {
        let mut fields = record.fields.clone();
        for include in &record.includes {
            let Some(included) = self.record_parts_at(include, depth + 1) else { continue };
            for field in included.fields {
                if !fields.iter().any(|own| own.name == field.name) {
                    fields.push(field);
                }
            }
        }
        RecordParts { fields, rest: record.rest_ty() }
    }

    pub fn object_parts(&self, ty: &Ty) -> Option<ObjectTy> {
        self.object_parts_at(ty, 0)
    }

    fn object_parts_at(&self, ty: &Ty, depth: usize) -> Option<ObjectTy> {
        if depth > MAX_DEPTH {
            return None;
        }
        match self.resolve(ty).kind() {
            TyKind::Object(object) => {
                let mut parts = ObjectTy {
                    fields: object.fields.clone(),
                    methods: object.methods.clone(),
                    includes: Vec::new(),
                };
                for include in &object.includes {
                    let Some(included) = self.object_parts_at(include, depth + 1) else { continue };
                    for field in included.fields {
                        if parts.field(field.name.as_str()).is_none() {
                            parts.fields.push(field);
                        }
                    }
                    for method in included.methods {
                        if parts.method(method.name.as_str()).is_none() {
                            parts.methods.push(method);
                        }
                    }
                }
                Some(parts)
            }
            TyKind::Intersection(parts) => {
                parts.iter().find_map(|part| self.object_parts_at(part, depth + 1))
            }
            _ => None,
        }
    }

    pub fn is_assignable(&self, source: &Ty, target: &Ty) -> bool {
        Assignability { env: *self, assumed: FxHashSet::default() }.check(source, target, 0)
    }

    pub fn is_anydata(&self, ty: &Ty) -> bool {
        self.is_pure(ty, Purity::Anydata, 0)
    }

    pub fn is_json(&self, ty: &Ty) -> bool {
        self.is_pure(ty, Purity::Json, 0)
    }

    fn is_pure(&self, ty: &Ty, purity: Purity, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return true;
        }
        let next = depth + 1;
        match self.resolve(ty).kind() {
            TyKind::Unknown => true,
            TyKind::Primitive(primitive) => match purity {
                Purity::Anydata => !matches!(
                    primitive,
                    Primitive::Any | Primitive::Readonly | Primitive::Typedesc
                ),
                Purity::Json => matches!(
                    primitive,
                    Primitive::Nil
                        | Primitive::Boolean
                        | Primitive::Int
                        | Primitive::Byte
                        | Primitive::Float
                        | Primitive::Decimal
                        | Primitive::String
                        | Primitive::Json
                        | Primitive::Never
                ),
            },
            TyKind::Record(_) => {
                let Some(parts) = self.record_parts(ty) else { return false };
                parts.fields.iter().all(|field| self.is_pure(&field.ty, purity, next))
                    && parts.rest.as_ref().is_none_or(|rest| self.is_pure(rest, purity, next))
            }
            TyKind::Array(element) | TyKind::Map(element) => self.is_pure(element, purity, next),
            TyKind::Table(row) => purity == Purity::Anydata && self.is_pure(row, purity, next),
            TyKind::Union(members) => {
                members.members().iter().all(|member| self.is_pure(member, purity, next))
            }
            TyKind::Optional(inner) => self.is_pure(inner, purity, next),
            TyKind::Intersection(parts) => parts.iter().any(|part| self.is_pure(part, purity, next)),
            TyKind::Function(_) | TyKind::Object(_) | TyKind::Error(_) | TyKind::Ref(_) => false,
        }
    }

    /// Whether every value of `ty` is immutable.
    pub fn is_readonly(&self, ty: &Ty) -> bool {
        self.is_readonly_at(ty, 0)
    }

    fn is_readonly_at(&self, ty: &Ty, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return true;
        }
        match self.resolve(ty).kind() {
            TyKind::Unknown | TyKind::Error(_) => true,
            TyKind::Primitive(primitive) => {
                !matches!(primitive, Primitive::Any | Primitive::Anydata | Primitive::Json | Primitive::Xml)
            }
            TyKind::Union(members) => {
                members.members().iter().all(|member| self.is_readonly_at(member, depth + 1))
            }
            TyKind::Optional(inner) => self.is_readonly_at(inner, depth + 1),
            TyKind::Intersection(parts) => {
                parts.iter().any(|part| self.is_readonly_at(part, depth + 1))
            }
            _ => false,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Purity {
    Anydata,
    Json,
}

/// One assignability query. Pairs involving named types are assumed to hold
/// while they are being checked, so recursive types compare coinductively.
struct Assignability<'a> {
    env: TypeEnv<'a>,
    assumed: FxHashSet<(Ty, Ty)>,
}

impl Assignability<'_> {
    fn check(&mut self, source: &Ty, target: &Ty, depth: usize) -> bool {
        if source == target || depth > MAX_DEPTH {
            return true;
        }
        let next = depth + 1;

        if matches!(source.kind(), TyKind::Ref(_)) || matches!(target.kind(), TyKind::Ref(_)) {
            if !self.assumed.insert((source.clone(), target.clone())) {
                return true;
            }
            let (source, target) = (self.env.resolve(source), self.env.resolve(target));
            return self.check(&source, &target, next);
        }

        match (source.kind(), target.kind()) {
            (TyKind::Unknown, _) | (_, TyKind::Unknown) => return true,
            (TyKind::Primitive(Primitive::Never), _) => return true,
            (TyKind::Union(members), _) => {
                return members.members().iter().all(|member| self.check(member, target, next));
            }
            (TyKind::Optional(inner), _) => {
                return self.check(inner, target, next) && self.check(&Ty::nil(), target, next);
            }
            (TyKind::Intersection(parts), _) => {
                return parts.iter().any(|part| self.check(part, target, next));
            }
            (_, TyKind::Union(members)) => {
                return members.members().iter().any(|member| self.check(source, member, next));
            }
            (_, TyKind::Optional(inner)) => {
                return source.is_nil() || self.check(source, inner, next);
            }
            (_, TyKind::Intersection(parts)) => {
                return parts.iter().all(|part| self.check(source, part, next));
            }
            _ => {}
        }

        match (source.kind(), target.kind()) {
            (_, TyKind::Primitive(Primitive::Any)) => !matches!(source.kind(), TyKind::Error(_)),
            (_, TyKind::Primitive(Primitive::Anydata)) => self.env.is_anydata(source),
            (_, TyKind::Primitive(Primitive::Json)) => self.env.is_json(source),
            (_, TyKind::Primitive(Primitive::Readonly)) => self.env.is_readonly(source),
            (TyKind::Primitive(from), TyKind::Primitive(to)) => {
                from == to || (*from == Primitive::Byte && *to == Primitive::Int)
            }
            (TyKind::Record(_), TyKind::Record(_)) => self.record(source, target, next),
            (TyKind::Record(_), TyKind::Map(value)) => {
                let Some(parts) = self.env.record_parts(source) else { return false };
                parts.fields.iter().all(|field| self.check(&field.ty, value, next))
                    && parts.rest.as_ref().is_none_or(|rest| self.check(rest, value, next))
            }
            (TyKind::Array(from), TyKind::Array(to))
            | (TyKind::Map(from), TyKind::Map(to))
            | (TyKind::Table(from), TyKind::Table(to)) => self.check(from, to, next),
            (TyKind::Function(from), TyKind::Function(to)) => {
                from.params.len() == to.params.len()
                    && from.rest.is_some() == to.rest.is_some()
                    && from
                        .params
                        .iter()
                        .zip(&to.params)
                        .all(|(from, to)| self.check(&to.ty, &from.ty, next))
                    && match (&from.rest, &to.rest) {
                        (Some(from), Some(to)) => self.check(to, from, next),
                        _ => true,
                    }
                    && self.check(&from.ret, &to.ret, next)
            }
            (TyKind::Object(_), TyKind::Object(_)) => self.object(source, target, next),
            (TyKind::Error(from), TyKind::Error(to)) => match (from, to) {
                (_, None) => true,
                (None, Some(_)) => false,
                (Some(from), Some(to)) => self.check(from, to, next),
            },
            _ => false,
        }
    }

    fn record(&mut self, source: &Ty, target: &Ty, depth: usize) -> bool {
        let (Some(from), Some(to)) = (self.env.record_parts(source), self.env.record_parts(target))
        else {
            return false;
        };

        for wanted in &to.fields {
            match from.field(wanted.name.as_str()) {
                Some(field) => {
                    if field.optional && !wanted.optional {
                        return false;
                    }
                    if !self.check(&field.ty, &wanted.ty, depth) {
                        return false;
                    }
                }
                None if !wanted.optional => return false,
                None => {
                    // The source may still carry the field through its rest type.
                    if let Some(rest) = &from.rest
                        && !self.check(rest, &wanted.ty, depth)
                    {
                        return false;
                    }
                }
            }
        }

        for extra in from.fields.iter().filter(|field| to.field(field.name.as_str()).is_none()) {
            match &to.rest {
                Some(rest) if self.check(&extra.ty, rest, depth) => {}
                _ => return false,
            }
        }

        match (&from.rest, &to.rest) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(from), Some(to)) => self.check(from, to, depth),
        }
    }

    fn object(&mut self, source: &Ty, target: &Ty, depth: usize) -> bool {
        let (Some(from), Some(to)) = (self.env.object_parts(source), self.env.object_parts(target))
        else {
            return false;
        };
        let fields = to.fields.iter().all(|wanted| {
            from.field(wanted.name.as_str()).is_some_and(|field| self.check(&field.ty, &wanted.ty, depth))
        });
        fields
            && to.methods.iter().all(|wanted| {
                from.method(wanted.name.as_str()).is_some_and(|method| {
                    let (from, to) = (
                        Ty::new(TyKind::Function(method.ty.clone())),
                        Ty::new(TyKind::Function(wanted.ty.clone())),
                    );
                    self.check(&from, &to, depth)
                })
            })
    }
}

impl Ty {
    pub fn is_assignable_to(&self, target: &Self, env: &TypeEnv<'_>) -> bool {
        env.is_assignable(self, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::NoModules;

    fn record(closed: bool, fields: &[(&str, Ty)]) -> Ty {
        Ty::new(TyKind::Record(RecordTy {
            fields: fields.iter().map(|(name, ty)| Field::new((*name).into(), ty.clone())).collect(),
            rest: None,
            closed,
            includes: Vec::new(),
        }))
    }

    #[test]
    fn open_record_width_subtyping() {
        let types = FxHashMap::default();
        let env = TypeEnv::new(&types, &NoModules, None);
        let person = record(false, &[("name", Ty::string())]);

        let employee = record(false, &[("name", Ty::string()), ("id", Ty::int())]);
        let literal = record(true, &[("name", Ty::string()), ("id", Ty::int())]);
        let nameless = record(true, &[("id", Ty::int())]);
        let wrong = record(true, &[("name", Ty::int())]);

        assert!(employee.is_assignable_to(&person, &env));
        assert!(literal.is_assignable_to(&person, &env));
        assert!(!nameless.is_assignable_to(&person, &env));
        assert!(!wrong.is_assignable_to(&person, &env));

        let closed = record(true, &[("name", Ty::string())]);
        assert!(!literal.is_assignable_to(&closed, &env));
        assert!(!employee.is_assignable_to(&closed, &env));
    }

    #[test]
    fn unions_and_optionals() {
        let types = FxHashMap::default();
        let env = TypeEnv::new(&types, &NoModules, None);
        let int_or_string = Ty::union([Ty::int(), Ty::string()]);

        assert!(Ty::int().is_assignable_to(&int_or_string, &env));
        assert!(Ty::string().is_assignable_to(&int_or_string, &env));
        assert!(!Ty::boolean().is_assignable_to(&int_or_string, &env));
        assert!(!int_or_string.is_assignable_to(&Ty::int(), &env));

        let optional = Ty::optional(Ty::int());
        assert!(Ty::nil().is_assignable_to(&optional, &env));
        assert!(optional.is_assignable_to(&Ty::union([Ty::int(), Ty::nil()]), &env));
        assert!(Ty::primitive(Primitive::Byte).is_assignable_to(&Ty::int(), &env));
        assert!(!Ty::int().is_assignable_to(&Ty::float(), &env));
        assert!(Ty::unknown().is_assignable_to(&Ty::int(), &env));
        assert!(Ty::never().is_assignable_to(&Ty::string(), &env));
    }

    #[test]
    fn any_excludes_errors() {
        let types = FxHashMap::default();
        let env = TypeEnv::new(&types, &NoModules, None);
        let any = Ty::primitive(Primitive::Any);

        assert!(Ty::map(Ty::int()).is_assignable_to(&any, &env));
        assert!(!Ty::error().is_assignable_to(&any, &env));
        assert!(!Ty::union([Ty::int(), Ty::error()]).is_assignable_to(&any, &env));
    }

    #[test]
    fn recursive_named_types() {
        let list = Ty::named(TypeName::new(None, "List".into()));
        let node = Ty::new(TyKind::Record(RecordTy {
            fields: vec![
                Field::new("value".into(), Ty::int()),
                Field::new("next".into(), Ty::optional(list.clone())),
            ],
            rest: None,
            closed: true,
            includes: Vec::new(),
        }));
        let mut types = FxHashMap::default();
        types.insert(Name::from("List"), node.clone());
        let env = TypeEnv::new(&types, &NoModules, None);

        assert!(node.is_assignable_to(&list, &env));
        assert!(list.is_assignable_to(&Ty::primitive(Primitive::Anydata), &env));
        assert!(!list.is_assignable_to(&Ty::int(), &env));
    }

    #[test]
    fn cyclic_alias_resolves_to_unknown() {
        let mut types = FxHashMap::default();
        types.insert(Name::from("A"), Ty::named(TypeName::new(None, "B".into())));
        types.insert(Name::from("B"), Ty::named(TypeName::new(None, "A".into())));
        let env = TypeEnv::new(&types, &NoModules, None);

        assert!(env.resolve(&Ty::named(TypeName::new(None, "A".into()))).is_unknown());
    }

    #[test]
    fn record_to_map() {
        let types = FxHashMap::default();
        let env = TypeEnv::new(&types, &NoModules, None);
        let point = record(true, &[("x", Ty::int()), ("y", Ty::int())]);

        assert!(point.is_assignable_to(&Ty::map(Ty::int()), &env));
        assert!(!point.is_assignable_to(&Ty::map(Ty::string()), &env));
        assert!(!record(false, &[("x", Ty::int())]).is_assignable_to(&Ty::map(Ty::int()), &env));
    }
}
