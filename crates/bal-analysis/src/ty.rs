//! Type descriptors. Types are immutable and compared structurally; named
//! types stay as [`TyKind::Ref`] until a [`TypeEnv`](crate::TypeEnv)
//! resolves them.

use std::fmt;
use std::hash::{Hash, Hasher};

use bal_inputs::ModulePath;
use bal_yellow::SyntaxKind;
use triomphe::Arc;

use crate::Name;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ty(Arc<TyKind>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TyKind {
    Primitive(Primitive),
    Record(RecordTy),
    Array(Ty),
    Map(Ty),
    Table(Ty),
    Union(UnionTy),
    Intersection(Vec<Ty>),
    Function(FunctionTy),
    Object(ObjectTy),
    Error(Option<Ty>),
    Optional(Ty),
    Ref(TypeName),
    /// The type of anything that failed to check. Compatible with every
    /// type in both directions.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Nil,
    Boolean,
    Int,
    Byte,
    Float,
    Decimal,
    String,
    Xml,
    Json,
    Any,
    Anydata,
    Never,
    Readonly,
    Typedesc,
}

impl Primitive {
    pub fn from_keyword(kind: SyntaxKind) -> Option<Self> {
        Some(match kind {
            SyntaxKind::INT_KW => Self::Int,
            SyntaxKind::BYTE_KW => Self::Byte,
            SyntaxKind::FLOAT_KW => Self::Float,
            SyntaxKind::DECIMAL_KW => Self::Decimal,
            SyntaxKind::BOOLEAN_KW => Self::Boolean,
            SyntaxKind::STRING_KW => Self::String,
            SyntaxKind::JSON_KW => Self::Json,
            SyntaxKind::XML_KW => Self::Xml,
            SyntaxKind::ANY_KW => Self::Any,
            SyntaxKind::ANYDATA_KW => Self::Anydata,
            SyntaxKind::NEVER_KW => Self::Never,
            SyntaxKind::READONLY_KW => Self::Readonly,
            SyntaxKind::TYPEDESC_KW => Self::Typedesc,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nil => "()",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Byte => "byte",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Any => "any",
            Self::Anydata => "anydata",
            Self::Never => "never",
            Self::Readonly => "readonly",
            Self::Typedesc => "typedesc",
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Byte | Self::Float | Self::Decimal)
    }
}

/// Union members in source order. Equality and hashing ignore the order.
#[derive(Debug, Clone)]
pub struct UnionTy(Vec<Ty>);

impl UnionTy {
    pub fn members(&self) -> &[Ty] {
        &self.0
    }
}

impl PartialEq for UnionTy {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|member| other.0.contains(member))
    }
}

impl Eq for UnionTy {}

impl Hash for UnionTy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Members are deduplicated, so equal unions have equal lengths.
        self.0.len().hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: Name,
    pub ty: Ty,
    pub optional: bool,
    pub readonly: bool,
    pub has_default: bool,
}

impl Field {
    pub fn new(name: Name, ty: Ty) -> Self {
        Self { name, ty, optional: false, readonly: false, has_default: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RecordTy {
    pub fields: Vec<Field>,
    /// The declared rest type, `T...;`.
    pub rest: Option<Ty>,
    pub closed: bool,
    /// Types included with `*T;`.
    pub includes: Vec<Ty>,
}

impl RecordTy {
    /// The type of fields not listed. Open records without a rest type
    /// accept any `anydata`; closed ones accept nothing.
    pub fn rest_ty(&self) -> Option<Ty> {
        match (&self.rest, self.closed) {
            (Some(rest), _) => Some(rest.clone()),
            (None, true) => None,
            (None, false) => Some(Ty::primitive(Primitive::Anydata)),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name.as_str() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamTy {
    pub ty: Ty,
    pub has_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionTy {
    pub params: Vec<ParamTy>,
    pub rest: Option<Ty>,
    pub ret: Ty,
}

impl FunctionTy {
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|param| !param.has_default).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    pub name: Name,
    pub ty: FunctionTy,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ObjectTy {
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub includes: Vec<Ty>,
}

impl ObjectTy {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name.as_str() == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|method| method.name.as_str() == name)
    }
}

/// A named type, qualified when it comes from another module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub module: Option<ModulePath>,
    pub name: Name,
}

impl TypeName {
    pub fn new(module: Option<ModulePath>, name: Name) -> Self {
        Self { module, name }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.module.as_ref().and_then(ModulePath::default_prefix) {
            write!(f, "{prefix}:")?;
        }
        write!(f, "{}", self.name)
    }
}

impl Ty {
    pub fn new(kind: TyKind) -> Self {
        Self(Arc::new(kind))
    }

    pub fn kind(&self) -> &TyKind {
        &self.0
    }

    pub fn primitive(primitive: Primitive) -> Self {
        Self::new(TyKind::Primitive(primitive))
    }

    pub fn unknown() -> Self {
        Self::new(TyKind::Unknown)
    }

    pub fn nil() -> Self {
        Self::primitive(Primitive::Nil)
    }

    pub fn boolean() -> Self {
        Self::primitive(Primitive::Boolean)
    }

    pub fn int() -> Self {
        Self::primitive(Primitive::Int)
    }

    pub fn float() -> Self {
        Self::primitive(Primitive::Float)
    }

    pub fn string() -> Self {
        Self::primitive(Primitive::String)
    }

    pub fn never() -> Self {
        Self::primitive(Primitive::Never)
    }

    pub fn error() -> Self {
        Self::new(TyKind::Error(None))
    }

    pub fn array(element: Self) -> Self {
        Self::new(TyKind::Array(element))
    }

    pub fn map(value: Self) -> Self {
        Self::new(TyKind::Map(value))
    }

    pub fn optional(inner: Self) -> Self {
        match inner.kind() {
            TyKind::Optional(_) | TyKind::Unknown | TyKind::Primitive(Primitive::Nil) => inner,
            _ => Self::new(TyKind::Optional(inner)),
        }
    }

    pub fn named(name: TypeName) -> Self {
        Self::new(TyKind::Ref(name))
    }

    /// Flattens nested unions and drops duplicates. No members is `never`
    /// and a single member is returned as is.
    pub fn union(members: impl IntoIterator<Item = Self>) -> Self {
        let mut flat: Vec<Self> = Vec::new();
        for member in members {
            match member.kind() {
                TyKind::Union(nested) => {
                    for nested in nested.members() {
                        if !flat.contains(nested) {
                            flat.push(nested.clone());
                        }
                    }
                }
                _ if flat.contains(&member) => {}
                _ => flat.push(member),
            }
        }
        match flat.len() {
            0 => Self::never(),
            1 => flat.swap_remove(0),
            _ => Self::new(TyKind::Union(UnionTy(flat))),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind(), TyKind::Unknown)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.kind(), TyKind::Primitive(Primitive::Nil))
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self.kind() {
            TyKind::Primitive(primitive) => Some(*primitive),
            _ => None,
        }
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({self})")
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TyKind::Primitive(primitive) => f.write_str(primitive.as_str()),
            TyKind::Record(record) => {
                let (open, close) = if record.closed { ("{|", "|}") } else { ("{", "}") };
                write!(f, "record {open} ")?;
                for include in &record.includes {
                    write!(f, "*{include}; ")?;
                }
                for field in &record.fields {
                    write_field(f, field)?;
                }
                if let Some(rest) = &record.rest {
                    write!(f, "{rest}...; ")?;
                }
                f.write_str(close)
            }
            TyKind::Array(element) => {
                write_operand(f, element)?;
                f.write_str("[]")
            }
            TyKind::Map(value) => write!(f, "map<{value}>"),
            TyKind::Table(row) => write!(f, "table<{row}>"),
            TyKind::Union(members) => write_joined(f, members.members(), "|"),
            TyKind::Intersection(members) => write_joined(f, members, "&"),
            TyKind::Function(function) => write!(f, "{function}"),
            TyKind::Object(object) => {
                f.write_str("object { ")?;
                for include in &object.includes {
                    write!(f, "*{include}; ")?;
                }
                for field in &object.fields {
                    write_field(f, field)?;
                }
                for method in &object.methods {
                    write!(f, "function {}", method.name)?;
                    write_signature(f, &method.ty)?;
                    f.write_str("; ")?;
                }
                f.write_str("}")
            }
            TyKind::Error(None) => f.write_str("error"),
            TyKind::Error(Some(detail)) => write!(f, "error<{detail}>"),
            TyKind::Optional(inner) => {
                write_operand(f, inner)?;
                f.write_str("?")
            }
            TyKind::Ref(name) => write!(f, "{name}"),
            TyKind::Unknown => f.write_str("<unknown>"),
        }
    }
}

impl fmt::Display for FunctionTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("function ")?;
        write_signature(f, self)
    }
}

fn write_signature(f: &mut fmt::Formatter<'_>, function: &FunctionTy) -> fmt::Result {
    f.write_str("(")?;
    let mut first = true;
    for param in &function.params {
        if !first {
            f.write_str(", ")?;
        }
        first = false;
        write!(f, "{}", param.ty)?;
    }
    if let Some(rest) = &function.rest {
        if !first {
            f.write_str(", ")?;
        }
        write!(f, "{rest}...")?;
    }
    f.write_str(")")?;
    if !function.ret.is_nil() {
        write!(f, " returns {}", function.ret)?;
    }
    Ok(())
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &Field) -> fmt::Result {
    if field.readonly {
        f.write_str("readonly ")?;
    }
    write!(f, "{} {}", field.ty, field.name)?;
    if field.optional {
        f.write_str("?")?;
    }
    f.write_str("; ")
}

/// Parenthesizes types that would otherwise bind looser than `[]` or `?`.
fn write_operand(f: &mut fmt::Formatter<'_>, ty: &Ty) -> fmt::Result {
    match ty.kind() {
        TyKind::Union(_) | TyKind::Intersection(_) | TyKind::Function(_) => write!(f, "({ty})"),
        _ => write!(f, "{ty}"),
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, members: &[Ty], separator: &str) -> fmt::Result {
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        match member.kind() {
            TyKind::Function(_) => write!(f, "({member})")?,
            _ => write!(f, "{member}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_and_ignores_order() {
        let a = Ty::union([Ty::int(), Ty::union([Ty::string(), Ty::int()])]);
        let b = Ty::union([Ty::string(), Ty::int()]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "int|string");
        assert_eq!(b.to_string(), "string|int");
        assert_eq!(Ty::union([Ty::int()]), Ty::int());
        assert_eq!(Ty::union([]), Ty::never());
    }

    #[test]
    fn display() {
        let record = Ty::new(TyKind::Record(RecordTy {
            fields: vec![
                Field::new("name".into(), Ty::string()),
                Field { optional: true, ..Field::new("age".into(), Ty::int()) },
            ],
            rest: None,
            closed: true,
            includes: Vec::new(),
        }));
        assert_eq!(record.to_string(), "record {| string name; int age?; |}");

        let function = Ty::new(TyKind::Function(FunctionTy {
            params: vec![ParamTy { ty: Ty::int(), has_default: false }],
            rest: Some(Ty::string()),
            ret: Ty::optional(Ty::int()),
        }));
        assert_eq!(function.to_string(), "function (int, string...) returns int?");
        assert_eq!(Ty::array(Ty::union([Ty::int(), Ty::string()])).to_string(), "(int|string)[]");
        assert_eq!(Ty::map(Ty::error()).to_string(), "map<error>");
    }
}
