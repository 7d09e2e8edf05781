//! The module-level symbols a unit offers to its importers.

use std::sync::Arc;

use bal_inputs::ModulePath;
use bal_yellow::ast::{self, HasName as _, HasQualifiers as _, HasTypedBinding as _};
use rustc_hash::FxHashMap;

use crate::lower::{self, TypeScope};
use crate::scope::{FxIndexMap, Mutability, Namespace, SymbolKind, Visibility};
use crate::ty::{Primitive, Ty, TyKind, TypeName};
use crate::Name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSymbol {
    pub name: Name,
    pub kind: SymbolKind,
    /// Named types inside are qualified with the exporting module.
    pub ty: Option<Ty>,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub isolated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleExports {
    module: ModulePath,
    types: FxIndexMap<Name, ExportedSymbol>,
    values: FxIndexMap<Name, ExportedSymbol>,
}

impl ModuleExports {
    /// Collects the module-level declarations of a unit. Only the syntax of
    /// the unit itself is read, so imports never need to be resolved first.
    pub fn collect(module: &ast::Module, path: &ModulePath) -> Self {
        let mut scope = ExportScope::new(module, path);
        let mut exports = Self { module: path.clone(), ..Self::default() };

        for item in module.items() {
            let Some(name) = item.name().as_ref().and_then(Name::from_token) else { continue };
            let visibility =
                if item.is_public() { Visibility::Public } else { Visibility::ModulePrivate };
            let isolated = item.is_isolated();

            let (kind, ty, mutability) = match &item {
                ast::Item::Function(function) => (
                    SymbolKind::Function,
                    Ty::new(TyKind::Function(lower::signature(&mut scope, function))),
                    Mutability::Constant,
                ),
                ast::Item::TypeDef(def) => (
                    SymbolKind::TypeDef,
                    lower::lower_opt(&mut scope, def.ty()),
                    Mutability::Constant,
                ),
                ast::Item::Class(class) => (
                    SymbolKind::Class,
                    Ty::new(TyKind::Object(lower::lower_members(&mut scope, class.members()))),
                    Mutability::Constant,
                ),
                ast::Item::Const(constant) => {
                    let ty = match constant.ty() {
                        Some(ty) => lower::lower_type(&mut scope, &ty),
                        None => literal_type(constant.initializer()),
                    };
                    (SymbolKind::Constant, ty, Mutability::Constant)
                }
                ast::Item::Var(var) => {
                    let ty = match var.ty() {
                        Some(ty) if !var.is_var() => lower::lower_type(&mut scope, &ty),
                        _ => literal_type(var.initializer()),
                    };
                    let mutability =
                        if var.is_final() { Mutability::Final } else { Mutability::Mutable };
                    (SymbolKind::Variable, ty, mutability)
                }
            };

            let symbol = ExportedSymbol {
                name: name.clone(),
                kind,
                ty: Some(ty),
                visibility,
                mutability,
                isolated,
            };
            let table = match kind.namespace() {
                Namespace::Type => &mut exports.types,
                _ => &mut exports.values,
            };
            // The first declaration wins, as in the binder.
            table.entry(name).or_insert(symbol);
        }

        exports
    }

    pub fn module(&self) -> &ModulePath {
        &self.module
    }

    pub fn get(&self, namespace: Namespace, name: &Name) -> Option<&ExportedSymbol> {
        match namespace {
            Namespace::Type => self.types.get(name),
            Namespace::Value => self.values.get(name),
            Namespace::Module => None,
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &ExportedSymbol> {
        self.types.values().chain(self.values.values())
    }

    /// Adds the symbols of another unit of the same module. Names already
    /// present keep their first declaration.
    pub fn merge(&mut self, other: &Self) {
        for (name, symbol) in &other.types {
            self.types.entry(name.clone()).or_insert_with(|| symbol.clone());
        }
        for (name, symbol) in &other.values {
            self.values.entry(name.clone()).or_insert_with(|| symbol.clone());
        }
    }
}

/// The type of a constant without a declared type, from its literal.
pub(crate) fn literal_type(init: Option<ast::Expr>) -> Ty {
    let primitive = match init {
        Some(ast::Expr::Literal(literal)) => match literal.kind() {
            Some(ast::LiteralKind::Int | ast::LiteralKind::HexInt) => Primitive::Int,
            Some(ast::LiteralKind::Float | ast::LiteralKind::HexFloat) => Primitive::Float,
            Some(ast::LiteralKind::Decimal) => Primitive::Decimal,
            Some(ast::LiteralKind::String) => Primitive::String,
            Some(ast::LiteralKind::Boolean) => Primitive::Boolean,
            Some(ast::LiteralKind::Null) => Primitive::Nil,
            None => return Ty::unknown(),
        },
        Some(ast::Expr::Nil(_)) => Primitive::Nil,
        Some(ast::Expr::StringTemplate(_)) => Primitive::String,
        _ => return Ty::unknown(),
    };
    Ty::primitive(primitive)
}

/// Resolves type names from syntax alone: local names are qualified with the
/// unit's own module, prefixed names with the imported module.
struct ExportScope {
    module: ModulePath,
    local: Vec<Name>,
    imports: FxHashMap<Name, ModulePath>,
}

impl ExportScope {
    fn new(module: &ast::Module, path: &ModulePath) -> Self {
        let local = module
            .items()
            .filter(|item| matches!(item, ast::Item::TypeDef(_) | ast::Item::Class(_)))
            .filter_map(|item| item.name().as_ref().and_then(Name::from_token))
            .collect();
        let imports = module
            .imports()
            .filter_map(|import| import_path(&import))
            .collect();
        Self { module: path.clone(), local, imports }
    }
}

impl TypeScope for ExportScope {
    fn resolve_type(&mut self, ty: &ast::TypeRef) -> Option<TypeName> {
        let name = ty.name().as_ref().and_then(Name::from_token)?;
        match ty.prefix() {
            Some(prefix) => {
                let module = self.imports.get(&Name::from_token(&prefix)?)?;
                Some(TypeName::new(Some(module.clone()), name))
            }
            None if self.local.contains(&name) => {
                Some(TypeName::new(Some(self.module.clone()), name))
            }
            None => None,
        }
    }
}

/// The prefix an import binds and the module it names.
pub(crate) fn import_path(import: &ast::Import) -> Option<(Name, ModulePath)> {
    let names: Vec<String> = import
        .module_names()
        .iter()
        .map(|token| Name::new(token.text_trimmed()).as_str().to_owned())
        .collect();
    if names.is_empty() {
        return None;
    }
    let org = import.org().map(|org| org.text_trimmed().to_owned());
    let path = ModulePath::new(org, names);
    let prefix = match import.prefix() {
        Some(prefix) => Name::from_token(&prefix)?,
        None => Name::new(path.default_prefix()?),
    };
    Some((prefix, path))
}

/// Finds the exports of imported modules.
pub trait ModuleLookup {
    fn exports(&self, module: &ModulePath) -> Option<Arc<ModuleExports>>;
}

/// A lookup for units that import nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModules;

impl ModuleLookup for NoModules {
    fn exports(&self, _: &ModulePath) -> Option<Arc<ModuleExports>> {
        None
    }
}

impl ModuleLookup for [Arc<ModuleExports>] {
    fn exports(&self, module: &ModulePath) -> Option<Arc<ModuleExports>> {
        self.iter().find(|exports| exports.module().matches(module)).cloned()
    }
}

impl ModuleLookup for Vec<Arc<ModuleExports>> {
    fn exports(&self, module: &ModulePath) -> Option<Arc<ModuleExports>> {
        self.as_slice().exports(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(path: &str, text: &str) -> ModuleExports {
        let parse = bal_parse::parse(text);
        ModuleExports::collect(&parse.module(), &ModulePath::parse(path).expect("valid path"))
    }

    #[test]
    fn collects_types_and_values() {
        let exports = collect(
            "acme/geo",
            "public type Point record { int x; int y; };
             public function origin() returns Point { return {x: 0, y: 0}; }
             const LIMIT = 10;
             int counter = 0;",
        );

        let point = exports.get(Namespace::Type, &"Point".into()).expect("Point is exported");
        assert_eq!(point.kind, SymbolKind::TypeDef);
        assert_eq!(point.visibility, Visibility::Public);

        let origin = exports.get(Namespace::Value, &"origin".into()).expect("origin is exported");
        assert_eq!(
            origin.ty.as_ref().map(ToString::to_string).as_deref(),
            Some("function () returns geo:Point")
        );

        let limit = exports.get(Namespace::Value, &"LIMIT".into()).expect("LIMIT is exported");
        assert_eq!(limit.kind.as_str(), "const");
        assert_eq!(limit.ty, Some(Ty::int()));
        assert_eq!(limit.visibility, Visibility::ModulePrivate);

        let counter = exports.get(Namespace::Value, &"counter".into()).expect("counter is exported");
        assert_eq!(counter.mutability, Mutability::Mutable);
        assert!(exports.get(Namespace::Value, &"Point".into()).is_none());
    }

    #[test]
    fn slice_lookup_matches_org_less_imports() {
        let modules = [Arc::new(collect("acme/geo", "public type Id int;"))];
        let lookup: &[Arc<ModuleExports>] = &modules;

        assert!(lookup.exports(&ModulePath::parse("geo").expect("valid path")).is_some());
        assert!(lookup.exports(&ModulePath::parse("other/geo").expect("valid path")).is_none());
        assert!(NoModules.exports(&ModulePath::parse("geo").expect("valid path")).is_none());
    }
}
