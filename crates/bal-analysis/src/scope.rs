use bal_inputs::ModulePath;
use bal_yellow::{SyntaxNodePtr, TextRange, TextSize};

use crate::arena::Idx;
use crate::exports::ExportedSymbol;
use crate::ty::Ty;
use crate::Name;

pub(crate) type FxIndexMap<K, V> =
    indexmap::IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

pub type ScopeId = Idx<ScopeData>;
pub type SymbolId = Idx<SymbolData>;

/// Types, values and import prefixes live side by side without clashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Type,
    Value,
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
    Query,
    /// Fields and methods of a class. Reached through `self`, never by
    /// lexical lookup.
    Class,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ScopeData {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub range: TextRange,
    pub(crate) entries: FxIndexMap<(Namespace, Name), SymbolId>,
}

impl ScopeData {
    pub(crate) fn new(kind: ScopeKind, parent: Option<ScopeId>, range: TextRange) -> Self {
        Self { kind, parent, range, entries: FxIndexMap::default() }
    }

    pub fn get(&self, namespace: Namespace, name: &Name) -> Option<SymbolId> {
        self.entries.get(&(namespace, name.clone())).copied()
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.entries.values().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    TypeDef,
    Class,
    Constant,
    Import,
    Field,
    Method,
}

impl SymbolKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::Parameter => "parameter",
            Self::Function => "function",
            Self::TypeDef => "type",
            Self::Class => "class",
            Self::Constant => "const",
            Self::Import => "import",
            Self::Field => "field",
            Self::Method => "method",
        }
    }

    pub const fn namespace(self) -> Namespace {
        match self {
            Self::TypeDef | Self::Class => Namespace::Type,
            Self::Import => Namespace::Module,
            _ => Namespace::Value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    ModulePrivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    Mutable,
    Final,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolData {
    pub name: Name,
    pub kind: SymbolKind,
    /// The declared type, if one was written.
    pub ty: Option<Ty>,
    pub decl: SyntaxNodePtr,
    pub name_range: TextRange,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub isolated: bool,
    pub scope: ScopeId,
    /// Uses before this offset in the same block are forward references.
    pub visible_from: TextSize,
    pub documentation: Option<String>,
    /// The imported module, for import symbols.
    pub module: Option<ModulePath>,
}

/// What a name reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: Target,
    /// The range of the name itself, without any prefix.
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Symbol(SymbolId),
    External(ExternalSymbol),
}

/// A symbol of an imported module, reached through `prefix:name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSymbol {
    pub import: SymbolId,
    pub module: ModulePath,
    pub symbol: ExportedSymbol,
}
