//! Scopes, symbols and name resolution.
//!
//! Module-level declarations are entered first so that items may refer to
//! each other in any order. Bodies are then walked once: every block, query
//! and function opens a scope, locals are entered when their block is
//! entered, and each name reference is resolved against the scope chain at
//! the point where it occurs.

use std::sync::Arc;

use bal_errors::{Diagnostic, DiagnosticCode};
use bal_inputs::Cancellation;
use bal_parse::{Parse, Status};
use bal_yellow::ast::{
    self, AstNode as _, HasDocumentation as _, HasName as _, HasQualifiers as _, HasTypedBinding,
};
use bal_yellow::{
    SyntaxKind, SyntaxNode, SyntaxNodePtr, SyntaxToken, TextRange, TextSize, WalkEvent,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::arena::{Arena, Idx};
use crate::exports::{self, ModuleExports, ModuleLookup};
use crate::lower::{self, TypeScope};
use crate::scope::{
    ExternalSymbol, Mutability, Namespace, Resolution, ScopeData, ScopeId, ScopeKind, SymbolData,
    SymbolId, SymbolKind, Target, Visibility,
};
use crate::ty::{Ty, TyKind, TypeName};
use crate::Name;

/// The scopes and symbols of one unit, and what each name in it refers to.
#[derive(Debug, PartialEq, Eq)]
pub struct Bindings {
    scopes: Arena<ScopeData>,
    symbols: Arena<SymbolData>,
    resolutions: FxHashMap<SyntaxNodePtr, Resolution>,
    definitions: FxHashMap<TextRange, SymbolId>,
    types: FxHashMap<Name, Ty>,
    diagnostics: Vec<Diagnostic>,
    status: Status,
}

impl Bindings {
    pub fn module_scope(&self) -> ScopeId {
        Idx::new(0)
    }

    pub fn scope(&self, scope: ScopeId) -> &ScopeData {
        &self.scopes[scope]
    }

    pub fn scopes(&self) -> impl ExactSizeIterator<Item = (ScopeId, &ScopeData)> {
        self.scopes.iter()
    }

    pub fn symbol(&self, symbol: SymbolId) -> &SymbolData {
        &self.symbols[symbol]
    }

    pub fn symbols(&self) -> impl ExactSizeIterator<Item = (SymbolId, &SymbolData)> {
        self.symbols.iter()
    }

    /// The resolution of a `NAME_REF`, `QUALIFIED_NAME_REF`, `TYPE_REF` or
    /// shorthand `MAPPING_FIELD` node.
    pub fn resolution(&self, node: &SyntaxNodePtr) -> Option<&Resolution> {
        self.resolutions.get(node)
    }

    pub fn resolutions(&self) -> impl Iterator<Item = (&SyntaxNodePtr, &Resolution)> {
        self.resolutions.iter()
    }

    pub fn resolved_symbol(&self, node: &SyntaxNode) -> Option<SymbolId> {
        match self.resolution(&SyntaxNodePtr::new(node))?.target {
            Target::Symbol(symbol) => Some(symbol),
            Target::External(_) => None,
        }
    }

    /// The symbol declared by the name at `range`.
    pub fn definition(&self, name_range: TextRange) -> Option<SymbolId> {
        self.definitions.get(&name_range).copied()
    }

    pub fn definitions(&self) -> impl Iterator<Item = (TextRange, SymbolId)> + '_ {
        self.definitions.iter().map(|(&range, &symbol)| (range, symbol))
    }

    /// Module-level type definitions and classes by name.
    pub fn types(&self) -> &FxHashMap<Name, Ty> {
        &self.types
    }

    pub fn lookup_module(&self, namespace: Namespace, name: &Name) -> Option<SymbolId> {
        self.scopes[self.module_scope()].get(namespace, name)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

pub fn bind(parse: &Parse, lookup: &dyn ModuleLookup, cancellation: &dyn Cancellation) -> Bindings {
    let _span = tracing::debug_span!("bind").entered();

    let root = parse.syntax_node();
    let mut scopes = Arena::default();
    let module_scope = scopes.alloc(ScopeData::new(ScopeKind::Module, None, root.text_range()));

    let mut binder = Binder {
        lookup,
        cancellation,
        bindings: Bindings {
            scopes,
            symbols: Arena::default(),
            resolutions: FxHashMap::default(),
            definitions: FxHashMap::default(),
            types: FxHashMap::default(),
            diagnostics: Vec::new(),
            status: parse.status(),
        },
        scope: module_scope,
        class: None,
        stack: Vec::new(),
        ambiguous: FxHashSet::default(),
        imports: FxHashMap::default(),
        type_refs: FxHashMap::default(),
    };
    binder.bind_module(&parse.module());

    let mut bindings = binder.bindings;
    bindings.diagnostics.sort_by_key(|diagnostic| diagnostic.range().start());
    tracing::trace!(
        scopes = bindings.scopes.len(),
        symbols = bindings.symbols.len(),
        diagnostics = bindings.diagnostics.len(),
        "bound module"
    );
    bindings
}

enum Lookup {
    Found(SymbolId),
    /// Declared later in the same block.
    Forward(SymbolId),
    NotFound,
}

struct Binder<'a> {
    lookup: &'a dyn ModuleLookup,
    cancellation: &'a dyn Cancellation,
    bindings: Bindings,
    scope: ScopeId,
    /// The innermost class scope, for `self`.
    class: Option<ScopeId>,
    /// Nodes that opened a scope, with the scope and class to restore when
    /// they are left.
    stack: Vec<(SyntaxNode, ScopeId, Option<ScopeId>)>,
    /// Prefixes bound by more than one import.
    ambiguous: FxHashSet<Name>,
    /// Exports of each import, `None` when the module is unknown.
    imports: FxHashMap<SymbolId, Option<Arc<ModuleExports>>>,
    type_refs: FxHashMap<SyntaxNodePtr, Option<TypeName>>,
}

impl Binder<'_> {
    fn bind_module(&mut self, module: &ast::Module) {
        for import in module.imports() {
            self.declare_import(&import);
        }

        let mut items = Vec::new();
        for item in module.items() {
            let symbol = self.declare_item(&item);
            items.push((item, symbol));
        }
        for (item, symbol) in &items {
            if let Some(symbol) = *symbol {
                self.lower_item(item, symbol);
            }
        }

        for (item, _) in &items {
            if self.is_cancelled() {
                break;
            }
            self.walk(item.syntax());
        }
    }

    fn is_cancelled(&mut self) -> bool {
        if self.bindings.status == Status::Cancelled {
            return true;
        }
        if self.cancellation.is_cancelled() {
            tracing::debug!("binding cancelled");
            self.bindings.status = Status::Cancelled;
            return true;
        }
        false
    }

    fn declare_import(&mut self, import: &ast::Import) {
        let Some((prefix, path)) = exports::import_path(import) else { return };
        let names = import.module_names();
        let path_range = match (names.first(), names.last()) {
            (Some(first), Some(last)) => first.trimmed_range().cover(last.trimmed_range()),
            _ => import.syntax().trimmed_range(),
        };
        let name_range = import.prefix().map_or(path_range, |prefix| prefix.trimmed_range());

        let exports = self.lookup.exports(&path);
        if exports.is_none() {
            self.error(
                DiagnosticCode::UnknownModule,
                format!("cannot resolve module `{path}`"),
                path_range,
            );
        }

        let module_scope = self.bindings.module_scope();
        if self.bindings.scopes[module_scope].get(Namespace::Module, &prefix).is_some() {
            self.ambiguous.insert(prefix);
            return;
        }
        let data = SymbolData {
            module: Some(path),
            ..self.symbol_data(prefix, SymbolKind::Import, import.syntax(), name_range)
        };
        if let Some(symbol) = self.declare(module_scope, data) {
            self.imports.insert(symbol, exports);
        }
    }

    fn declare_item(&mut self, item: &ast::Item) -> Option<SymbolId> {
        let token = item.name()?;
        let name = Name::from_token(&token)?;
        let (kind, mutability) = match item {
            ast::Item::Function(_) => (SymbolKind::Function, Mutability::Constant),
            ast::Item::TypeDef(_) => (SymbolKind::TypeDef, Mutability::Constant),
            ast::Item::Class(_) => (SymbolKind::Class, Mutability::Constant),
            ast::Item::Const(_) => (SymbolKind::Constant, Mutability::Constant),
            ast::Item::Var(var) if var.is_final() => (SymbolKind::Variable, Mutability::Final),
            ast::Item::Var(_) => (SymbolKind::Variable, Mutability::Mutable),
        };
        let data = SymbolData {
            visibility: if item.is_public() { Visibility::Public } else { Visibility::ModulePrivate },
            mutability,
            isolated: item.is_isolated(),
            documentation: item.documentation().map(|doc| doc.summary()),
            ..self.symbol_data(name, kind, item.syntax(), token.trimmed_range())
        };
        self.declare(self.bindings.module_scope(), data)
    }

    /// Records the declared type of a module-level symbol.
    fn lower_item(&mut self, item: &ast::Item, symbol: SymbolId) {
        let ty = match item {
            ast::Item::Function(function) => {
                Some(Ty::new(TyKind::Function(lower::signature(self, function))))
            }
            ast::Item::TypeDef(def) => Some(lower::lower_opt(self, def.ty())),
            ast::Item::Class(class) => {
                Some(Ty::new(TyKind::Object(lower::lower_members(self, class.members()))))
            }
            ast::Item::Const(constant) => match constant.ty() {
                Some(ty) => Some(lower::lower_type(self, &ty)),
                None => Some(exports::literal_type(constant.initializer()))
                    .filter(|ty| !ty.is_unknown()),
            },
            ast::Item::Var(var) => self.declared_type(var),
        };

        let module_scope = self.bindings.module_scope();
        let data = &mut self.bindings.symbols[symbol];
        data.ty = ty.clone();
        let winner =
            self.bindings.scopes[module_scope].get(data.kind.namespace(), &data.name) == Some(symbol);
        if winner
            && matches!(data.kind, SymbolKind::TypeDef | SymbolKind::Class)
            && let Some(ty) = ty
        {
            self.bindings.types.insert(data.name.clone(), ty);
        }
    }

    /// The written type of a binding; `None` for `var`.
    fn declared_type(&mut self, binding: &impl HasTypedBinding) -> Option<Ty> {
        if binding.is_var() {
            return None;
        }
        Some(lower::lower_opt(self, binding.ty()))
    }

    fn walk(&mut self, root: &SyntaxNode) {
        let mut preorder = root.preorder();
        while let Some(event) = preorder.next() {
            match event {
                WalkEvent::Enter(node) => {
                    if ast::Stmt::can_cast(node.kind()) && self.is_cancelled() {
                        break;
                    }
                    if self.enter(&node) {
                        preorder.skip_subtree();
                    }
                }
                WalkEvent::Leave(node) => self.leave(&node),
            }
        }
        // Restore the module scope after a cancelled walk.
        while let Some((_, scope, class)) = self.stack.pop() {
            self.scope = scope;
            self.class = class;
        }
    }

    /// Returns whether the subtree needs no further walking.
    fn enter(&mut self, node: &SyntaxNode) -> bool {
        match node.kind() {
            SyntaxKind::NAME_REF => {
                self.resolve_name_ref(node);
                true
            }
            SyntaxKind::QUALIFIED_NAME_REF => {
                let name_ref = ast::QualifiedNameRef::cast(node.clone());
                if let Some(name_ref) = name_ref
                    && let (Some(prefix), Some(name)) = (name_ref.prefix(), name_ref.name())
                {
                    self.resolve_qualified(node, &prefix, &name, Namespace::Value);
                }
                true
            }
            SyntaxKind::TYPE_REF => {
                if let Some(type_ref) = ast::TypeRef::cast(node.clone()) {
                    self.resolve_type(&type_ref);
                }
                true
            }
            SyntaxKind::SELF_REF => {
                if self.class.is_none() {
                    self.error(
                        DiagnosticCode::SelfOutsideClass,
                        "`self` can only be used inside a class",
                        node.trimmed_range(),
                    );
                }
                true
            }
            SyntaxKind::MAPPING_FIELD => {
                if let Some(field) = ast::MappingField::cast(node.clone())
                    && field.is_shorthand()
                    && let Some(key) = field.key_token()
                    && key.kind() == SyntaxKind::NAME
                {
                    self.resolve_value(node, &key);
                }
                false
            }
            SyntaxKind::FUNCTION_DEF | SyntaxKind::METHOD_DEF | SyntaxKind::ANON_FUNCTION => {
                self.push(node, ScopeKind::Function);
                let list = node.children().find_map(ast::ParamList::cast);
                self.declare_params(list);
                false
            }
            SyntaxKind::ARROW_FUNCTION => {
                self.push(node, ScopeKind::Function);
                if let Some(arrow) = ast::ArrowFunction::cast(node.clone()) {
                    for param in arrow.params() {
                        let Some(name) = Name::from_token(&param) else { continue };
                        let data = SymbolData {
                            mutability: Mutability::Final,
                            ..self.symbol_data(name, SymbolKind::Parameter, node, param.trimmed_range())
                        };
                        self.declare(self.scope, data);
                    }
                }
                false
            }
            SyntaxKind::CLASS_DEF => {
                self.push(node, ScopeKind::Class);
                self.class = Some(self.scope);
                if let Some(class) = ast::ClassDef::cast(node.clone()) {
                    self.declare_members(&class);
                }
                false
            }
            SyntaxKind::BLOCK => {
                self.push(node, ScopeKind::Block);
                if let Some(foreach) = node.parent().and_then(ast::ForeachStmt::cast) {
                    self.declare_binding(&foreach, node.trimmed_range().start());
                }
                if let Some(block) = ast::Block::cast(node.clone()) {
                    for stmt in block.stmts() {
                        if let ast::Stmt::LocalVar(local) = stmt {
                            self.declare_local(&local);
                        }
                    }
                }
                false
            }
            SyntaxKind::QUERY_EXPR => {
                self.push(node, ScopeKind::Query);
                false
            }
            _ => false,
        }
    }

    fn leave(&mut self, node: &SyntaxNode) {
        match node.kind() {
            SyntaxKind::FROM_CLAUSE => {
                if let Some(from) = ast::FromClause::cast(node.clone()) {
                    self.declare_binding(&from, node.trimmed_range().end());
                }
            }
            SyntaxKind::LET_CLAUSE => {
                if let Some(clause) = ast::LetClause::cast(node.clone()) {
                    self.declare_binding(&clause, node.trimmed_range().end());
                }
            }
            _ => {}
        }
        if self.stack.last().is_some_and(|(opened, ..)| opened == node)
            && let Some((_, scope, class)) = self.stack.pop()
        {
            self.scope = scope;
            self.class = class;
        }
    }

    fn push(&mut self, node: &SyntaxNode, kind: ScopeKind) {
        self.stack.push((node.clone(), self.scope, self.class));
        let data = ScopeData::new(kind, Some(self.scope), node.trimmed_range());
        self.scope = self.bindings.scopes.alloc(data);
    }

    fn declare_params(&mut self, list: Option<ast::ParamList>) {
        let Some(list) = list else { return };
        for param in list.params() {
            let ty = lower::lower_opt(self, param.ty());
            self.declare_param(param.syntax(), param.name(), ty);
        }
        if let Some(rest) = list.rest_param() {
            let ty = Ty::array(lower::lower_opt(self, rest.ty()));
            self.declare_param(rest.syntax(), rest.name(), ty);
        }
    }

    fn declare_param(&mut self, node: &SyntaxNode, name: Option<SyntaxToken>, ty: Ty) {
        let Some(token) = name else { return };
        let Some(name) = Name::from_token(&token) else { return };
        let data = SymbolData {
            ty: Some(ty),
            mutability: Mutability::Final,
            ..self.symbol_data(name, SymbolKind::Parameter, node, token.trimmed_range())
        };
        self.declare(self.scope, data);
    }

    fn declare_members(&mut self, class: &ast::ClassDef) {
        for member in class.members() {
            let (kind, ty, mutability, token) = match &member {
                ast::ClassMember::Field(field) => {
                    let ty = lower::lower_opt(self, field.ty());
                    let mutability =
                        if field.is_final() { Mutability::Final } else { Mutability::Mutable };
                    (SymbolKind::Field, ty, mutability, field.name())
                }
                ast::ClassMember::Method(method) => {
                    let ty = Ty::new(TyKind::Function(lower::signature(self, method)));
                    (SymbolKind::Method, ty, Mutability::Constant, method.name())
                }
                ast::ClassMember::Inclusion(_) => continue,
            };
            let Some(token) = token else { continue };
            let Some(name) = Name::from_token(&token) else { continue };
            let (visibility, isolated, documentation) = match &member {
                ast::ClassMember::Field(field) => {
                    (field.is_public(), false, field.documentation())
                }
                ast::ClassMember::Method(method) => {
                    (method.is_public(), method.is_isolated(), method.documentation())
                }
                ast::ClassMember::Inclusion(_) => continue,
            };
            let data = SymbolData {
                ty: Some(ty),
                mutability,
                visibility: if visibility { Visibility::Public } else { Visibility::ModulePrivate },
                isolated,
                documentation: documentation.map(|doc| doc.summary()),
                ..self.symbol_data(name, kind, member.syntax(), token.trimmed_range())
            };
            self.declare(self.scope, data);
        }
    }

    fn declare_local(&mut self, local: &ast::LocalVarDecl) {
        let Some(token) = local.name() else { return };
        let Some(name) = Name::from_token(&token) else { return };
        let ty = self.declared_type(local);
        let mutability = if local.is_final() { Mutability::Final } else { Mutability::Mutable };
        let data = SymbolData {
            ty,
            mutability,
            visible_from: local.syntax().trimmed_range().end(),
            ..self.symbol_data(name, SymbolKind::Variable, local.syntax(), token.trimmed_range())
        };
        self.declare(self.scope, data);
    }

    /// Declares the variable of a `foreach`, `from` or `let`.
    fn declare_binding(&mut self, binding: &impl HasTypedBinding, visible_from: TextSize) {
        let Some(token) = binding.name() else { return };
        let Some(name) = Name::from_token(&token) else { return };
        let ty = self.declared_type(binding);
        let data = SymbolData {
            ty,
            visible_from,
            ..self.symbol_data(name, SymbolKind::Variable, binding.syntax(), token.trimmed_range())
        };
        self.declare(self.scope, data);
    }

    fn symbol_data(
        &self,
        name: Name,
        kind: SymbolKind,
        decl: &SyntaxNode,
        name_range: TextRange,
    ) -> SymbolData {
        SymbolData {
            name,
            kind,
            ty: None,
            decl: SyntaxNodePtr::new(decl),
            name_range,
            visibility: Visibility::ModulePrivate,
            mutability: Mutability::Mutable,
            isolated: false,
            scope: self.scope,
            visible_from: TextSize::new(0),
            documentation: None,
            module: None,
        }
    }

    /// Enters a symbol into `scope`. A redeclaration still gets a symbol so
    /// that its own uses can be found, but the first declaration keeps the
    /// name. `_` declares nothing.
    fn declare(&mut self, scope: ScopeId, mut data: SymbolData) -> Option<SymbolId> {
        if data.name.is_wildcard() {
            return None;
        }
        data.scope = scope;
        let key = (data.kind.namespace(), data.name.clone());
        let existing = self.bindings.scopes[scope].entries.get(&key).copied();
        let name_range = data.name_range;

        if let Some(existing) = existing {
            let first = self.bindings.symbols[existing].name_range;
            let diagnostic = Diagnostic::new(
                DiagnosticCode::Redeclaration,
                format!("`{}` is already declared in this scope", data.name),
                name_range,
            )
            .with_related(first, "first declared here");
            self.bindings.diagnostics.push(diagnostic);
        }

        let symbol = self.bindings.symbols.alloc(data);
        if existing.is_none() {
            self.bindings.scopes[scope].entries.insert(key, symbol);
        }
        self.bindings.definitions.insert(name_range, symbol);
        Some(symbol)
    }

    fn lookup_value(&self, name: &Name, at: TextSize) -> Lookup {
        let chain = std::iter::successors(Some(self.scope), |&scope| self.bindings.scopes[scope].parent);
        for scope in chain {
            let data = &self.bindings.scopes[scope];
            if data.kind == ScopeKind::Class {
                continue;
            }
            let Some(symbol) = data.get(Namespace::Value, name) else { continue };
            if data.kind == ScopeKind::Block && self.bindings.symbols[symbol].visible_from > at {
                return Lookup::Forward(symbol);
            }
            return Lookup::Found(symbol);
        }
        Lookup::NotFound
    }

    fn resolve_name_ref(&mut self, node: &SyntaxNode) {
        let Some(token) = ast::NameRef::cast(node.clone()).and_then(|name_ref| name_ref.name()) else {
            return;
        };
        self.resolve_value(node, &token);
    }

    fn resolve_value(&mut self, node: &SyntaxNode, token: &SyntaxToken) {
        let Some(name) = Name::from_token(token) else { return };
        if name.is_wildcard() {
            return;
        }
        let range = token.trimmed_range();
        match self.lookup_value(&name, range.start()) {
            Lookup::Found(symbol) => {
                let resolution = Resolution { target: Target::Symbol(symbol), range };
                self.bindings.resolutions.insert(SyntaxNodePtr::new(node), resolution);
            }
            Lookup::Forward(symbol) => {
                let declared = self.bindings.symbols[symbol].name_range;
                let diagnostic = Diagnostic::new(
                    DiagnosticCode::ForwardReference,
                    format!("`{name}` is used before its declaration"),
                    range,
                )
                .with_related(declared, "declared here");
                self.bindings.diagnostics.push(diagnostic);
            }
            Lookup::NotFound => {
                let message = if self.bindings.lookup_module(Namespace::Type, &name).is_some() {
                    format!("`{name}` is a type, not a value")
                } else {
                    format!("undeclared name `{name}`")
                };
                self.error(DiagnosticCode::UndeclaredName, message, range);
            }
        }
    }

    fn resolve_qualified(
        &mut self,
        node: &SyntaxNode,
        prefix: &SyntaxToken,
        name: &SyntaxToken,
        namespace: Namespace,
    ) -> Option<ExternalSymbol> {
        let prefix_name = Name::from_token(prefix)?;
        let symbol_name = Name::from_token(name)?;

        if self.ambiguous.contains(&prefix_name) {
            self.error(
                DiagnosticCode::AmbiguousReference,
                format!("module prefix `{prefix_name}` is bound by more than one import"),
                prefix.trimmed_range(),
            );
            return None;
        }
        let Some(import) = self.bindings.lookup_module(Namespace::Module, &prefix_name) else {
            self.error(
                DiagnosticCode::UnknownModule,
                format!("no import binds the module prefix `{prefix_name}`"),
                prefix.trimmed_range(),
            );
            return None;
        };
        // An unknown module was reported at its import.
        let exports = self.imports.get(&import).cloned().flatten()?;

        let Some(symbol) = exports.get(namespace, &symbol_name) else {
            self.error(
                DiagnosticCode::UnknownModuleSymbol,
                format!("module `{}` has no symbol `{symbol_name}`", exports.module()),
                name.trimmed_range(),
            );
            return None;
        };
        let external =
            ExternalSymbol { import, module: exports.module().clone(), symbol: symbol.clone() };
        let resolution =
            Resolution { target: Target::External(external.clone()), range: name.trimmed_range() };
        self.bindings.resolutions.insert(SyntaxNodePtr::new(node), resolution);
        Some(external)
    }

    fn resolve_type_ref(&mut self, type_ref: &ast::TypeRef) -> Option<TypeName> {
        let node = type_ref.syntax();
        let token = type_ref.name()?;
        let name = Name::from_token(&token)?;

        if let Some(prefix) = type_ref.prefix() {
            let external = self.resolve_qualified(node, &prefix, &token, Namespace::Type)?;
            return Some(TypeName::new(Some(external.module), name));
        }

        let range = token.trimmed_range();
        match self.bindings.lookup_module(Namespace::Type, &name) {
            Some(symbol) => {
                let resolution = Resolution { target: Target::Symbol(symbol), range };
                self.bindings.resolutions.insert(SyntaxNodePtr::new(node), resolution);
                Some(TypeName::new(None, name))
            }
            None => {
                self.error(DiagnosticCode::UndeclaredName, format!("undeclared type `{name}`"), range);
                None
            }
        }
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, range: TextRange) {
        self.bindings.diagnostics.push(Diagnostic::new(code, message, range));
    }
}

impl TypeScope for Binder<'_> {
    fn resolve_type(&mut self, ty: &ast::TypeRef) -> Option<TypeName> {
        let ptr = SyntaxNodePtr::new(ty.syntax());
        if let Some(resolved) = self.type_refs.get(&ptr) {
            return resolved.clone();
        }
        let resolved = self.resolve_type_ref(ty);
        self.type_refs.insert(ptr, resolved.clone());
        resolved
    }
}

/// Reads type names back from finished bindings.
pub(crate) struct ResolvedTypes<'a>(pub(crate) &'a Bindings);

impl TypeScope for ResolvedTypes<'_> {
    fn resolve_type(&mut self, ty: &ast::TypeRef) -> Option<TypeName> {
        let resolution = self.0.resolution(&SyntaxNodePtr::new(ty.syntax()))?;
        match &resolution.target {
            Target::Symbol(symbol) => Some(TypeName::new(None, self.0.symbol(*symbol).name.clone())),
            Target::External(external) => {
                Some(TypeName::new(Some(external.module.clone()), external.symbol.name.clone()))
            }
        }
    }
}
