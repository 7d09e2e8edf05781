//! Type checking.
//!
//! Expressions are inferred bottom-up, optionally guided by the type the
//! context expects. An expression that fails to check is typed `Unknown`,
//! which is compatible with everything, so a single error is reported once.

mod expr;
mod ops;

use bal_errors::{Diagnostic, DiagnosticCode};
use bal_inputs::Cancellation;
use bal_parse::{Parse, Status};
use bal_yellow::ast::{
    self, AstNode as _, HasName as _, HasQualifiers as _, HasSignature as _, HasTypedBinding,
};
use bal_yellow::{SyntaxKind, SyntaxNode, SyntaxNodePtr, TextRange};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::binder::Bindings;
use crate::env::TypeEnv;
use crate::exports::ModuleLookup;
use crate::scope::{Mutability, SymbolId, SymbolKind, Target, Visibility};
use crate::ty::{FunctionTy, Ty, TyKind, TypeName};
use Expectation::{ExpectHasType, HintType, NoExpectation};

/// The inferred types of a unit's expressions and variables.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TypeCheck {
    types: FxHashMap<SyntaxNodePtr, Ty>,
    symbol_types: FxHashMap<SymbolId, Ty>,
    diagnostics: Vec<Diagnostic>,
    status: Status,
}

impl TypeCheck {
    pub fn type_of(&self, node: &SyntaxNodePtr) -> Option<&Ty> {
        self.types.get(node)
    }

    /// The type of a variable, parameter or constant, inferred for `var`.
    pub fn symbol_type(&self, symbol: SymbolId) -> Option<&Ty> {
        self.symbol_types.get(&symbol)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

pub fn check(
    parse: &Parse,
    bindings: &Bindings,
    lookup: &dyn ModuleLookup,
    cancellation: &dyn Cancellation,
) -> TypeCheck {
    let _span = tracing::debug_span!("check").entered();

    let mut checker = Checker {
        root: parse.syntax_node(),
        bindings,
        env: TypeEnv::new(bindings.types(), lookup, None),
        cancellation,
        result: TypeCheck { status: bindings.status(), ..TypeCheck::default() },
        reported: bindings.diagnostics().iter().map(Diagnostic::range).collect(),
        ret: None,
        loop_depth: 0,
        isolated: false,
        self_ty: None,
    };
    checker.check_module(&parse.module());

    let mut result = checker.result;
    result.diagnostics.sort_by_key(|diagnostic| diagnostic.range().start());
    tracing::trace!(
        types = result.types.len(),
        diagnostics = result.diagnostics.len(),
        "checked module"
    );
    result
}

#[derive(Debug, Clone)]
pub(crate) enum Expectation {
    /// The expression must be assignable to this type.
    ExpectHasType(Ty),
    /// Shapes literals and constructors without requiring anything.
    HintType(Ty),
    NoExpectation,
}

impl Expectation {
    fn ty(&self) -> Option<&Ty> {
        match self {
            ExpectHasType(ty) | HintType(ty) => Some(ty),
            NoExpectation => None,
        }
    }

    fn from_option(ty: Option<Ty>) -> Self {
        ty.map_or(NoExpectation, ExpectHasType)
    }
}

pub(crate) struct Checker<'a> {
    root: SyntaxNode,
    bindings: &'a Bindings,
    env: TypeEnv<'a>,
    cancellation: &'a dyn Cancellation,
    result: TypeCheck,
    /// Ranges the binder already reported on.
    reported: FxHashSet<TextRange>,
    /// The return type of the innermost function.
    ret: Option<Ty>,
    loop_depth: u32,
    isolated: bool,
    self_ty: Option<Ty>,
}

impl Checker<'_> {
    fn check_module(&mut self, module: &ast::Module) {
        self.check_visibility();

        let items: Vec<ast::Item> = module.items().collect();
        for item in &items {
            if self.is_cancelled() {
                return;
            }
            match item {
                ast::Item::Const(constant) => {
                    self.check_global(item, constant.initializer());
                }
                ast::Item::Var(var) => self.check_global(item, var.initializer()),
                _ => {}
            }
        }
        for item in &items {
            if let ast::Item::TypeDef(def) = item {
                self.check_type_def(def);
            }
        }
        for item in &items {
            if self.is_cancelled() {
                return;
            }
            match item {
                ast::Item::Function(function) => {
                    let signature = self.signature_of(function.name());
                    self.check_function(
                        signature,
                        function.param_list(),
                        function.body(),
                        function.is_isolated(),
                    );
                }
                ast::Item::Class(class) => self.check_class(class),
                _ => {}
            }
        }
    }

    fn is_cancelled(&mut self) -> bool {
        if self.result.status == Status::Cancelled {
            return true;
        }
        if self.cancellation.is_cancelled() {
            tracing::debug!("type checking cancelled");
            self.result.status = Status::Cancelled;
            return true;
        }
        false
    }

    /// Qualified references to symbols their module does not make public.
    fn check_visibility(&mut self) {
        let mut private: Vec<_> = self
            .bindings
            .resolutions()
            .filter_map(|(_, resolution)| match &resolution.target {
                Target::External(external)
                    if external.symbol.visibility == Visibility::ModulePrivate =>
                {
                    Some((resolution.range, external.symbol.name.clone(), external.module.clone()))
                }
                _ => None,
            })
            .collect();
        private.sort_by_key(|(range, ..)| range.start());
        for (range, name, module) in private {
            self.error(
                DiagnosticCode::NotPublic,
                format!("`{name}` is not public in module `{module}`"),
                range,
            );
        }
    }

    fn check_global(&mut self, item: &ast::Item, initializer: Option<ast::Expr>) {
        let Some(symbol) = item.name().and_then(|name| self.bindings.definition(name.trimmed_range()))
        else {
            return;
        };
        let declared = self.bindings.symbol(symbol).ty.clone();
        let ty = match (declared, initializer) {
            (Some(declared), Some(init)) => {
                self.infer_expr(&init, ExpectHasType(declared.clone()));
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => self.infer_expr(&init, NoExpectation),
            (None, None) => Ty::unknown(),
        };
        self.result.symbol_types.insert(symbol, ty);
    }

    fn check_type_def(&mut self, def: &ast::TypeDef) {
        let Some(token) = def.name() else { return };
        let bindings = self.bindings;
        let Some(symbol) = bindings.definition(token.trimmed_range()) else { return };
        let data = bindings.symbol(symbol);

        let declared = data.ty.as_ref().is_some_and(|ty| !ty.is_unknown());
        let unfolded = self.env.resolve(&Ty::named(TypeName::new(None, data.name.clone())));
        if declared && unfolded.is_unknown() && bindings.types().contains_key(&data.name) {
            self.error(
                DiagnosticCode::CyclicType,
                format!("type `{}` is defined in terms of itself", data.name),
                token.trimmed_range(),
            );
        }

        // Default values of record fields.
        let Some(ty) = def.ty() else { return };
        for field in ty.syntax().descendants().filter_map(ast::RecordField::cast) {
            if let Some(default) = field.default_value() {
                let field_ty = self.lower_opt(field.ty());
                self.infer_expr(&default, ExpectHasType(field_ty));
            }
        }
    }

    fn signature_of(&self, name: Option<bal_yellow::SyntaxToken>) -> Option<FunctionTy> {
        let symbol = self.bindings.definition(name?.trimmed_range())?;
        match self.bindings.symbol(symbol).ty.as_ref()?.kind() {
            TyKind::Function(function) => Some(function.clone()),
            _ => None,
        }
    }

    fn check_class(&mut self, class: &ast::ClassDef) {
        let Some(name) = class.name().as_ref().and_then(crate::Name::from_token) else { return };
        let saved = self.self_ty.replace(Ty::named(TypeName::new(None, name)));

        for member in class.members() {
            if self.is_cancelled() {
                break;
            }
            match member {
                ast::ClassMember::Field(field) => {
                    if let Some(init) = field.initializer() {
                        let ty = self.lower_opt(field.ty());
                        self.infer_expr(&init, ExpectHasType(ty));
                    }
                }
                ast::ClassMember::Method(method) => {
                    let signature = self.signature_of(method.name());
                    let isolated = method.is_isolated();
                    self.check_function(signature, method.param_list(), method.body(), isolated);
                }
                ast::ClassMember::Inclusion(_) => {}
            }
        }

        self.self_ty = saved;
    }

    fn check_function(
        &mut self,
        signature: Option<FunctionTy>,
        params: Option<ast::ParamList>,
        body: Option<ast::Block>,
        isolated: bool,
    ) {
        let ret = signature.as_ref().map_or_else(Ty::unknown, |signature| signature.ret.clone());
        let saved_ret = self.ret.replace(ret.clone());
        let saved_depth = std::mem::replace(&mut self.loop_depth, 0);
        let saved_isolated = std::mem::replace(&mut self.isolated, isolated);

        if let (Some(signature), Some(params)) = (&signature, params) {
            for (param, ty) in params.params().zip(&signature.params) {
                if let Some(token) = param.name()
                    && let Some(symbol) = self.bindings.definition(token.trimmed_range())
                {
                    self.result.symbol_types.insert(symbol, ty.ty.clone());
                }
                if let Some(default) = param.default_value() {
                    self.infer_expr(&default, ExpectHasType(ty.ty.clone()));
                }
            }
            if let (Some(rest), Some(ty)) = (params.rest_param(), &signature.rest)
                && let Some(token) = rest.name()
                && let Some(symbol) = self.bindings.definition(token.trimmed_range())
            {
                self.result.symbol_types.insert(symbol, Ty::array(ty.clone()));
            }
        }

        if let Some(body) = body {
            let completes = self.check_block(&body);
            if completes && self.result.status == Status::Complete && !self.env.admits_nil(&ret) {
                let close = body
                    .syntax()
                    .last_token()
                    .filter(|token| token.kind() == SyntaxKind::RIGHT_BRACE && !token.is_missing())
                    .map_or_else(|| body.syntax().trimmed_range(), |token| token.trimmed_range());
                self.error(
                    DiagnosticCode::MissingReturn,
                    format!("missing return statement: the function returns `{ret}`"),
                    close,
                );
            }
        }

        self.ret = saved_ret;
        self.loop_depth = saved_depth;
        self.isolated = saved_isolated;
    }

    /// Returns whether control can reach the end of the block.
    fn check_block(&mut self, block: &ast::Block) -> bool {
        let mut completes = true;
        let mut warned = false;
        for stmt in block.stmts() {
            if self.is_cancelled() {
                return true;
            }
            if !completes && !warned {
                warned = true;
                self.report(Diagnostic::new(
                    DiagnosticCode::UnreachableCode,
                    "unreachable code",
                    stmt.syntax().trimmed_range(),
                ));
            }
            let stmt_completes = self.check_stmt(&stmt);
            completes &= stmt_completes;
        }
        completes
    }

    fn check_stmt(&mut self, stmt: &ast::Stmt) -> bool {
        match stmt {
            ast::Stmt::LocalVar(local) => {
                self.check_local(local);
                true
            }
            ast::Stmt::Assign(assign) => {
                let target = self.check_assign_target(assign.lhs());
                match (target, assign.rhs()) {
                    (Some(target), Some(rhs)) => {
                        self.infer_expr(&rhs, ExpectHasType(target));
                    }
                    (None, Some(rhs)) => {
                        self.infer_expr(&rhs, NoExpectation);
                    }
                    (_, None) => {}
                }
                true
            }
            ast::Stmt::CompoundAssign(assign) => {
                let target = self.check_assign_target(assign.lhs()).unwrap_or_else(Ty::unknown);
                let rhs = assign.rhs();
                let rhs_ty = self.infer_opt(rhs.as_ref(), HintType(target.clone()));
                if let Some(op) = assign.op() {
                    let range = stmt.syntax().trimmed_range();
                    let result = self.binary_result(op, &target, &rhs_ty, range);
                    if !self.env.is_assignable(&result, &target) {
                        self.mismatch(&target, &result, range);
                    }
                }
                true
            }
            ast::Stmt::If(if_stmt) => self.check_if(if_stmt),
            ast::Stmt::While(while_stmt) => {
                let condition = while_stmt.condition();
                self.infer_opt(condition.as_ref(), ExpectHasType(Ty::boolean()));
                if let Some(body) = while_stmt.body() {
                    self.loop_depth += 1;
                    self.check_block(&body);
                    self.loop_depth -= 1;
                }
                let forever = matches!(
                    &condition,
                    Some(ast::Expr::Literal(literal)) if literal.syntax().text_trimmed() == "true"
                );
                !forever || while_stmt.body().is_some_and(|body| breaks_out(body.syntax()))
            }
            ast::Stmt::Foreach(foreach) => {
                let iterable = foreach.iterable();
                let iterable_ty = self.infer_opt(iterable.as_ref(), NoExpectation);
                let range = iterable.map_or_else(
                    || foreach.syntax().trimmed_range(),
                    |iterable| iterable.syntax().trimmed_range(),
                );
                let element = self.element_type(&iterable_ty, range);
                self.bind_variable(foreach, element, range);
                if let Some(body) = foreach.body() {
                    self.loop_depth += 1;
                    self.check_block(&body);
                    self.loop_depth -= 1;
                }
                true
            }
            ast::Stmt::Return(ret) => {
                let expected = self.ret.clone().unwrap_or_else(Ty::unknown);
                match ret.expr() {
                    Some(expr) => {
                        self.infer_expr(&expr, ExpectHasType(expected));
                    }
                    None if !self.env.admits_nil(&expected) => {
                        self.mismatch(&expected, &Ty::nil(), ret.syntax().trimmed_range());
                    }
                    None => {}
                }
                false
            }
            ast::Stmt::Break(_) | ast::Stmt::Continue(_) => {
                if self.loop_depth == 0 {
                    let keyword = if matches!(stmt, ast::Stmt::Break(_)) { "break" } else { "continue" };
                    self.error(
                        DiagnosticCode::LoopControlOutsideLoop,
                        format!("`{keyword}` outside of a loop"),
                        stmt.syntax().trimmed_range(),
                    );
                }
                false
            }
            ast::Stmt::Panic(panic) => {
                let expr = panic.expr();
                let ty = self.infer_opt(expr.as_ref(), NoExpectation);
                if let Some(expr) = expr
                    && !self.env.is_assignable(&ty, &Ty::error())
                {
                    self.error(
                        DiagnosticCode::InvalidPanicOperand,
                        format!("`panic` expects an error, found `{ty}`"),
                        expr.syntax().trimmed_range(),
                    );
                }
                false
            }
            ast::Stmt::Lock(lock) => lock.body().is_none_or(|body| self.check_block(&body)),
            ast::Stmt::Transaction(transaction) => {
                transaction.body().is_none_or(|body| self.check_block(&body))
            }
            ast::Stmt::Commit(_) => true,
            ast::Stmt::Rollback(rollback) => {
                let expr = rollback.expr();
                self.infer_opt(expr.as_ref(), ExpectHasType(Ty::optional(Ty::error())));
                true
            }
            ast::Stmt::Expr(expr_stmt) => {
                let Some(expr) = expr_stmt.expr() else { return true };
                if !is_statement_expr(&expr) {
                    self.error(
                        DiagnosticCode::InvalidExprStmt,
                        "this expression cannot be used as a statement",
                        expr.syntax().trimmed_range(),
                    );
                }
                let ty = self.infer_expr(&expr, NoExpectation);
                ty.as_primitive() != Some(crate::ty::Primitive::Never)
            }
            ast::Stmt::Block(block) => self.check_block(block),
        }
    }

    fn check_if(&mut self, if_stmt: &ast::IfStmt) -> bool {
        let condition = if_stmt.condition();
        self.infer_opt(condition.as_ref(), ExpectHasType(Ty::boolean()));
        let then_completes = if_stmt.then_branch().is_none_or(|block| self.check_block(&block));
        let else_completes = match if_stmt.else_clause() {
            Some(clause) => match (clause.if_stmt(), clause.block()) {
                (Some(nested), _) => self.check_if(&nested),
                (None, Some(block)) => self.check_block(&block),
                (None, None) => true,
            },
            None => true,
        };
        then_completes || else_completes
    }

    fn check_local(&mut self, local: &ast::LocalVarDecl) {
        let Some(symbol) = local.name().and_then(|name| self.bindings.definition(name.trimmed_range()))
        else {
            if let Some(init) = local.initializer() {
                self.infer_expr(&init, NoExpectation);
            }
            return;
        };
        let declared = self.bindings.symbol(symbol).ty.clone();
        let ty = match (declared, local.initializer()) {
            (Some(declared), Some(init)) => {
                self.infer_expr(&init, ExpectHasType(declared.clone()));
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => self.infer_expr(&init, NoExpectation),
            (None, None) => Ty::unknown(),
        };
        self.result.symbol_types.insert(symbol, ty);
    }

    /// Types the variable of a `foreach` or `from` from the element type.
    fn bind_variable(&mut self, binding: &impl HasTypedBinding, element: Ty, range: TextRange) {
        let Some(symbol) =
            binding.name().and_then(|name| self.bindings.definition(name.trimmed_range()))
        else {
            return;
        };
        let ty = match self.bindings.symbol(symbol).ty.clone() {
            Some(declared) => {
                if !self.env.is_assignable(&element, &declared) {
                    self.mismatch(&declared, &element, range);
                }
                declared
            }
            None => element,
        };
        self.result.symbol_types.insert(symbol, ty);
    }

    /// Checks that `lhs` can be assigned to and returns its type. `_`
    /// accepts anything and has no type.
    fn check_assign_target(&mut self, lhs: Option<ast::Expr>) -> Option<Ty> {
        let lhs = lhs?;
        match &lhs {
            ast::Expr::NameRef(name_ref) => {
                let token = name_ref.name()?;
                if crate::Name::from_token(&token).is_some_and(|name| name.is_wildcard()) {
                    return None;
                }
                let bindings = self.bindings;
                if let Some(symbol) = bindings.resolved_symbol(name_ref.syntax()) {
                    let data = bindings.symbol(symbol);
                    let reason = match (data.kind, data.mutability) {
                        (SymbolKind::Parameter, _) => Some("a parameter"),
                        (SymbolKind::Constant, _) | (_, Mutability::Constant) => {
                            Some("a constant")
                        }
                        (_, Mutability::Final) => Some("final"),
                        _ => None,
                    };
                    if let Some(reason) = reason {
                        self.error(
                            DiagnosticCode::AssignToImmutable,
                            format!("cannot assign to `{}`: it is {reason}", data.name),
                            token.trimmed_range(),
                        );
                    }
                }
            }
            ast::Expr::QualifiedNameRef(_)
            | ast::Expr::FieldAccess(_)
            | ast::Expr::MemberAccess(_) => {}
            _ => {
                self.error(
                    DiagnosticCode::InvalidAssignTarget,
                    "invalid assignment target",
                    lhs.syntax().trimmed_range(),
                );
                self.infer_expr(&lhs, NoExpectation);
                return None;
            }
        }
        Some(self.infer_expr(&lhs, NoExpectation))
    }

    fn lower_opt(&self, ty: Option<ast::Type>) -> Ty {
        crate::lower::lower_opt(&mut crate::binder::ResolvedTypes(self.bindings), ty)
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, range: TextRange) {
        self.report(Diagnostic::new(code, message, range));
    }

    fn mismatch(&mut self, expected: &Ty, found: &Ty, range: TextRange) {
        self.error(
            DiagnosticCode::TypeMismatch,
            format!("expected `{expected}`, found `{found}`"),
            range,
        );
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if !self.reported.contains(&diagnostic.range()) {
            self.result.diagnostics.push(diagnostic);
        }
    }
}

/// Calls, possibly under `check`, are the only expressions allowed as
/// statements.
fn is_statement_expr(expr: &ast::Expr) -> bool {
    match expr {
        ast::Expr::Call(_) | ast::Expr::MethodCall(_) => true,
        ast::Expr::Check(check) => check.expr().as_ref().is_some_and(is_statement_expr),
        _ => false,
    }
}

/// Whether a `break` inside `body` leaves the loop `body` belongs to.
fn breaks_out(body: &SyntaxNode) -> bool {
    let mut preorder = body.preorder();
    while let Some(event) = preorder.next() {
        let bal_yellow::WalkEvent::Enter(node) = event else { continue };
        match node.kind() {
            SyntaxKind::BREAK_STMT => return true,
            SyntaxKind::WHILE_STMT
            | SyntaxKind::FOREACH_STMT
            | SyntaxKind::ANON_FUNCTION
            | SyntaxKind::ARROW_FUNCTION => preorder.skip_subtree(),
            _ => {}
        }
    }
    false
}
