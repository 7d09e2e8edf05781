use bal_errors::{Diagnostic, DiagnosticCode};
use bal_yellow::ast::{self, AstNode as _, HasName as _, HasQualifiers as _, HasSignature as _};
use bal_yellow::{SyntaxNode, SyntaxNodePtr, TextRange};

use super::{Checker, Expectation, ops};
use crate::Name;
use crate::binder::ResolvedTypes;
use crate::env::RecordParts;
use crate::lower;
use crate::scope::{Mutability, Namespace, SymbolId, SymbolKind, Target};
use crate::ty::{FunctionTy, ParamTy, Primitive, RecordTy, Ty, TyKind, TypeName};
use Expectation::{ExpectHasType, HintType, NoExpectation};

/// What a mapping constructor builds.
enum MappingTarget {
    Record(Ty, RecordParts),
    Map(Ty, Ty),
}

/// How `new` finds the initializer of the class it instantiates.
enum Instantiable {
    Local(ast::ClassDef),
    External,
}

impl Checker<'_> {
    pub(super) fn infer_expr(&mut self, expr: &ast::Expr, expected: Expectation) -> Ty {
        let ty = self.infer_expr_inner(expr, &expected);
        if let ExpectHasType(target) = &expected
            && !self.env.is_assignable(&ty, target)
        {
            self.mismatch(target, &ty, expr.syntax().trimmed_range());
        }
        self.record(expr, ty.clone());
        ty
    }

    pub(super) fn infer_opt(&mut self, expr: Option<&ast::Expr>, expected: Expectation) -> Ty {
        match expr {
            Some(expr) => self.infer_expr(expr, expected),
            None => Ty::unknown(),
        }
    }

    fn record(&mut self, expr: &ast::Expr, ty: Ty) {
        self.result.types.insert(SyntaxNodePtr::new(expr.syntax()), ty);
    }

    fn infer_expr_inner(&mut self, expr: &ast::Expr, expected: &Expectation) -> Ty {
        match expr {
            ast::Expr::Literal(literal) => self.infer_literal(literal, expected),
            ast::Expr::Nil(_) => Ty::nil(),
            ast::Expr::NameRef(_) | ast::Expr::QualifiedNameRef(_) => {
                self.infer_name(expr.syntax())
            }
            ast::Expr::SelfRef(_) => self.self_ty.clone().unwrap_or_else(Ty::unknown),
            ast::Expr::Paren(paren) => match paren.expr() {
                Some(inner) => {
                    let ty = self.infer_expr_inner(&inner, &hint(expected));
                    self.record(&inner, ty.clone());
                    ty
                }
                None => Ty::unknown(),
            },
            ast::Expr::Binary(binary) => self.infer_binary(binary, expr, expected),
            ast::Expr::Unary(unary) => {
                let op = unary.op();
                let operand_expected = match op {
                    Some(ast::UnaryOp::Not) => HintType(Ty::boolean()),
                    _ => hint(expected),
                };
                let ty = self.infer_opt(unary.expr().as_ref(), operand_expected);
                let Some(op) = op else { return Ty::unknown() };
                match ops::unary(&self.env, op, &ty) {
                    Some(ty) => ty,
                    None => {
                        self.error(
                            DiagnosticCode::InvalidOperator,
                            format!("operator `{}` cannot be applied to `{ty}`", op.as_str()),
                            expr.syntax().trimmed_range(),
                        );
                        Ty::unknown()
                    }
                }
            }
            ast::Expr::Conditional(conditional) => {
                let condition = conditional.condition();
                self.infer_opt(condition.as_ref(), ExpectHasType(Ty::boolean()));
                let then_ty = self.infer_opt(conditional.then_expr().as_ref(), hint(expected));
                let else_ty = self.infer_opt(conditional.else_expr().as_ref(), hint(expected));
                Ty::union([then_ty, else_ty])
            }
            ast::Expr::TypeTest(test) => {
                self.infer_opt(test.expr().as_ref(), NoExpectation);
                Ty::boolean()
            }
            ast::Expr::TypeOf(type_of) => {
                self.infer_opt(type_of.expr().as_ref(), NoExpectation);
                Ty::primitive(Primitive::Typedesc)
            }
            ast::Expr::Check(check) => {
                let ty = self.infer_opt(check.expr().as_ref(), NoExpectation);
                let may_fail = self.env.may_be_error(&ty);
                if !self.env.resolve(&ty).is_unknown() && !may_fail {
                    let keyword = if check.is_panic() { "checkpanic" } else { "check" };
                    self.report(Diagnostic::new(
                        DiagnosticCode::UnnecessaryCheck,
                        format!("`{keyword}` is unnecessary: `{ty}` cannot be an error"),
                        expr.syntax().trimmed_range(),
                    ));
                } else if may_fail && !check.is_panic() {
                    self.check_error_return(expr.syntax().trimmed_range());
                }
                self.env.strip_error(&ty)
            }
            ast::Expr::Trap(trap) => {
                let ty = self.infer_opt(trap.expr().as_ref(), hint(expected));
                Ty::union([ty, Ty::error()])
            }
            ast::Expr::Cast(cast) => {
                let target = self.lower_opt(cast.ty());
                let operand = cast.expr();
                let ty = self.infer_opt(operand.as_ref(), HintType(target.clone()));
                if let Some(operand) = operand
                    && !self.castable(&ty, &target)
                {
                    self.error(
                        DiagnosticCode::InvalidCast,
                        format!("cannot cast `{ty}` to `{target}`"),
                        operand.syntax().trimmed_range(),
                    );
                }
                target
            }
            ast::Expr::Call(call) => self.infer_call(call, expr),
            ast::Expr::MethodCall(call) => self.infer_method_call(call, expr),
            ast::Expr::FieldAccess(access) => {
                let receiver_ty = self.infer_opt(access.receiver().as_ref(), NoExpectation);
                let Some(token) = access.name() else { return Ty::unknown() };
                let Some(name) = Name::from_token(&token) else { return Ty::unknown() };
                self.field_type(&receiver_ty, &name, token.trimmed_range())
            }
            ast::Expr::OptionalFieldAccess(access) => {
                let receiver_ty = self.infer_opt(access.receiver().as_ref(), NoExpectation);
                let Some(token) = access.name() else { return Ty::unknown() };
                let Some(name) = Name::from_token(&token) else { return Ty::unknown() };
                let present = self.env.strip_nil(&receiver_ty);
                Ty::optional(self.field_type(&present, &name, token.trimmed_range()))
            }
            ast::Expr::MemberAccess(access) => self.infer_member_access(access),
            ast::Expr::List(list) => self.infer_list(list, expected),
            ast::Expr::Mapping(mapping) => self.infer_mapping(mapping, expected),
            ast::Expr::New(new) => self.infer_new(new, expr, expected),
            ast::Expr::ErrorConstructor(constructor) => {
                let args = args(constructor.arg_list());
                if args.is_empty() {
                    let range = constructor
                        .arg_list()
                        .map_or_else(|| expr.syntax().trimmed_range(), |list| list.syntax().trimmed_range());
                    self.error(
                        DiagnosticCode::ArityMismatch,
                        "expected at least 1 argument(s), found 0",
                        range,
                    );
                }
                for (index, arg) in args.iter().enumerate() {
                    let expected = match index {
                        0 => ExpectHasType(Ty::string()),
                        1 => ExpectHasType(Ty::optional(Ty::error())),
                        _ => NoExpectation,
                    };
                    self.infer_expr(arg, expected);
                }
                Ty::error()
            }
            ast::Expr::AnonFunction(function) => {
                let signature = lower::signature(&mut ResolvedTypes(self.bindings), function);
                self.check_function(
                    Some(signature.clone()),
                    function.param_list(),
                    function.body(),
                    function.is_isolated(),
                );
                Ty::new(TyKind::Function(signature))
            }
            ast::Expr::ArrowFunction(arrow) => self.infer_arrow(arrow, expected),
            ast::Expr::StringTemplate(template) => {
                for interpolation in template.interpolations() {
                    self.infer_opt(interpolation.expr().as_ref(), NoExpectation);
                }
                Ty::string()
            }
            ast::Expr::XmlTemplate(template) => {
                for interpolation in template.interpolations() {
                    self.infer_opt(interpolation.expr().as_ref(), NoExpectation);
                }
                Ty::primitive(Primitive::Xml)
            }
            ast::Expr::Query(query) => self.infer_query(query, expected),
        }
    }

    fn infer_literal(&self, literal: &ast::Literal, expected: &Expectation) -> Ty {
        let primitive = match literal.kind() {
            Some(ast::LiteralKind::Int | ast::LiteralKind::HexInt) => {
                let fits_byte = literal
                    .token()
                    .and_then(|token| int_value(token.text_trimmed()))
                    .is_some_and(|value| value <= 255);
                let candidates: &[Primitive] = if fits_byte {
                    &[Primitive::Int, Primitive::Byte, Primitive::Float, Primitive::Decimal]
                } else {
                    &[Primitive::Int, Primitive::Float, Primitive::Decimal]
                };
                self.narrow_literal(candidates, expected).unwrap_or(Primitive::Int)
            }
            Some(ast::LiteralKind::Float) => self
                .narrow_literal(&[Primitive::Float, Primitive::Decimal], expected)
                .unwrap_or(Primitive::Float),
            Some(ast::LiteralKind::HexFloat) => Primitive::Float,
            Some(ast::LiteralKind::Decimal) => Primitive::Decimal,
            Some(ast::LiteralKind::String) => Primitive::String,
            Some(ast::LiteralKind::Boolean) => Primitive::Boolean,
            Some(ast::LiteralKind::Null) => Primitive::Nil,
            None => return Ty::unknown(),
        };
        Ty::primitive(primitive)
    }

    /// The first candidate the expected type accepts.
    fn narrow_literal(&self, candidates: &[Primitive], expected: &Expectation) -> Option<Primitive> {
        let target = expected.ty()?;
        if self.env.resolve(target).is_unknown() {
            return None;
        }
        candidates
            .iter()
            .copied()
            .find(|candidate| self.env.is_assignable(&Ty::primitive(*candidate), target))
    }

    /// The type of a name reference, or of a `{name}` mapping field.
    fn infer_name(&mut self, node: &SyntaxNode) -> Ty {
        let bindings = self.bindings;
        let Some(resolution) = bindings.resolution(&SyntaxNodePtr::new(node)) else {
            return Ty::unknown();
        };
        match &resolution.target {
            Target::Symbol(symbol) => {
                let data = bindings.symbol(*symbol);
                let global = data.scope == bindings.module_scope();
                if global
                    && data.kind == SymbolKind::Variable
                    && data.mutability == Mutability::Mutable
                    && !data.isolated
                {
                    self.check_isolated_access(&data.name, resolution.range);
                }
                self.symbol_ty(*symbol)
            }
            Target::External(external) => {
                let symbol = &external.symbol;
                if symbol.kind == SymbolKind::Variable
                    && symbol.mutability == Mutability::Mutable
                    && !symbol.isolated
                {
                    self.check_isolated_access(&symbol.name, resolution.range);
                }
                symbol.ty.clone().unwrap_or_else(Ty::unknown)
            }
        }
    }

    fn check_isolated_access(&mut self, name: &Name, range: TextRange) {
        if self.isolated {
            self.error(
                DiagnosticCode::IsolationViolation,
                format!("isolated code cannot access the mutable module-level variable `{name}`"),
                range,
            );
        }
    }

    fn symbol_ty(&self, symbol: SymbolId) -> Ty {
        self.result
            .symbol_types
            .get(&symbol)
            .cloned()
            .or_else(|| self.bindings.symbol(symbol).ty.clone())
            .unwrap_or_else(Ty::unknown)
    }

    fn infer_binary(
        &mut self,
        binary: &ast::BinaryExpr,
        expr: &ast::Expr,
        expected: &Expectation,
    ) -> Ty {
        let op = binary.op();
        let arithmetic = matches!(
            op,
            Some(
                ast::BinaryOp::Add
                    | ast::BinaryOp::Sub
                    | ast::BinaryOp::Mul
                    | ast::BinaryOp::Div
                    | ast::BinaryOp::Rem
            )
        );
        let lhs_expected = if arithmetic { hint(expected) } else { NoExpectation };
        let lhs_ty = self.infer_opt(binary.lhs().as_ref(), lhs_expected);
        let rhs_expected = match op {
            Some(ast::BinaryOp::Elvis) => hint(expected),
            Some(ast::BinaryOp::And | ast::BinaryOp::Or) => NoExpectation,
            _ => HintType(self.env.strip_nil(&lhs_ty)),
        };
        let rhs_ty = self.infer_opt(binary.rhs().as_ref(), rhs_expected);

        let Some(op) = op else { return Ty::unknown() };
        let range = binary.op_range().unwrap_or_else(|| expr.syntax().trimmed_range());
        self.binary_result(op, &lhs_ty, &rhs_ty, range)
    }

    pub(super) fn binary_result(
        &mut self,
        op: ast::BinaryOp,
        lhs: &Ty,
        rhs: &Ty,
        range: TextRange,
    ) -> Ty {
        match ops::binary(&self.env, op, lhs, rhs) {
            Some(ty) => ty,
            None => {
                self.error(
                    DiagnosticCode::InvalidOperator,
                    format!("operator `{}` cannot be applied to `{lhs}` and `{rhs}`", op.as_str()),
                    range,
                );
                ops::fallback(op)
            }
        }
    }

    /// `check` hands errors to the enclosing function, so its return type
    /// must admit them.
    fn check_error_return(&mut self, range: TextRange) {
        let Some(ret) = self.ret.clone() else { return };
        if self.env.resolve(&ret).is_unknown() || self.env.is_assignable(&Ty::error(), &ret) {
            return;
        }
        self.error(
            DiagnosticCode::InvalidCheck,
            format!("`check` cannot return an error from a function returning `{ret}`"),
            range,
        );
    }

    fn castable(&self, from: &Ty, to: &Ty) -> bool {
        let env = &self.env;
        if env.is_assignable(from, to) || env.is_assignable(to, from) {
            return true;
        }
        let numeric = |ty: &Ty| {
            env.members(ty)
                .iter()
                .filter(|member| !member.is_nil())
                .all(|member| member.as_primitive().is_some_and(Primitive::is_numeric))
        };
        if numeric(from) && numeric(to) {
            return true;
        }
        env.members(from).iter().any(|member| {
            env.is_assignable(member, to) || env.is_assignable(to, member)
        })
    }

    fn infer_call(&mut self, call: &ast::CallExpr, expr: &ast::Expr) -> Ty {
        let callee = call.callee();
        let callee_ty = self.infer_opt(callee.as_ref(), NoExpectation);
        let args = args(call.arg_list());
        let range = call
            .arg_list()
            .map_or_else(|| expr.syntax().trimmed_range(), |list| list.syntax().trimmed_range());

        if self.isolated
            && let Some(callee) = &callee
        {
            self.check_isolated_call(callee);
        }

        match self.env.resolve(&callee_ty).kind() {
            TyKind::Function(function) => {
                let function = function.clone();
                self.check_args(&function, &args, range);
                function.ret
            }
            TyKind::Unknown => {
                self.infer_args(&args);
                Ty::unknown()
            }
            _ => {
                let callee_range =
                    callee.map_or(range, |callee| callee.syntax().trimmed_range());
                self.error(
                    DiagnosticCode::NotCallable,
                    format!("`{callee_ty}` is not callable"),
                    callee_range,
                );
                self.infer_args(&args);
                Ty::unknown()
            }
        }
    }

    fn check_isolated_call(&mut self, callee: &ast::Expr) {
        let bindings = self.bindings;
        let Some(resolution) = bindings.resolution(&SyntaxNodePtr::new(callee.syntax())) else {
            return;
        };
        let (name, isolated) = match &resolution.target {
            Target::Symbol(symbol) => {
                let data = bindings.symbol(*symbol);
                if data.kind != SymbolKind::Function {
                    return;
                }
                (&data.name, data.isolated)
            }
            Target::External(external) => {
                if external.symbol.kind != SymbolKind::Function {
                    return;
                }
                (&external.symbol.name, external.symbol.isolated)
            }
        };
        if !isolated {
            self.error(
                DiagnosticCode::IsolationViolation,
                format!("isolated code cannot call the non-isolated function `{name}`"),
                resolution.range,
            );
        }
    }

    fn check_args(&mut self, function: &FunctionTy, args: &[ast::Expr], range: TextRange) {
        let required = function.required_params();
        let max = function.params.len();
        let found = args.len();
        if found < required || (function.rest.is_none() && found > max) {
            let expected = if function.rest.is_some() {
                format!("at least {required}")
            } else if required == max {
                max.to_string()
            } else {
                format!("{required} to {max}")
            };
            self.error(
                DiagnosticCode::ArityMismatch,
                format!("expected {expected} argument(s), found {found}"),
                range,
            );
        }
        for (index, arg) in args.iter().enumerate() {
            let expected = match function.params.get(index) {
                Some(param) => Some(param.ty.clone()),
                None => function.rest.clone(),
            };
            self.infer_expr(arg, Expectation::from_option(expected));
        }
    }

    fn infer_args(&mut self, args: &[ast::Expr]) {
        for arg in args {
            self.infer_expr(arg, NoExpectation);
        }
    }

    fn infer_method_call(&mut self, call: &ast::MethodCallExpr, expr: &ast::Expr) -> Ty {
        let receiver_ty = self.infer_opt(call.receiver().as_ref(), NoExpectation);
        let args = args(call.arg_list());
        let range = call
            .arg_list()
            .map_or_else(|| expr.syntax().trimmed_range(), |list| list.syntax().trimmed_range());
        let Some(token) = call.name() else {
            self.infer_args(&args);
            return Ty::unknown();
        };
        let Some(name) = Name::from_token(&token) else {
            self.infer_args(&args);
            return Ty::unknown();
        };
        if self.env.resolve(&receiver_ty).is_unknown() {
            self.infer_args(&args);
            return Ty::unknown();
        }

        if let Some(object) = self.env.object_parts(&receiver_ty) {
            let method = object.method(name.as_str()).map(|method| method.ty.clone()).or_else(|| {
                let field = object.field(name.as_str())?;
                match self.env.resolve(&field.ty).kind() {
                    TyKind::Function(function) => Some(function.clone()),
                    _ => None,
                }
            });
            if let Some(method) = method {
                self.check_args(&method, &args, range);
                return method.ret;
            }
        }
        if let Some(method) = self.lang_method(&receiver_ty, &name) {
            self.check_args(&method, &args, range);
            return method.ret;
        }

        self.error(
            DiagnosticCode::UnknownMethod,
            format!("no method `{name}` on `{receiver_ty}`"),
            token.trimmed_range(),
        );
        self.infer_args(&args);
        Ty::unknown()
    }

    /// Methods every value of a basic type has.
    fn lang_method(&self, receiver: &Ty, name: &Name) -> Option<FunctionTy> {
        let resolved = self.env.resolve(receiver);
        let method = |params: Vec<Ty>, ret: Ty| FunctionTy {
            params: params.into_iter().map(|ty| ParamTy { ty, has_default: false }).collect(),
            rest: None,
            ret,
        };
        Some(match (name.as_str(), resolved.kind()) {
            ("toString", _) => method(vec![], Ty::string()),
            (
                "length",
                TyKind::Array(_)
                | TyKind::Map(_)
                | TyKind::Table(_)
                | TyKind::Record(_)
                | TyKind::Primitive(Primitive::String | Primitive::Xml),
            ) => method(vec![], Ty::int()),
            ("push", TyKind::Array(element)) => FunctionTy {
                params: Vec::new(),
                rest: Some(element.clone()),
                ret: Ty::nil(),
            },
            ("pop", TyKind::Array(element)) => method(vec![], element.clone()),
            ("keys", TyKind::Map(_) | TyKind::Record(_)) => {
                method(vec![], Ty::array(Ty::string()))
            }
            ("hasKey", TyKind::Map(_) | TyKind::Record(_)) => {
                method(vec![Ty::string()], Ty::boolean())
            }
            ("get", TyKind::Map(value)) => method(vec![Ty::string()], value.clone()),
            ("toUpperAscii" | "toLowerAscii" | "trim", TyKind::Primitive(Primitive::String)) => {
                method(vec![], Ty::string())
            }
            ("message", TyKind::Error(_)) => method(vec![], Ty::string()),
            _ => return None,
        })
    }

    fn field_type(&mut self, receiver: &Ty, name: &Name, range: TextRange) -> Ty {
        let resolved = self.env.resolve(receiver);
        if resolved.is_unknown() {
            return Ty::unknown();
        }
        if let Some(parts) = self.env.record_parts(receiver) {
            if let Some(field) = parts.field(name.as_str()) {
                return if field.optional { Ty::optional(field.ty.clone()) } else { field.ty.clone() };
            }
        } else if let Some(object) = self.env.object_parts(receiver) {
            if let Some(field) = object.field(name.as_str()) {
                return field.ty.clone();
            }
            if let Some(method) = object.method(name.as_str()) {
                return Ty::new(TyKind::Function(method.ty.clone()));
            }
        } else if let TyKind::Map(value) = resolved.kind() {
            return value.clone();
        } else if resolved.as_primitive() == Some(Primitive::Json) {
            return resolved;
        }
        self.error(
            DiagnosticCode::UnknownField,
            format!("no field `{name}` on `{receiver}`"),
            range,
        );
        Ty::unknown()
    }

    fn infer_member_access(&mut self, access: &ast::MemberAccessExpr) -> Ty {
        let receiver = access.receiver();
        let receiver_ty = self.infer_opt(receiver.as_ref(), NoExpectation);
        let index = access.index();
        let resolved = self.env.resolve(&receiver_ty);
        match resolved.kind() {
            TyKind::Unknown => {
                self.infer_opt(index.as_ref(), NoExpectation);
                Ty::unknown()
            }
            TyKind::Array(element) => {
                self.infer_opt(index.as_ref(), ExpectHasType(Ty::int()));
                element.clone()
            }
            TyKind::Map(value) => {
                self.infer_opt(index.as_ref(), ExpectHasType(Ty::string()));
                Ty::optional(value.clone())
            }
            TyKind::Table(row) => {
                self.infer_opt(index.as_ref(), NoExpectation);
                Ty::optional(row.clone())
            }
            TyKind::Primitive(Primitive::String) => {
                self.infer_opt(index.as_ref(), ExpectHasType(Ty::int()));
                Ty::string()
            }
            TyKind::Primitive(Primitive::Json) => {
                self.infer_opt(index.as_ref(), NoExpectation);
                resolved.clone()
            }
            TyKind::Record(_) => {
                self.infer_opt(index.as_ref(), ExpectHasType(Ty::string()));
                let Some(parts) = self.env.record_parts(&receiver_ty) else {
                    return Ty::unknown();
                };
                let key = match &index {
                    Some(ast::Expr::Literal(literal))
                        if literal.kind() == Some(ast::LiteralKind::String) =>
                    {
                        literal.token().map(|token| token.text_trimmed().trim_matches('"').to_owned())
                    }
                    _ => None,
                };
                if let Some(field) = key.as_deref().and_then(|key| parts.field(key)) {
                    return if field.optional {
                        Ty::optional(field.ty.clone())
                    } else {
                        field.ty.clone()
                    };
                }
                let values = parts.fields.iter().map(|field| field.ty.clone()).chain(parts.rest);
                Ty::optional(Ty::union(values))
            }
            _ => {
                let range = receiver
                    .map_or_else(|| access.syntax().trimmed_range(), |receiver| {
                        receiver.syntax().trimmed_range()
                    });
                self.error(
                    DiagnosticCode::NotIndexable,
                    format!("`{receiver_ty}` cannot be indexed"),
                    range,
                );
                self.infer_opt(index.as_ref(), NoExpectation);
                Ty::unknown()
            }
        }
    }

    fn infer_list(&mut self, list: &ast::ListConstructor, expected: &Expectation) -> Ty {
        let elements: Vec<ast::Expr> = list.elements().collect();
        let arrays: Vec<Ty> = expected
            .ty()
            .map(|target| {
                self.env
                    .members(target)
                    .into_iter()
                    .filter(|member| matches!(member.kind(), TyKind::Array(_)))
                    .collect()
            })
            .unwrap_or_default();

        if let [array] = arrays.as_slice()
            && let TyKind::Array(element) = array.kind()
        {
            for item in &elements {
                self.infer_expr(item, same_strength(expected, element.clone()));
            }
            return array.clone();
        }

        let types: Vec<Ty> =
            elements.iter().map(|item| self.infer_expr(item, NoExpectation)).collect();
        Ty::array(Ty::union(types))
    }

    fn mapping_target(&self, target: &Ty) -> Option<MappingTarget> {
        let resolved = self.env.resolve(target);
        let mut candidates = self.env.members(target).into_iter().filter_map(|member| {
            if let Some(parts) = self.env.record_parts(&member) {
                return Some(MappingTarget::Record(member, parts));
            }
            match member.kind() {
                TyKind::Map(value) => Some(MappingTarget::Map(member.clone(), value.clone())),
                TyKind::Primitive(Primitive::Json | Primitive::Anydata | Primitive::Any) => {
                    Some(MappingTarget::Map(member.clone(), member.clone()))
                }
                _ => None,
            }
        });
        let candidate = candidates.next()?;
        if candidates.next().is_some() {
            return None;
        }
        // Keep the name of a directly named target for display.
        Some(match candidate {
            MappingTarget::Record(_, parts) if matches!(resolved.kind(), TyKind::Record(_)) => {
                MappingTarget::Record(target.clone(), parts)
            }
            MappingTarget::Map(_, value) if matches!(resolved.kind(), TyKind::Map(_)) => {
                MappingTarget::Map(target.clone(), value)
            }
            candidate => candidate,
        })
    }

    fn infer_mapping(&mut self, mapping: &ast::MappingConstructor, expected: &Expectation) -> Ty {
        let strict = matches!(expected, ExpectHasType(_));
        let target = expected.ty().and_then(|target| self.mapping_target(target));
        let mut fields: Vec<crate::ty::Field> = Vec::new();

        for field in mapping.fields() {
            let Some(key) = field.key() else { continue };
            let key_range = field
                .key_token()
                .map_or_else(|| field.syntax().trimmed_range(), |token| token.trimmed_range());

            let field_expected = match &target {
                Some(MappingTarget::Record(record, parts)) => match parts.field(&key) {
                    Some(declared) => Some(declared.ty.clone()),
                    None => match &parts.rest {
                        Some(rest) => Some(rest.clone()),
                        None => {
                            if strict {
                                self.error(
                                    DiagnosticCode::UnknownField,
                                    format!("no field `{key}` in `{record}`"),
                                    key_range,
                                );
                            }
                            None
                        }
                    },
                },
                Some(MappingTarget::Map(_, value)) => Some(value.clone()),
                None => None,
            };

            let ty = if field.is_shorthand() {
                let ty = self.infer_name(field.syntax());
                if strict
                    && let Some(expected) = &field_expected
                    && !self.env.is_assignable(&ty, expected)
                {
                    self.mismatch(expected, &ty, field.syntax().trimmed_range());
                }
                ty
            } else {
                let expectation = match field_expected {
                    Some(ty) => same_strength(expected, ty),
                    None => NoExpectation,
                };
                self.infer_opt(field.value().as_ref(), expectation)
            };

            if !fields.iter().any(|existing| existing.name.as_str() == key) {
                fields.push(crate::ty::Field::new(Name::new(&key), ty));
            }
        }

        match target {
            Some(MappingTarget::Record(record, parts)) => {
                if strict {
                    for required in &parts.fields {
                        let missing = !required.optional
                            && !required.has_default
                            && !fields.iter().any(|field| field.name == required.name);
                        if missing {
                            self.error(
                                DiagnosticCode::MissingRequiredField,
                                format!("missing required field `{}` of `{record}`", required.name),
                                mapping.syntax().trimmed_range(),
                            );
                        }
                    }
                }
                record
            }
            Some(MappingTarget::Map(map, _)) => map,
            None => Ty::new(TyKind::Record(RecordTy {
                fields,
                rest: None,
                closed: true,
                includes: Vec::new(),
            })),
        }
    }

    fn infer_new(&mut self, new: &ast::NewExpr, expr: &ast::Expr, expected: &Expectation) -> Ty {
        let args = args(new.arg_list());
        let range = new
            .arg_list()
            .map_or_else(|| expr.syntax().trimmed_range(), |list| list.syntax().trimmed_range());
        let ty_node = new.ty();
        let target = match &ty_node {
            Some(ty) => self.lower_opt(Some(ty.clone())),
            None => expected.ty().cloned().unwrap_or_else(Ty::unknown),
        };
        if self.env.resolve(&target).is_unknown() {
            self.infer_args(&args);
            return target;
        }

        match self.instantiable(ty_node.as_ref(), &target) {
            Some(Instantiable::Local(class)) => {
                let init = class.members().into_iter().find_map(|member| match member {
                    ast::ClassMember::Method(method)
                        if method.name().is_some_and(|name| name.text_trimmed() == "init") =>
                    {
                        Some(lower::signature(&mut ResolvedTypes(self.bindings), &method))
                    }
                    _ => None,
                });
                let init = init.unwrap_or_else(|| FunctionTy {
                    params: Vec::new(),
                    rest: None,
                    ret: Ty::nil(),
                });
                self.check_args(&init, &args, range);
            }
            Some(Instantiable::External) => self.infer_args(&args),
            None => {
                let type_range = ty_node
                    .map_or_else(|| expr.syntax().trimmed_range(), |ty| ty.syntax().trimmed_range());
                self.error(
                    DiagnosticCode::InvalidNew,
                    format!("cannot create an instance of `{target}` with `new`"),
                    type_range,
                );
                self.infer_args(&args);
            }
        }
        target
    }

    fn instantiable(&self, ty_node: Option<&ast::Type>, target: &Ty) -> Option<Instantiable> {
        let bindings = self.bindings;
        let symbol = match ty_node {
            Some(ast::Type::Ref(type_ref)) => {
                match &bindings.resolution(&SyntaxNodePtr::new(type_ref.syntax()))?.target {
                    Target::Symbol(symbol) => *symbol,
                    Target::External(external) => {
                        return (external.symbol.kind == SymbolKind::Class)
                            .then_some(Instantiable::External);
                    }
                }
            }
            Some(_) => return None,
            None => match target.kind() {
                TyKind::Ref(TypeName { module: None, name }) => {
                    bindings.lookup_module(Namespace::Type, name)?
                }
                _ => return None,
            },
        };
        let data = bindings.symbol(symbol);
        if data.kind != SymbolKind::Class {
            return None;
        }
        let class = data.decl.to_node(&self.root).and_then(ast::ClassDef::cast)?;
        Some(Instantiable::Local(class))
    }

    fn infer_arrow(&mut self, arrow: &ast::ArrowFunction, expected: &Expectation) -> Ty {
        let signature = expected.ty().and_then(|target| match self.env.resolve(target).kind() {
            TyKind::Function(function) => Some(function.clone()),
            _ => None,
        });

        let mut params = Vec::new();
        for (index, token) in arrow.params().iter().enumerate() {
            let ty = signature
                .as_ref()
                .and_then(|signature| signature.params.get(index))
                .map_or_else(Ty::unknown, |param| param.ty.clone());
            if let Some(symbol) = self.bindings.definition(token.trimmed_range()) {
                self.result.symbol_types.insert(symbol, ty.clone());
            }
            params.push(ParamTy { ty, has_default: false });
        }

        let ret = signature.map(|signature| signature.ret);
        let body_expected = match &ret {
            Some(ret) => same_strength(expected, ret.clone()),
            None => NoExpectation,
        };
        let saved_ret = self.ret.replace(ret.clone().unwrap_or_else(Ty::unknown));
        let body_ty = self.infer_opt(arrow.body().as_ref(), body_expected);
        self.ret = saved_ret;
        Ty::new(TyKind::Function(FunctionTy {
            params,
            rest: None,
            ret: ret.unwrap_or(body_ty),
        }))
    }

    fn infer_query(&mut self, query: &ast::QueryExpr, expected: &Expectation) -> Ty {
        let mut selected = Ty::unknown();
        for clause in query.clauses() {
            match clause {
                ast::QueryClause::From(from) => {
                    let source = from.expr();
                    let source_ty = self.infer_opt(source.as_ref(), NoExpectation);
                    let range = source.map_or_else(
                        || from.syntax().trimmed_range(),
                        |source| source.syntax().trimmed_range(),
                    );
                    let element = self.element_type(&source_ty, range);
                    self.bind_variable(&from, element, range);
                }
                ast::QueryClause::Let(binding) => {
                    let symbol = binding
                        .name()
                        .and_then(|name| self.bindings.definition(name.trimmed_range()));
                    let declared = symbol.and_then(|symbol| self.bindings.symbol(symbol).ty.clone());
                    let ty = match declared {
                        Some(declared) => {
                            self.infer_opt(binding.expr().as_ref(), ExpectHasType(declared.clone()));
                            declared
                        }
                        None => self.infer_opt(binding.expr().as_ref(), NoExpectation),
                    };
                    if let Some(symbol) = symbol {
                        self.result.symbol_types.insert(symbol, ty);
                    }
                }
                ast::QueryClause::Where(clause) => {
                    self.infer_opt(clause.expr().as_ref(), ExpectHasType(Ty::boolean()));
                }
                ast::QueryClause::Limit(clause) => {
                    self.infer_opt(clause.expr().as_ref(), ExpectHasType(Ty::int()));
                }
                ast::QueryClause::Select(clause) => {
                    let element = expected.ty().and_then(|target| {
                        match self.env.resolve(target).kind() {
                            TyKind::Array(element) => Some(element.clone()),
                            _ => None,
                        }
                    });
                    let expectation = element.map_or(NoExpectation, HintType);
                    selected = self.infer_opt(clause.expr().as_ref(), expectation);
                }
            }
        }
        Ty::array(selected)
    }

    /// The type of the values a `foreach` or `from` iterates over.
    pub(super) fn element_type(&mut self, iterable: &Ty, range: TextRange) -> Ty {
        let resolved = self.env.resolve(iterable);
        match resolved.kind() {
            TyKind::Unknown => Ty::unknown(),
            TyKind::Array(element) | TyKind::Map(element) | TyKind::Table(element) => {
                element.clone()
            }
            TyKind::Primitive(Primitive::String | Primitive::Xml) => resolved.clone(),
            _ => {
                self.error(
                    DiagnosticCode::NotIterable,
                    format!("`{iterable}` is not iterable"),
                    range,
                );
                Ty::unknown()
            }
        }
    }
}

/// Passes the expected type on as a hint only.
fn hint(expected: &Expectation) -> Expectation {
    expected.ty().map_or(NoExpectation, |ty| HintType(ty.clone()))
}

/// Expects `ty` as strictly as the enclosing expression is expected.
fn same_strength(expected: &Expectation, ty: Ty) -> Expectation {
    match expected {
        ExpectHasType(_) => ExpectHasType(ty),
        _ => HintType(ty),
    }
}

fn args(list: Option<ast::ArgList>) -> Vec<ast::Expr> {
    list.map(|list| list.args().collect()).unwrap_or_default()
}

fn int_value(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
