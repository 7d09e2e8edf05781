//! Typed views over the untyped syntax tree.
//!
//! Accessors return `Option` because any part of a node may be missing
//! after error recovery.

use crate::SyntaxKind::{self, *};
use crate::{NodeOrToken, SyntaxNode, SyntaxToken};

pub trait AstNode {
    fn can_cast(kind: SyntaxKind) -> bool
    where
        Self: Sized;

    fn cast(syntax: SyntaxNode) -> Option<Self>
    where
        Self: Sized;

    fn syntax(&self) -> &SyntaxNode;
}

macro_rules! ast_node {
    ($(#[$meta:meta])* $name:ident = $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == $kind
            }

            fn cast(syntax: SyntaxNode) -> Option<Self> {
                Self::can_cast(syntax.kind()).then_some(Self(syntax))
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

macro_rules! ast_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident($ty:ident)),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant($ty),)*
        }

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                $(<$ty as AstNode>::can_cast(kind))||*
            }

            fn cast(syntax: SyntaxNode) -> Option<Self> {
                let kind = syntax.kind();
                $(
                    if <$ty as AstNode>::can_cast(kind) {
                        return Some(Self::$variant($ty(syntax)));
                    }
                )*
                None
            }

            fn syntax(&self) -> &SyntaxNode {
                match self {
                    $(Self::$variant(it) => it.syntax(),)*
                }
            }
        }
    };
}

fn child<N: AstNode>(parent: &SyntaxNode) -> Option<N> {
    parent.children().find_map(N::cast)
}

fn children<N: AstNode>(parent: &SyntaxNode) -> impl Iterator<Item = N> + use<N> {
    parent.children().filter_map(N::cast)
}

/// The first present (non missing) direct child token of `kind`.
fn token(parent: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    tokens(parent).find(|token| token.kind() == kind)
}

fn tokens(parent: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> + use<> {
    parent
        .children_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .filter(|token| !token.is_missing())
}

fn has_token(parent: &SyntaxNode, kind: SyntaxKind) -> bool {
    token(parent, kind).is_some()
}

pub trait HasName: AstNode {
    fn name(&self) -> Option<SyntaxToken> {
        token(self.syntax(), NAME)
    }
}

pub trait HasQualifiers: AstNode {
    fn is_public(&self) -> bool {
        has_token(self.syntax(), PUBLIC_KW)
    }

    fn is_isolated(&self) -> bool {
        has_token(self.syntax(), ISOLATED_KW)
    }

    fn is_final(&self) -> bool {
        has_token(self.syntax(), FINAL_KW)
    }
}

pub trait HasDocumentation: AstNode {
    fn documentation(&self) -> Option<Documentation> {
        child(self.syntax())
    }
}

/// Declarations of the form `(type | var) NAME`.
pub trait HasTypedBinding: HasName {
    fn ty(&self) -> Option<Type> {
        child(self.syntax())
    }

    fn is_var(&self) -> bool {
        has_token(self.syntax(), VAR_KW)
    }
}

pub trait HasSignature: AstNode {
    fn param_list(&self) -> Option<ParamList> {
        child(self.syntax())
    }

    fn return_type(&self) -> Option<ReturnType> {
        child(self.syntax())
    }
}

ast_node!(Module = MODULE);

impl Module {
    pub fn imports(&self) -> impl Iterator<Item = Import> + use<> {
        children(&self.0)
    }

    pub fn items(&self) -> impl Iterator<Item = Item> + use<> {
        children(&self.0)
    }
}

ast_node!(Import = IMPORT_DECL);

impl Import {
    pub fn org(&self) -> Option<SyntaxToken> {
        self.0.children().find(|node| node.kind() == IMPORT_ORG).and_then(|org| token(&org, NAME))
    }

    pub fn module_names(&self) -> Vec<SyntaxToken> {
        self.0
            .children()
            .find(|node| node.kind() == IMPORT_MODULE_NAME)
            .map(|names| tokens(&names).filter(|token| token.kind() == NAME).collect())
            .unwrap_or_default()
    }

    pub fn prefix(&self) -> Option<SyntaxToken> {
        self.0
            .children()
            .find(|node| node.kind() == IMPORT_PREFIX)
            .and_then(|prefix| token(&prefix, NAME))
    }
}

ast_enum!(Item {
    Function(FunctionDef),
    TypeDef(TypeDef),
    Const(ConstDecl),
    Class(ClassDef),
    Var(ModuleVarDecl),
});

impl HasName for Item {}
impl HasQualifiers for Item {}
impl HasDocumentation for Item {}

ast_node!(FunctionDef = FUNCTION_DEF);

impl HasName for FunctionDef {}
impl HasQualifiers for FunctionDef {}
impl HasDocumentation for FunctionDef {}
impl HasSignature for FunctionDef {}

impl FunctionDef {
    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(ParamList = PARAM_LIST);

impl ParamList {
    pub fn params(&self) -> impl Iterator<Item = Param> + use<> {
        children(&self.0)
    }

    pub fn rest_param(&self) -> Option<RestParam> {
        child(&self.0)
    }
}

ast_node!(Param = PARAM);

impl HasName for Param {}

impl Param {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn default_value(&self) -> Option<Expr> {
        self.0.children().find(|node| node.kind() == PARAM_DEFAULT).and_then(|node| child(&node))
    }
}

ast_node!(RestParam = REST_PARAM);

impl HasName for RestParam {}

impl RestParam {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(ReturnType = RETURN_TYPE);

impl ReturnType {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(TypeDef = TYPE_DEF);

impl HasName for TypeDef {}
impl HasQualifiers for TypeDef {}
impl HasDocumentation for TypeDef {}

impl TypeDef {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(ConstDecl = CONST_DECL);

impl HasName for ConstDecl {}
impl HasQualifiers for ConstDecl {}
impl HasDocumentation for ConstDecl {}

impl ConstDecl {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn initializer(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(ModuleVarDecl = MODULE_VAR_DECL);

impl HasName for ModuleVarDecl {}
impl HasQualifiers for ModuleVarDecl {}
impl HasDocumentation for ModuleVarDecl {}
impl HasTypedBinding for ModuleVarDecl {}

impl ModuleVarDecl {
    pub fn initializer(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(ClassDef = CLASS_DEF);

impl HasName for ClassDef {}
impl HasQualifiers for ClassDef {}
impl HasDocumentation for ClassDef {}

impl ClassDef {
    pub fn body(&self) -> Option<ClassBody> {
        child(&self.0)
    }

    pub fn members(&self) -> Vec<ClassMember> {
        self.body().map(|body| children(&body.0).collect()).unwrap_or_default()
    }
}

ast_node!(ClassBody = CLASS_BODY);

ast_enum!(ClassMember {
    Field(ObjectField),
    Method(MethodDef),
    Inclusion(TypeInclusion),
});

ast_node!(ObjectField = OBJECT_FIELD);

impl HasName for ObjectField {}
impl HasQualifiers for ObjectField {}
impl HasDocumentation for ObjectField {}

impl ObjectField {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn initializer(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(MethodDef = METHOD_DEF);

impl HasName for MethodDef {}
impl HasQualifiers for MethodDef {}
impl HasDocumentation for MethodDef {}
impl HasSignature for MethodDef {}

impl MethodDef {
    /// `None` for method declarations inside object type descriptors.
    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(TypeInclusion = TYPE_INCLUSION);

impl TypeInclusion {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(
    /// A block of `#` lines preceding a declaration.
    Documentation = DOCUMENTATION
);

impl Documentation {
    /// The description lines joined with newlines, code spans included verbatim.
    pub fn summary(&self) -> String {
        self.0
            .children()
            .filter(|line| line.kind() == DOC_LINE)
            .map(|line| doc_line_text(&line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `(name, description)` for each `+ name - description` line. The
    /// return description is reported under the name `return`.
    pub fn params(&self) -> Vec<(String, String)> {
        self.0
            .children()
            .filter(|line| line.kind() == DOC_PARAM_LINE)
            .filter_map(|line| {
                let name = tokens(&line)
                    .find(|token| matches!(token.kind(), DOC_PARAM_NAME | DOC_RETURN_START))?;
                let name = match name.kind() {
                    DOC_RETURN_START => "return".to_owned(),
                    _ => name.text_trimmed().to_owned(),
                };
                Some((name, doc_line_text(&line)))
            })
            .collect()
    }
}

fn doc_line_text(line: &SyntaxNode) -> String {
    let mut text = String::new();
    for element in line.children_with_tokens() {
        match element {
            NodeOrToken::Token(token) if token.kind() == DOC_TEXT => {
                text.push_str(token.text_trimmed());
            }
            NodeOrToken::Node(span) if span.kind() == DOC_CODE_SPAN => {
                text.push_str(span.text_trimmed().as_str());
            }
            _ => {}
        }
    }
    text.trim().to_owned()
}

ast_node!(Block = BLOCK);

impl Block {
    pub fn stmts(&self) -> impl Iterator<Item = Stmt> + use<> {
        children(&self.0)
    }
}

ast_enum!(Stmt {
    LocalVar(LocalVarDecl),
    Assign(AssignStmt),
    CompoundAssign(CompoundAssignStmt),
    If(IfStmt),
    While(WhileStmt),
    Foreach(ForeachStmt),
    Return(ReturnStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Panic(PanicStmt),
    Lock(LockStmt),
    Transaction(TransactionStmt),
    Commit(CommitStmt),
    Rollback(RollbackStmt),
    Expr(ExprStmt),
    Block(Block),
});

ast_node!(LocalVarDecl = LOCAL_VAR_DECL);

impl HasName for LocalVarDecl {}
impl HasTypedBinding for LocalVarDecl {}

impl LocalVarDecl {
    pub fn is_final(&self) -> bool {
        has_token(&self.0, FINAL_KW)
    }

    pub fn initializer(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(AssignStmt = ASSIGN_STMT);

impl AssignStmt {
    pub fn lhs(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn rhs(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }
}

ast_node!(CompoundAssignStmt = COMPOUND_ASSIGN_STMT);

impl CompoundAssignStmt {
    pub fn lhs(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn op(&self) -> Option<BinaryOp> {
        let kinds: Vec<_> = tokens(&self.0)
            .map(|token| token.kind())
            .filter(|&kind| kind != SEMICOLON)
            .collect();
        BinaryOp::from_compound(&kinds)
    }

    pub fn rhs(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }
}

ast_node!(IfStmt = IF_STMT);

impl IfStmt {
    pub fn condition(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn then_branch(&self) -> Option<Block> {
        child(&self.0)
    }

    pub fn else_clause(&self) -> Option<ElseClause> {
        child(&self.0)
    }
}

ast_node!(ElseClause = ELSE_CLAUSE);

impl ElseClause {
    pub fn if_stmt(&self) -> Option<IfStmt> {
        child(&self.0)
    }

    pub fn block(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(WhileStmt = WHILE_STMT);

impl WhileStmt {
    pub fn condition(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(ForeachStmt = FOREACH_STMT);

impl HasName for ForeachStmt {}
impl HasTypedBinding for ForeachStmt {}

impl ForeachStmt {
    pub fn iterable(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(ReturnStmt = RETURN_STMT);

impl ReturnStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(BreakStmt = BREAK_STMT);
ast_node!(ContinueStmt = CONTINUE_STMT);

ast_node!(PanicStmt = PANIC_STMT);

impl PanicStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(LockStmt = LOCK_STMT);

impl LockStmt {
    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(TransactionStmt = TRANSACTION_STMT);

impl TransactionStmt {
    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(CommitStmt = COMMIT_STMT);

ast_node!(RollbackStmt = ROLLBACK_STMT);

impl RollbackStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(ExprStmt = EXPR_STMT);

impl ExprStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_enum!(Expr {
    Literal(Literal),
    Nil(NilLiteral),
    NameRef(NameRef),
    QualifiedNameRef(QualifiedNameRef),
    SelfRef(SelfRef),
    Paren(ParenExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Conditional(ConditionalExpr),
    TypeTest(TypeTestExpr),
    TypeOf(TypeOfExpr),
    Check(CheckExpr),
    Trap(TrapExpr),
    Cast(CastExpr),
    Call(CallExpr),
    MethodCall(MethodCallExpr),
    FieldAccess(FieldAccessExpr),
    OptionalFieldAccess(OptionalFieldAccessExpr),
    MemberAccess(MemberAccessExpr),
    List(ListConstructor),
    Mapping(MappingConstructor),
    New(NewExpr),
    ErrorConstructor(ErrorConstructor),
    AnonFunction(AnonFunction),
    ArrowFunction(ArrowFunction),
    StringTemplate(StringTemplateExpr),
    XmlTemplate(XmlTemplateExpr),
    Query(QueryExpr),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    HexInt,
    Float,
    HexFloat,
    Decimal,
    String,
    Boolean,
    Null,
}

ast_node!(Literal = LITERAL);

impl Literal {
    pub fn token(&self) -> Option<SyntaxToken> {
        tokens(&self.0).next()
    }

    pub fn kind(&self) -> Option<LiteralKind> {
        let token = self.token()?;
        Some(match token.kind() {
            DECIMAL_INT => LiteralKind::Int,
            HEX_INT => LiteralKind::HexInt,
            DECIMAL_FLOAT if token.text_trimmed().ends_with(['d', 'D']) => LiteralKind::Decimal,
            DECIMAL_FLOAT => LiteralKind::Float,
            HEX_FLOAT => LiteralKind::HexFloat,
            STRING_LITERAL => LiteralKind::String,
            TRUE_KW | FALSE_KW => LiteralKind::Boolean,
            NULL_KW => LiteralKind::Null,
            _ => return None,
        })
    }
}

ast_node!(NilLiteral = NIL_LITERAL);

ast_node!(NameRef = NAME_REF);

impl HasName for NameRef {}

ast_node!(
    /// `prefix:name`
    QualifiedNameRef = QUALIFIED_NAME_REF
);

impl QualifiedNameRef {
    pub fn prefix(&self) -> Option<SyntaxToken> {
        qualified_parts(&self.0).0
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        qualified_parts(&self.0).1
    }
}

fn qualified_parts(node: &SyntaxNode) -> (Option<SyntaxToken>, Option<SyntaxToken>) {
    let mut prefix = None;
    let mut seen_colon = false;
    let mut name = None;
    for element in node.children_with_tokens() {
        let Some(token) = element.into_token() else { continue };
        match token.kind() {
            COLON => seen_colon = true,
            NAME if !token.is_missing() && seen_colon => name = Some(token),
            NAME if !token.is_missing() => prefix = Some(token),
            _ => {}
        }
    }
    if seen_colon { (prefix, name) } else { (None, prefix) }
}

ast_node!(SelfRef = SELF_REF);

ast_node!(ParenExpr = PAREN_EXPR);

impl ParenExpr {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    RefEq,
    RefNe,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UnsignedShr,
    Elvis,
    ClosedRange,
    HalfOpenRange,
}

impl BinaryOp {
    /// Decodes an operator from its tokens. Right shifts arrive as runs of
    /// adjacent `>` tokens.
    pub fn from_tokens(kinds: &[SyntaxKind]) -> Option<Self> {
        Some(match kinds {
            [PLUS] => Self::Add,
            [MINUS] => Self::Sub,
            [STAR] => Self::Mul,
            [SLASH] => Self::Div,
            [PERCENT] => Self::Rem,
            [EQ2] => Self::Eq,
            [NEQ] => Self::Ne,
            [EQ3] => Self::RefEq,
            [NEQ2] => Self::RefNe,
            [LT] => Self::Lt,
            [GT] => Self::Gt,
            [LT_EQ] => Self::Le,
            [GT_EQ] => Self::Ge,
            [AMP2] => Self::And,
            [PIPE2] => Self::Or,
            [AMP] => Self::BitAnd,
            [PIPE] => Self::BitOr,
            [CARET] => Self::BitXor,
            [SHL] => Self::Shl,
            [GT, GT] => Self::Shr,
            [GT, GT, GT] => Self::UnsignedShr,
            [ELVIS] => Self::Elvis,
            [ELLIPSIS] => Self::ClosedRange,
            [DOUBLE_DOT_LT] => Self::HalfOpenRange,
            _ => return None,
        })
    }

    pub fn from_compound(kinds: &[SyntaxKind]) -> Option<Self> {
        Some(match kinds {
            [PLUS_EQ] => Self::Add,
            [MINUS_EQ] => Self::Sub,
            [STAR_EQ] => Self::Mul,
            [SLASH_EQ] => Self::Div,
            [AMP_EQ] => Self::BitAnd,
            [PIPE_EQ] => Self::BitOr,
            [CARET_EQ] => Self::BitXor,
            [SHL_EQ] => Self::Shl,
            [GT, GT_EQ] => Self::Shr,
            [GT, GT, GT_EQ] => Self::UnsignedShr,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::RefEq => "===",
            Self::RefNe => "!==",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UnsignedShr => ">>>",
            Self::Elvis => "?:",
            Self::ClosedRange => "...",
            Self::HalfOpenRange => "..<",
        }
    }
}

ast_node!(BinaryExpr = BINARY_EXPR);

impl BinaryExpr {
    pub fn lhs(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn rhs(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }

    pub fn op(&self) -> Option<BinaryOp> {
        let kinds: Vec<_> = tokens(&self.0).map(|token| token.kind()).collect();
        BinaryOp::from_tokens(&kinds)
    }

    /// The range of the operator tokens.
    pub fn op_range(&self) -> Option<text_size::TextRange> {
        let mut ops = tokens(&self.0).map(|token| token.trimmed_range());
        let first = ops.next()?;
        Some(ops.fold(first, |range, next| range.cover(next)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }
}

ast_node!(UnaryExpr = UNARY_EXPR);

impl UnaryExpr {
    pub fn op(&self) -> Option<UnaryOp> {
        tokens(&self.0).find_map(|token| match token.kind() {
            MINUS => Some(UnaryOp::Neg),
            PLUS => Some(UnaryOp::Plus),
            BANG => Some(UnaryOp::Not),
            TILDE => Some(UnaryOp::BitNot),
            _ => None,
        })
    }

    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(ConditionalExpr = CONDITIONAL_EXPR);

impl ConditionalExpr {
    pub fn condition(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn then_expr(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }

    pub fn else_expr(&self) -> Option<Expr> {
        children(&self.0).nth(2)
    }
}

ast_node!(TypeTestExpr = TYPE_TEST_EXPR);

impl TypeTestExpr {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(TypeOfExpr = TYPEOF_EXPR);

impl TypeOfExpr {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(CheckExpr = CHECK_EXPR);

impl CheckExpr {
    /// `checkpanic` rather than `check`.
    pub fn is_panic(&self) -> bool {
        has_token(&self.0, CHECKPANIC_KW)
    }

    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(TrapExpr = TRAP_EXPR);

impl TrapExpr {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(CastExpr = CAST_EXPR);

impl CastExpr {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(ArgList = ARG_LIST);

impl ArgList {
    pub fn args(&self) -> impl Iterator<Item = Expr> + use<> {
        children(&self.0)
    }
}

ast_node!(CallExpr = CALL_EXPR);

impl CallExpr {
    pub fn callee(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        child(&self.0)
    }
}

ast_node!(MethodCallExpr = METHOD_CALL_EXPR);

impl HasName for MethodCallExpr {}

impl MethodCallExpr {
    pub fn receiver(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        child(&self.0)
    }
}

ast_node!(FieldAccessExpr = FIELD_ACCESS_EXPR);

impl HasName for FieldAccessExpr {}

impl FieldAccessExpr {
    pub fn receiver(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(OptionalFieldAccessExpr = OPTIONAL_FIELD_ACCESS_EXPR);

impl HasName for OptionalFieldAccessExpr {}

impl OptionalFieldAccessExpr {
    pub fn receiver(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(MemberAccessExpr = MEMBER_ACCESS_EXPR);

impl MemberAccessExpr {
    pub fn receiver(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn index(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }
}

ast_node!(ListConstructor = LIST_CONSTRUCTOR);

impl ListConstructor {
    pub fn elements(&self) -> impl Iterator<Item = Expr> + use<> {
        children(&self.0)
    }
}

ast_node!(MappingConstructor = MAPPING_CONSTRUCTOR);

impl MappingConstructor {
    pub fn fields(&self) -> impl Iterator<Item = MappingField> + use<> {
        children(&self.0)
    }
}

ast_node!(MappingField = MAPPING_FIELD);

impl MappingField {
    pub fn key_token(&self) -> Option<SyntaxToken> {
        tokens(&self.0).find(|token| matches!(token.kind(), NAME | STRING_LITERAL))
    }

    /// The field name with string quotes removed.
    pub fn key(&self) -> Option<String> {
        let token = self.key_token()?;
        let text = token.text_trimmed();
        Some(match token.kind() {
            STRING_LITERAL => {
                text.trim_start_matches('"').trim_end_matches('"').to_owned()
            }
            _ => text.trim_start_matches('\'').to_owned(),
        })
    }

    /// `None` for the `{name}` shorthand.
    pub fn value(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn is_shorthand(&self) -> bool {
        !has_token(&self.0, COLON)
    }
}

ast_node!(NewExpr = NEW_EXPR);

impl NewExpr {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        child(&self.0)
    }
}

ast_node!(ErrorConstructor = ERROR_CONSTRUCTOR);

impl ErrorConstructor {
    pub fn arg_list(&self) -> Option<ArgList> {
        child(&self.0)
    }
}

ast_node!(AnonFunction = ANON_FUNCTION);

impl HasQualifiers for AnonFunction {}
impl HasSignature for AnonFunction {}

impl AnonFunction {
    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(ArrowFunction = ARROW_FUNCTION);

impl ArrowFunction {
    pub fn params(&self) -> Vec<SyntaxToken> {
        self.0
            .children()
            .find(|node| node.kind() == INFER_PARAM_LIST)
            .map(|list| tokens(&list).filter(|token| token.kind() == NAME).collect())
            .unwrap_or_default()
    }

    pub fn body(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(StringTemplateExpr = STRING_TEMPLATE_EXPR);

impl StringTemplateExpr {
    pub fn interpolations(&self) -> impl Iterator<Item = Interpolation> + use<> {
        children(&self.0)
    }
}

ast_node!(Interpolation = INTERPOLATION);

impl Interpolation {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(XmlTemplateExpr = XML_TEMPLATE_EXPR);

impl XmlTemplateExpr {
    /// Interpolations anywhere in the literal, but not those nested inside
    /// another interpolation.
    pub fn interpolations(&self) -> Vec<Interpolation> {
        let mut found = Vec::new();
        let mut walk = self.0.preorder();
        while let Some(event) = walk.next() {
            if let crate::WalkEvent::Enter(node) = event
                && let Some(interpolation) = Interpolation::cast(node)
            {
                found.push(interpolation);
                walk.skip_subtree();
            }
        }
        found
    }
}

ast_node!(XmlElement = XML_ELEMENT);

impl XmlElement {
    pub fn start_tag(&self) -> Option<XmlStartTag> {
        child(&self.0)
    }

    pub fn end_tag(&self) -> Option<XmlEndTag> {
        child(&self.0)
    }
}

ast_node!(XmlStartTag = XML_START_TAG);

impl XmlStartTag {
    pub fn name(&self) -> Option<SyntaxToken> {
        self.0.children().find(|node| node.kind() == XML_QNAME).and_then(|qname| token(&qname, XML_NAME))
    }
}

ast_node!(XmlEndTag = XML_END_TAG);

impl XmlEndTag {
    pub fn name(&self) -> Option<SyntaxToken> {
        self.0.children().find(|node| node.kind() == XML_QNAME).and_then(|qname| token(&qname, XML_NAME))
    }
}

ast_node!(QueryExpr = QUERY_EXPR);

ast_enum!(QueryClause {
    From(FromClause),
    Let(LetClause),
    Where(WhereClause),
    Limit(LimitClause),
    Select(SelectClause),
});

impl QueryExpr {
    pub fn clauses(&self) -> impl Iterator<Item = QueryClause> + use<> {
        children(&self.0)
    }

    pub fn select(&self) -> Option<SelectClause> {
        child(&self.0)
    }
}

ast_node!(FromClause = FROM_CLAUSE);

impl HasName for FromClause {}
impl HasTypedBinding for FromClause {}

impl FromClause {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(LetClause = LET_CLAUSE);

impl HasName for LetClause {}
impl HasTypedBinding for LetClause {}

impl LetClause {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(WhereClause = WHERE_CLAUSE);

impl WhereClause {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(LimitClause = LIMIT_CLAUSE);

impl LimitClause {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(SelectClause = SELECT_CLAUSE);

impl SelectClause {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_enum!(Type {
    Builtin(BuiltinType),
    Nil(NilType),
    Ref(TypeRef),
    Optional(OptionalType),
    Array(ArrayType),
    Map(MapType),
    Table(TableType),
    Error(ErrorType),
    Record(RecordType),
    Object(ObjectType),
    Function(FunctionType),
    Union(UnionType),
    Intersection(IntersectionType),
    Paren(ParenType),
});

ast_node!(BuiltinType = BUILTIN_TYPE);

impl BuiltinType {
    pub fn keyword(&self) -> Option<SyntaxKind> {
        tokens(&self.0).map(|token| token.kind()).find(|kind| kind.is_builtin_type_keyword())
    }
}

ast_node!(NilType = NIL_TYPE);

ast_node!(TypeRef = TYPE_REF);

impl TypeRef {
    pub fn prefix(&self) -> Option<SyntaxToken> {
        qualified_parts(&self.0).0
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        qualified_parts(&self.0).1
    }
}

ast_node!(OptionalType = OPTIONAL_TYPE);

impl OptionalType {
    pub fn inner(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(ArrayType = ARRAY_TYPE);

impl ArrayType {
    pub fn element(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(MapType = MAP_TYPE);

impl MapType {
    pub fn value(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(TableType = TABLE_TYPE);

impl TableType {
    pub fn row(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn key_fields(&self) -> Vec<SyntaxToken> {
        self.0
            .children()
            .find(|node| node.kind() == KEY_SPECIFIER)
            .map(|key| tokens(&key).filter(|token| token.kind() == NAME).collect())
            .unwrap_or_default()
    }
}

ast_node!(ErrorType = ERROR_TYPE);

impl ErrorType {
    pub fn detail(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(RecordType = RECORD_TYPE);

impl RecordType {
    /// `record {| ... |}`
    pub fn is_closed(&self) -> bool {
        has_token(&self.0, LEFT_CLOSED_RECORD)
    }

    pub fn fields(&self) -> impl Iterator<Item = RecordField> + use<> {
        children(&self.0)
    }

    pub fn rest(&self) -> Option<RecordRest> {
        child(&self.0)
    }

    pub fn inclusions(&self) -> impl Iterator<Item = TypeInclusion> + use<> {
        children(&self.0)
    }
}

ast_node!(RecordField = RECORD_FIELD);

impl HasName for RecordField {}

impl RecordField {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn is_optional(&self) -> bool {
        has_token(&self.0, QUESTION)
    }

    pub fn is_readonly(&self) -> bool {
        has_token(&self.0, READONLY_KW)
    }

    pub fn default_value(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(RecordRest = RECORD_REST);

impl RecordRest {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(ObjectType = OBJECT_TYPE);

impl ObjectType {
    pub fn members(&self) -> impl Iterator<Item = ClassMember> + use<> {
        children(&self.0)
    }
}

ast_node!(FunctionType = FUNCTION_TYPE);

impl HasSignature for FunctionType {}

ast_node!(UnionType = UNION_TYPE);

impl UnionType {
    /// Members of a `A | B | C` chain, flattened left to right.
    pub fn members(&self) -> Vec<Type> {
        let mut out = Vec::new();
        for member in children::<Type>(&self.0) {
            match member {
                Type::Union(nested) => out.extend(nested.members()),
                other => out.push(other),
            }
        }
        out
    }
}

ast_node!(IntersectionType = INTERSECTION_TYPE);

impl IntersectionType {
    pub fn members(&self) -> Vec<Type> {
        let mut out = Vec::new();
        for member in children::<Type>(&self.0) {
            match member {
                Type::Intersection(nested) => out.extend(nested.members()),
                other => out.push(other),
            }
        }
        out
    }
}

ast_node!(ParenType = PAREN_TYPE);

impl ParenType {
    pub fn inner(&self) -> Option<Type> {
        child(&self.0)
    }
}
