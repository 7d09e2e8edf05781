/// Every terminal and non-terminal of the grammar.
///
/// Tokens come first, keywords are contiguous, and node kinds start at
/// [`SyntaxKind::MODULE`].
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[repr(u16)]
pub enum SyntaxKind {
    // punctuation
    SEMICOLON,
    COLON,
    COMMA,
    DOT,
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACKET,
    RIGHT_BRACKET,
    LEFT_BRACE,
    RIGHT_BRACE,
    LEFT_CLOSED_RECORD,
    RIGHT_CLOSED_RECORD,
    QUESTION,
    OPTIONAL_CHAINING,
    ELVIS,
    EQ,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    PERCENT,
    BANG,
    TILDE,
    EQ2,
    NEQ,
    EQ3,
    NEQ2,
    LT,
    GT,
    LT_EQ,
    GT_EQ,
    AMP2,
    PIPE2,
    AMP,
    PIPE,
    CARET,
    SHL,
    RIGHT_ARROW,
    FAT_ARROW,
    AT,
    ELLIPSIS,
    DOUBLE_DOT_LT,
    PLUS_EQ,
    MINUS_EQ,
    STAR_EQ,
    SLASH_EQ,
    AMP_EQ,
    PIPE_EQ,
    CARET_EQ,
    SHL_EQ,

    // keywords
    IMPORT_KW,
    AS_KW,
    PUBLIC_KW,
    FINAL_KW,
    ISOLATED_KW,
    FUNCTION_KW,
    RETURNS_KW,
    RETURN_KW,
    TYPE_KW,
    RECORD_KW,
    OBJECT_KW,
    CLASS_KW,
    CONST_KW,
    VAR_KW,
    NEW_KW,
    IF_KW,
    ELSE_KW,
    WHILE_KW,
    FOREACH_KW,
    IN_KW,
    BREAK_KW,
    CONTINUE_KW,
    PANIC_KW,
    CHECK_KW,
    CHECKPANIC_KW,
    TRAP_KW,
    IS_KW,
    TYPEOF_KW,
    TRUE_KW,
    FALSE_KW,
    NULL_KW,
    LOCK_KW,
    TRANSACTION_KW,
    SELF_KW,
    FROM_KW,
    INT_KW,
    BYTE_KW,
    FLOAT_KW,
    DECIMAL_KW,
    BOOLEAN_KW,
    STRING_KW,
    ERROR_KW,
    MAP_KW,
    JSON_KW,
    XML_KW,
    TABLE_KW,
    ANY_KW,
    ANYDATA_KW,
    NEVER_KW,
    READONLY_KW,
    TYPEDESC_KW,
    // contextual keywords, only produced under the matching lexer flag
    WHERE_KW,
    SELECT_KW,
    LET_KW,
    LIMIT_KW,
    COMMIT_KW,
    ROLLBACK_KW,
    KEY_KW,

    // literals and names
    DECIMAL_INT,
    HEX_INT,
    DECIMAL_FLOAT,
    HEX_FLOAT,
    STRING_LITERAL,
    NAME,

    // string templates
    BACKTICK,
    TEMPLATE_STRING,
    INTERPOLATION_START,

    // xml literals
    XML_TAG_OPEN,
    XML_TAG_OPEN_SLASH,
    XML_TAG_CLOSE,
    XML_TAG_SLASH_CLOSE,
    XML_NAME,
    XML_ATTR_QUOTE,
    XML_ATTR_TEXT,
    XML_TEXT,
    XML_COMMENT_START,
    XML_COMMENT_TEXT,
    XML_COMMENT_END,
    XML_PI_START,
    XML_PI_TEXT,
    XML_PI_END,
    /// `<![CDATA[ ... ]]>`, lexed as one token.
    XML_CDATA,

    // documentation
    DOC_LINE_START,
    DOC_TEXT,
    DOC_PARAM_START,
    DOC_RETURN_START,
    DOC_PARAM_NAME,
    DOC_DESCRIPTION_SEP,
    DOC_BACKTICK,
    DOC_CODE,

    UNKNOWN,
    EOF,

    // nodes
    MODULE,
    IMPORT_DECL,
    IMPORT_ORG,
    IMPORT_MODULE_NAME,
    IMPORT_PREFIX,
    FUNCTION_DEF,
    PARAM_LIST,
    PARAM,
    REST_PARAM,
    PARAM_DEFAULT,
    RETURN_TYPE,
    TYPE_DEF,
    CONST_DECL,
    MODULE_VAR_DECL,
    CLASS_DEF,
    CLASS_BODY,
    OBJECT_FIELD,
    METHOD_DEF,
    TYPE_INCLUSION,

    DOCUMENTATION,
    DOC_LINE,
    DOC_PARAM_LINE,
    DOC_CODE_SPAN,

    BLOCK,
    LOCAL_VAR_DECL,
    ASSIGN_STMT,
    COMPOUND_ASSIGN_STMT,
    IF_STMT,
    ELSE_CLAUSE,
    WHILE_STMT,
    FOREACH_STMT,
    RETURN_STMT,
    BREAK_STMT,
    CONTINUE_STMT,
    PANIC_STMT,
    LOCK_STMT,
    TRANSACTION_STMT,
    COMMIT_STMT,
    ROLLBACK_STMT,
    EXPR_STMT,

    LITERAL,
    NIL_LITERAL,
    NAME_REF,
    QUALIFIED_NAME_REF,
    SELF_REF,
    PAREN_EXPR,
    BINARY_EXPR,
    UNARY_EXPR,
    CONDITIONAL_EXPR,
    TYPE_TEST_EXPR,
    TYPEOF_EXPR,
    CHECK_EXPR,
    TRAP_EXPR,
    CAST_EXPR,
    CALL_EXPR,
    ARG_LIST,
    METHOD_CALL_EXPR,
    FIELD_ACCESS_EXPR,
    OPTIONAL_FIELD_ACCESS_EXPR,
    MEMBER_ACCESS_EXPR,
    LIST_CONSTRUCTOR,
    MAPPING_CONSTRUCTOR,
    MAPPING_FIELD,
    NEW_EXPR,
    ERROR_CONSTRUCTOR,
    ANON_FUNCTION,
    ARROW_FUNCTION,
    INFER_PARAM_LIST,
    STRING_TEMPLATE_EXPR,
    INTERPOLATION,
    XML_TEMPLATE_EXPR,
    XML_ELEMENT,
    XML_START_TAG,
    XML_END_TAG,
    XML_EMPTY_ELEMENT,
    XML_ATTRIBUTE,
    XML_ATTR_VALUE,
    XML_QNAME,
    XML_COMMENT,
    XML_PI,
    QUERY_EXPR,
    FROM_CLAUSE,
    LET_CLAUSE,
    WHERE_CLAUSE,
    LIMIT_CLAUSE,
    SELECT_CLAUSE,

    BUILTIN_TYPE,
    NIL_TYPE,
    TYPE_REF,
    OPTIONAL_TYPE,
    ARRAY_TYPE,
    MAP_TYPE,
    TABLE_TYPE,
    KEY_SPECIFIER,
    ERROR_TYPE,
    RECORD_TYPE,
    RECORD_FIELD,
    RECORD_REST,
    OBJECT_TYPE,
    FUNCTION_TYPE,
    UNION_TYPE,
    INTERSECTION_TYPE,
    PAREN_TYPE,

    ERROR,
    TOMBSTONE,
}

use SyntaxKind::*;

impl SyntaxKind {
    /// Returns `true` for node kinds, `false` for token kinds.
    #[inline]
    pub const fn is_node(self) -> bool {
        self as u16 >= MODULE as u16
    }

    #[inline]
    pub const fn is_keyword(self) -> bool {
        let kind = self as u16;
        kind >= IMPORT_KW as u16 && kind <= KEY_KW as u16
    }

    /// Keywords that name a builtin type descriptor.
    #[inline]
    pub const fn is_builtin_type_keyword(self) -> bool {
        let kind = self as u16;
        kind >= INT_KW as u16 && kind <= TYPEDESC_KW as u16
    }

    #[inline]
    pub const fn is_numeric_literal(self) -> bool {
        matches!(self, DECIMAL_INT | HEX_INT | DECIMAL_FLOAT | HEX_FLOAT)
    }

    #[inline]
    pub const fn is_literal(self) -> bool {
        self.is_numeric_literal() || matches!(self, STRING_LITERAL | TRUE_KW | FALSE_KW | NULL_KW)
    }

    #[inline]
    pub const fn is_compound_assign(self) -> bool {
        matches!(
            self,
            PLUS_EQ | MINUS_EQ | STAR_EQ | SLASH_EQ | AMP_EQ | PIPE_EQ | CARET_EQ | SHL_EQ
        )
    }

    /// A short human readable description used in "expected ..." messages.
    pub const fn describe(self) -> &'static str {
        match self {
            SEMICOLON => "`;`",
            COLON => "`:`",
            COMMA => "`,`",
            DOT => "`.`",
            LEFT_PAREN => "`(`",
            RIGHT_PAREN => "`)`",
            LEFT_BRACKET => "`[`",
            RIGHT_BRACKET => "`]`",
            LEFT_BRACE => "`{`",
            RIGHT_BRACE => "`}`",
            LEFT_CLOSED_RECORD => "`{|`",
            RIGHT_CLOSED_RECORD => "`|}`",
            QUESTION => "`?`",
            EQ => "`=`",
            LT => "`<`",
            GT => "`>`",
            FAT_ARROW => "`=>`",
            SLASH => "`/`",
            IN_KW => "`in`",
            RETURNS_KW => "`returns`",
            SELECT_KW => "`select`",
            KEY_KW => "`key`",
            BACKTICK => "`` ` ``",
            XML_TAG_CLOSE => "`>`",
            DOC_DESCRIPTION_SEP => "`-`",
            DOC_BACKTICK => "closing backticks",
            NAME | DOC_PARAM_NAME => "identifier",
            XML_NAME => "XML name",
            XML_COMMENT_END => "`-->`",
            XML_PI_END => "`?>`",
            XML_ATTR_QUOTE => "attribute value",
            EOF => "end of file",
            _ => "token",
        }
    }
}
