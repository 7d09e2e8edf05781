use std::fmt::{self, Display};

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
pub use text_size::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    fn level(self) -> Level {
        match self {
            Self::Error => Level::Error,
            Self::Warning => Level::Warning,
            Self::Info => Level::Info,
            Self::Hint => Level::Help,
        }
    }
}

macro_rules! diagnostic_codes {
    ($($(#[$meta:meta])* $name:ident = $code:literal,)*) => {
        /// Stable identifiers for every diagnostic the front end reports.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum DiagnosticCode {
            $($(#[$meta])* $name,)*
        }

        impl DiagnosticCode {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$name => $code,)*
                }
            }
        }
    };
}

diagnostic_codes! {
    UnexpectedCharacter = "BCE1001",
    UnterminatedString = "BCE1002",
    InvalidEscape = "BCE1003",
    UnterminatedTemplate = "BCE1004",
    UnterminatedXmlComment = "BCE1005",
    MalformedNumber = "BCE1006",
    UnterminatedCodeSpan = "BCE1007",
    /// A CDATA section or processing instruction left open.
    UnterminatedXmlSection = "BCE1008",

    MissingToken = "BCE2001",
    UnexpectedToken = "BCE2002",
    ExpectedExpression = "BCE2003",
    ExpectedType = "BCE2004",
    ExpectedItem = "BCE2005",
    NestingTooDeep = "BCE2006",
    XmlTagMismatch = "BCE2007",
    DuplicateQualifier = "BCE2008",

    UndeclaredName = "BCE3001",
    Redeclaration = "BCE3002",
    ForwardReference = "BCE3003",
    UnknownModule = "BCE3004",
    UnknownModuleSymbol = "BCE3005",
    AmbiguousReference = "BCE3006",
    SelfOutsideClass = "BCE3007",

    TypeMismatch = "BCE4001",
    InvalidOperator = "BCE4002",
    ArityMismatch = "BCE4003",
    NotCallable = "BCE4004",
    UnknownField = "BCE4005",
    UnknownMethod = "BCE4006",
    NotIndexable = "BCE4007",
    MissingReturn = "BCE4008",
    LoopControlOutsideLoop = "BCE4009",
    AssignToImmutable = "BCE4010",
    NotPublic = "BCE4011",
    IsolationViolation = "BCE4012",
    InvalidExprStmt = "BCE4013",
    MissingRequiredField = "BCE4014",
    InvalidCast = "BCE4015",
    InvalidPanicOperand = "BCE4016",
    CyclicType = "BCE4017",
    NotIterable = "BCE4018",
    InvalidNew = "BCE4019",
    InvalidAssignTarget = "BCE4020",
    /// `check` in a function whose return type cannot hold an error.
    InvalidCheck = "BCE4021",

    /// `check` applied to an expression that can never be an error.
    UnnecessaryCheck = "BCW4001",
    UnreachableCode = "BCW4002",
}

impl DiagnosticCode {
    pub fn default_severity(self) -> Severity {
        if self.as_str().starts_with("BCW") { Severity::Warning } else { Severity::Error }
    }

    /// Codes reported by the tokenizer.
    pub fn is_lexical(self) -> bool {
        self.as_str().starts_with("BCE1")
    }
}

impl Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    severity: Severity,
    code: DiagnosticCode,
    message: String,
    range: TextRange,
    related: Vec<(TextRange, String)>,
}

impl Diagnostic {
    /// A diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, range: TextRange) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            range,
            related: Vec::new(),
        }
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>, range: TextRange) -> Self {
        Self { severity: Severity::Error, ..Self::new(code, message, range) }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>, range: TextRange) -> Self {
        Self { severity: Severity::Warning, ..Self::new(code, message, range) }
    }

    /// Attaches a secondary labelled location, e.g. a previous declaration.
    pub fn with_related(mut self, range: TextRange, label: impl Into<String>) -> Self {
        self.related.push((range, label.into()));
        self
    }

    pub fn with_range(mut self, range: TextRange) -> Self {
        self.range = range;
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> DiagnosticCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn related(&self) -> &[(TextRange, String)] {
        &self.related
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
    ) -> impl Display + 'a {
        let level = self.severity.level();
        let annotations = self.related.iter().map(|(range, label)| {
            Level::Note.span(clamp(*range, text)).label(label.as_str())
        });
        let message = level.title(&self.message).id(self.code.as_str()).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(level.span(clamp(self.range, text)).label("here"))
                .annotations(annotations)
                .fold(true),
        );
        renderer.render(message)
    }
}

/// Keeps a span inside the source so that zero width diagnostics at the
/// very end still render.
fn clamp(range: TextRange, text: &str) -> std::ops::Range<usize> {
    let len = text.len();
    let start = usize::from(range.start()).min(len);
    let end = usize::from(range.end()).clamp(start, len);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_severities() {
        assert_eq!(DiagnosticCode::TypeMismatch.as_str(), "BCE4001");
        assert_eq!(DiagnosticCode::UnexpectedCharacter.to_string(), "BCE1001");
        assert_eq!(DiagnosticCode::UnreachableCode.default_severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::MissingToken.default_severity(), Severity::Error);
    }

    #[test]
    fn renders_code_message_and_related_label() {
        let text = "int x = 1;\nint x = 2;\n";
        let diagnostic = Diagnostic::new(
            DiagnosticCode::Redeclaration,
            "`x` is already declared in this scope",
            TextRange::new(15.into(), 16.into()),
        )
        .with_related(TextRange::new(4.into(), 5.into()), "first declared here");

        let renderer = Renderer::plain();
        let rendered = diagnostic.render(&renderer, "main.bal", text).to_string();
        assert!(rendered.contains("error[BCE3002]"), "{rendered}");
        assert!(rendered.contains("`x` is already declared in this scope"));
        assert!(rendered.contains("main.bal"));
        assert!(rendered.contains("first declared here"));
    }

    #[test]
    fn renders_zero_width_range_at_end_of_file() {
        let text = "function f() {";
        let diagnostic = Diagnostic::new(
            DiagnosticCode::MissingToken,
            "missing `}`",
            TextRange::empty(20.into()),
        );
        let rendered = diagnostic.render(&Renderer::plain(), "f.bal", text).to_string();
        assert!(rendered.contains("missing `}`"));
    }
}
