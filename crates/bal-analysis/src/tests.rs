use std::sync::Arc;

use bal_errors::DiagnosticCode;
use bal_inputs::{CancellationFlag, ModulePath, NeverCancel};
use bal_parse::Status;
use bal_yellow::{SyntaxNodePtr, TextRange, TextSize};

use crate::{Analysis, ModuleExports, NoModules, SymbolKind, Target, Ty};

fn analyze(text: &str) -> Analysis {
    crate::analyze(text, &NoModules, &NeverCancel)
}

fn analyze_with(text: &str, modules: &[(&str, &str)]) -> Analysis {
    let lookup: Vec<Arc<ModuleExports>> = modules
        .iter()
        .map(|(path, text)| {
            let path = ModulePath::parse(path).expect("valid path");
            Arc::new(ModuleExports::collect(&bal_parse::parse(text).module(), &path))
        })
        .collect();
    crate::analyze(text, &lookup, &NeverCancel)
}

fn codes(analysis: &Analysis) -> Vec<DiagnosticCode> {
    analysis.diagnostics().map(|diagnostic| diagnostic.code()).collect()
}

fn range_of(text: &str, snippet: &str) -> TextRange {
    let start = text.find(snippet).expect("snippet occurs in the text");
    TextRange::at(TextSize::new(start as u32), TextSize::new(snippet.len() as u32))
}

/// The type of the expression spanning exactly `snippet`.
fn type_of(analysis: &Analysis, text: &str, snippet: &str) -> String {
    let range = range_of(text, snippet);
    analysis
        .parse
        .syntax_node()
        .descendants()
        .filter(|node| node.trimmed_range() == range)
        .find_map(|node| analysis.check.type_of(&SyntaxNodePtr::new(&node)).cloned())
        .map(|ty| ty.to_string())
        .expect("a typed expression")
}

/// The type of the only symbol called `name`.
fn symbol_type(analysis: &Analysis, name: &str) -> String {
    let [symbol] = analysis.index.lookup(name) else {
        panic!("expected exactly one `{name}`");
    };
    analysis
        .check
        .symbol_type(*symbol)
        .cloned()
        .or_else(|| analysis.bindings.symbol(*symbol).ty.clone())
        .map(|ty| ty.to_string())
        .expect("a typed symbol")
}

#[test]
fn add_function() {
    let text = "function add(int x, int y) returns int { return x + y; }";
    let analysis = analyze(text);

    assert_eq!(codes(&analysis), []);
    assert_eq!(type_of(&analysis, text, "x + y"), "int");

    let params: Vec<_> = analysis
        .bindings
        .symbols()
        .filter(|(_, data)| data.kind == SymbolKind::Parameter)
        .map(|(_, data)| data.name.to_string())
        .collect();
    assert_eq!(params, ["x", "y"]);
    assert_eq!(symbol_type(&analysis, "add"), "function (int, int) returns int");
}

#[test]
fn mismatched_initializer_keeps_declared_type() {
    let text = r#"int x = "hello";"#;
    let analysis = analyze(text);

    let diagnostics: Vec<_> = analysis.diagnostics().collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::TypeMismatch);
    assert_eq!(diagnostics[0].message(), "expected `int`, found `string`");
    assert_eq!(diagnostics[0].range(), range_of(text, r#""hello""#));
    assert_eq!(symbol_type(&analysis, "x"), "int");
}

#[test]
fn union_accepts_its_members() {
    let text = r#"
        int|string a = 5;
        int|string b = "x";
        int|string c = true;
    "#;
    let analysis = analyze(text);

    let diagnostics: Vec<_> = analysis.diagnostics().collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::TypeMismatch);
    assert_eq!(diagnostics[0].range(), range_of(text, "true"));
}

#[test]
fn open_records_accept_wider_records() {
    let text = "
        type Named record { string name; };
        type Person record {| string name; int age; |};
        type Numbered record {| int name; |};

        function widen(Person p) returns Named { return p; }
        function wrong(Numbered n) returns Named { return n; }
    ";
    let analysis = analyze(text);

    let diagnostics: Vec<_> = analysis.diagnostics().collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::TypeMismatch);
    let returned = range_of(text, "return n;").start() + TextSize::of("return ");
    assert_eq!(diagnostics[0].range(), TextRange::at(returned, TextSize::of("n")));
}

#[test]
fn literals_follow_the_expected_type() {
    let text = "
        float f = 5;
        decimal d = 1.5;
        byte b = 200;
        float sum = 1 + 2.5;
    ";
    let analysis = analyze(text);

    assert_eq!(codes(&analysis), []);
    assert_eq!(type_of(&analysis, text, "5"), "float");
    assert_eq!(type_of(&analysis, text, "1.5"), "decimal");
    assert_eq!(type_of(&analysis, text, "200"), "byte");
    assert_eq!(type_of(&analysis, text, "1 + 2.5"), "float");
}

#[test]
fn use_before_declaration() {
    let analysis = analyze("function f() { int y = x; int x = 1; }");
    assert_eq!(codes(&analysis), [DiagnosticCode::ForwardReference]);
}

#[test]
fn nested_block_shadows_locally() {
    let text = r#"
        function f() returns int {
            int x = 1;
            {
                string x = "inner";
                string s = x;
            }
            return x;
        }
    "#;
    let analysis = analyze(text);
    assert_eq!(codes(&analysis), []);
}

#[test]
fn redeclaration_in_the_same_scope() {
    let analysis = analyze("function f() { int x = 1; int x = 2; }");
    assert_eq!(codes(&analysis), [DiagnosticCode::Redeclaration]);
}

#[test]
fn undeclared_names_are_reported_once() {
    let analysis = analyze("function f() returns int { return missing + 1; }");
    assert_eq!(codes(&analysis), [DiagnosticCode::UndeclaredName]);
}

#[test]
fn module_level_forward_references() {
    let text = "
        function first() returns int { return second(); }
        function second() returns int { return LIMIT; }
        const LIMIT = 3;
    ";
    assert_eq!(codes(&analyze(text)), []);
}

#[test]
fn query_bindings() {
    let text = "
        function doubled(int[] xs) returns int[] {
            return from int x in xs
                let int y = x * 2
                where x > 1
                select y;
        }
    ";
    let analysis = analyze(text);

    assert_eq!(codes(&analysis), []);
    assert_eq!(type_of(&analysis, text, "x * 2"), "int");
    assert_eq!(symbol_type(&analysis, "y"), "int");
}

#[test]
fn references_stay_inside_their_scope() {
    let text = "
        function f(int[] xs) returns int {
            int total = 0;
            foreach int x in xs {
                int doubled = x * 2;
                total += doubled;
            }
            var ys = from int y in xs select y + total;
            return total;
        }
    ";
    let analysis = analyze(text);
    assert_eq!(codes(&analysis), []);

    let bindings = &analysis.bindings;
    for (_, resolution) in bindings.resolutions() {
        let Target::Symbol(symbol) = resolution.target else { continue };
        let scope = bindings.scope(bindings.symbol(symbol).scope);
        assert!(
            scope.range.contains_range(resolution.range),
            "{:?} resolved outside of its scope",
            bindings.symbol(symbol).name
        );
    }
}

#[test]
fn symbol_index() {
    let text = "function f(int a) returns int { int b = a; return a + b; }";
    let analysis = analyze(text);

    let [a] = analysis.index.lookup("a") else { panic!("one `a`") };
    assert_eq!(analysis.index.references(*a).len(), 2);
    let use_site = range_of(text, "a + b").start();
    assert_eq!(analysis.index.symbol_at(use_site), Some(*a));
    assert!(analysis.index.lookup("missing").is_empty());
}

#[test]
fn return_and_loop_control() {
    let text = "
        function noReturn(boolean flag) returns int {
            if flag { return 1; }
        }
        function looping() returns int {
            while true { }
        }
        function stray() {
            break;
        }
        function after() returns int {
            return 1;
            int dead = 2;
        }
    ";
    let analysis = analyze(text);
    assert_eq!(
        codes(&analysis),
        [
            DiagnosticCode::MissingReturn,
            DiagnosticCode::LoopControlOutsideLoop,
            DiagnosticCode::UnreachableCode,
        ]
    );
}

#[test]
fn immutable_targets() {
    let text = "
        const MAX = 10;
        function f(int param) {
            final int fixed = 1;
            fixed = 2;
            param = 3;
            MAX = 4;
            _ = param;
        }
    ";
    let analysis = analyze(text);
    assert_eq!(
        codes(&analysis),
        [
            DiagnosticCode::AssignToImmutable,
            DiagnosticCode::AssignToImmutable,
            DiagnosticCode::AssignToImmutable,
        ]
    );
}

#[test]
fn calls_and_methods() {
    let text = r#"
        function greet(string name, string greeting = "hi") returns string {
            return greeting + name;
        }
        function sum(int... values) returns int { return values.length(); }
        function f() {
            string a = greet("x");
            string b = greet();
            int c = sum(1, 2, 3);
            int[] xs = [1, 2];
            xs.push(3);
            xs.missing();
            int n = 5;
            n();
        }
    "#;
    let analysis = analyze(text);
    assert_eq!(
        codes(&analysis),
        [DiagnosticCode::ArityMismatch, DiagnosticCode::UnknownMethod, DiagnosticCode::NotCallable]
    );
}

#[test]
fn mapping_constructors() {
    let text = r#"
        type Point record {| int x; int y; |};
        type Labelled record { string label; int weight = 1; };

        Point origin = {x: 0, y: 0};
        Point extra = {x: 0, y: 0, z: 0};
        Point partial = {x: 0};
        Labelled defaulted = {label: "a"};
        map<int> counts = {a: 1, b: "two"};
    "#;
    let analysis = analyze(text);
    assert_eq!(
        codes(&analysis),
        [
            DiagnosticCode::UnknownField,
            DiagnosticCode::MissingRequiredField,
            DiagnosticCode::TypeMismatch,
        ]
    );
}

#[test]
fn classes_and_new() {
    let text = "
        class Counter {
            int count = 0;

            function init(int start) {
                self.count = start;
            }

            function next() returns int {
                self.count += 1;
                return self.count;
            }
        }

        function f() returns int {
            Counter counter = new Counter(1);
            Counter broken = new Counter();
            int missing = counter.total;
            return counter.next();
        }
    ";
    let analysis = analyze(text);
    assert_eq!(codes(&analysis), [DiagnosticCode::ArityMismatch, DiagnosticCode::UnknownField]);
}

#[test]
fn isolated_functions_avoid_mutable_state() {
    let text = "
        int counter = 0;
        final int LIMIT = 3;

        function helper() returns int { return 1; }

        isolated function f() returns int {
            int a = LIMIT;
            int b = helper();
            return counter;
        }
    ";
    let analysis = analyze(text);
    assert_eq!(
        codes(&analysis),
        [DiagnosticCode::IsolationViolation, DiagnosticCode::IsolationViolation]
    );
}

#[test]
fn checks_casts_and_statements() {
    let text = r#"
        function parse(string s) returns int|error { return 1; }
        function f() returns error? {
            int a = check parse("1");
            int b = check 5;
            string c = <string>5;
            float d = <float>a;
            a + 1;
            panic 5;
        }
    "#;
    let analysis = analyze(text);
    assert_eq!(
        codes(&analysis),
        [
            DiagnosticCode::UnnecessaryCheck,
            DiagnosticCode::InvalidCast,
            DiagnosticCode::InvalidExprStmt,
            DiagnosticCode::InvalidPanicOperand,
        ]
    );
}

#[test]
fn operators() {
    let text = r#"
        function f(int? maybe) returns string {
            int a = maybe ?: 0;
            int[] range = 1 ..< 4;
            boolean b = 1 < "x";
            return "n" + 1;
        }
    "#;
    let analysis = analyze(text);
    assert_eq!(codes(&analysis), [DiagnosticCode::InvalidOperator, DiagnosticCode::InvalidOperator]);
    assert_eq!(type_of(&analysis, text, "1 ..< 4"), "int[]");
}

#[test]
fn cyclic_type_definitions() {
    let analysis = analyze("type A B; type B A; type List record { List? next; };");
    assert_eq!(codes(&analysis), [DiagnosticCode::CyclicType, DiagnosticCode::CyclicType]);
}

#[test]
fn qualified_references() {
    let geo = (
        "acme/geo",
        "public type Point record {| int x; int y; |};
         public function origin() returns Point { return {x: 0, y: 0}; }
         function hidden() returns int { return 1; }",
    );
    let text = "
        import acme/geo;
        function f() returns geo:Point {
            int h = geo:hidden();
            return geo:origin();
        }
    ";
    let analysis = analyze_with(text, &[geo]);
    assert_eq!(codes(&analysis), [DiagnosticCode::NotPublic]);
    assert_eq!(type_of(&analysis, text, "geo:origin()"), "geo:Point");

    let analysis = analyze_with("import acme/nowhere;", &[geo]);
    assert_eq!(codes(&analysis), [DiagnosticCode::UnknownModule]);

    let text = "
        import acme/geo;
        import other/geo;
        function f() returns int { return geo:missing(); }
    ";
    let analysis = analyze_with(text, &[geo, ("other/geo", "")]);
    assert_eq!(codes(&analysis), [DiagnosticCode::AmbiguousReference]);

    let analysis = analyze_with(
        "import acme/geo; function f() { int x = geo:absent; }",
        &[geo],
    );
    assert_eq!(codes(&analysis), [DiagnosticCode::UnknownModuleSymbol]);
}

#[test]
fn assignability_goes_through_the_environment() {
    let analysis = analyze("type Id int; type Ids Id[];");
    let env = crate::TypeEnv::new(analysis.bindings.types(), &NoModules, None);
    let ids = Ty::named(crate::TypeName::new(None, "Ids".into()));

    assert!(Ty::array(Ty::int()).is_assignable_to(&ids, &env));
    assert!(!Ty::array(Ty::string()).is_assignable_to(&ids, &env));
}

/// Analyzes `text` on a thread with a generous stack, returning the
/// diagnostic codes and the overall status.
fn analyze_deep(text: String) -> (Vec<DiagnosticCode>, Status) {
    std::thread::Builder::new()
        .stack_size(16 * 1024 * 1024)
        .spawn(move || {
            let analysis = analyze(&text);
            (codes(&analysis), analysis.status())
        })
        .expect("failed to spawn thread")
        .join()
        .expect("thread panicked")
}

#[test]
fn long_operator_chains() {
    let text = format!("function f() {{ int x = 1{}; }}", " + 1".repeat(200));
    assert_eq!(analyze_deep(text), (vec![], Status::Complete));

    let inputs = [
        format!("function f() {{ int x = 1{}; }}", " + 1".repeat(5000)),
        format!("function f(int[] xs) {{ var y = xs{}; }}", "[0]".repeat(5000)),
        format!("function f() {{ var y = g(){}; }}", ".h()".repeat(5000)),
        format!("type T int{};", "|int".repeat(5000)),
        format!("type T int{};", "[]".repeat(5000)),
        format!("function f(int? x) {{ boolean b = x{}; }}", " is int".repeat(5000)),
    ];
    for text in inputs {
        let (codes, status) = analyze_deep(text);
        assert!(codes.contains(&DiagnosticCode::NestingTooDeep), "{codes:?}");
        assert_eq!(status, Status::Complete);
    }
}

#[test]
fn cancelled_binding_keeps_module_symbols() {
    let text = "function f() { int x = 1; }\nfunction g() { int y = 2; }";
    let parse = bal_parse::parse(text);
    let cancellation = CancellationFlag::new();
    cancellation.cancel();

    let bindings = crate::bind(&parse, &NoModules, &cancellation);
    assert_eq!(bindings.status(), Status::Cancelled);
    let names: Vec<_> = bindings.symbols().map(|(_, data)| data.name.to_string()).collect();
    assert!(names.contains(&"f".to_owned()) && names.contains(&"g".to_owned()), "{names:?}");
    assert!(!names.contains(&"x".to_owned()), "{names:?}");

    let bindings = crate::bind(&parse, &NoModules, &NeverCancel);
    assert_eq!(bindings.status(), Status::Complete);
    let check = crate::check(&parse, &bindings, &NoModules, &cancellation);
    assert_eq!(check.status(), Status::Cancelled);
}

#[test]
fn xml_attribute_and_instruction_interpolations() {
    let text = r#"function f(string u) returns xml {
        return xml `<?p ${u}?><a k="${u}"><![CDATA[<]]></a>`;
    }"#;
    assert_eq!(codes(&analyze(text)), []);

    let analysis = analyze(r#"function f() returns xml { return xml `<a k="${missing}"/>`; }"#);
    assert_eq!(codes(&analysis), [DiagnosticCode::UndeclaredName]);
}

#[test]
fn check_needs_an_error_return() {
    let text = "
        function parse(string s) returns int|error { return 1; }
        function f() {
            int|error r = parse(\"1\");
            int v = check r;
        }
        function g() returns int|error {
            return check parse(\"2\");
        }
        function h() returns int {
            var twice = function (string s) returns int|error { return check parse(s); };
            return checkpanic parse(\"3\");
        }
    ";
    let analysis = analyze(text);
    let messages: Vec<_> = analysis.diagnostics().map(|diagnostic| diagnostic.message()).collect();
    assert_eq!(messages, ["`check` cannot return an error from a function returning `()`"]);
    assert_eq!(codes(&analysis), [DiagnosticCode::InvalidCheck]);
}
