use bal_db::{RootDatabase, Workspace, check_file};
use bal_errors::{Diagnostic, Severity};
use bal_inputs::{File, ModulePath};

#[derive(Debug, PartialEq, Eq)]
struct ExpectedDiag {
    line: usize,
    severity: Severity,
    message: String,
}

#[derive(Debug, PartialEq, Eq)]
struct ActualDiag {
    line: usize,
    severity: Severity,
    message: String,
}

fn parse_expectations(fixture: &str) -> Vec<ExpectedDiag> {
    let mut expected = Vec::new();

    for (idx, line) in fixture.lines().enumerate() {
        let Some((_, comment)) = line.split_once("//~") else {
            continue;
        };
        let comment = comment.trim();
        let (severity, comment) = match comment.strip_prefix("WARN") {
            Some(rest) => (Severity::Warning, rest),
            None => (Severity::Error, comment.strip_prefix("ERROR").unwrap_or(comment)),
        };
        let comment = comment.trim();
        if comment.is_empty() {
            continue;
        }
        expected.push(ExpectedDiag { line: idx + 1, severity, message: comment.to_owned() });
    }

    expected
}

fn collect_actual(db: &RootDatabase, file: File, diagnostics: &[Diagnostic]) -> Vec<ActualDiag> {
    let line_index = file.line_index(db);
    let mut actual = diagnostics
        .iter()
        .map(|diag| {
            let line = line_index.line_col(diag.range().start()).line as usize + 1;
            ActualDiag { line, severity: diag.severity(), message: diag.message().to_owned() }
        })
        .collect::<Vec<_>>();
    actual.sort_by_key(|diag| (diag.line, diag.message.clone()));
    actual
}

#[track_caller]
fn check(fixture: &str) {
    check_project(&[], fixture);
}

/// Checks `fixture` as module `main`, next to `modules` given as
/// `(module path, text)` pairs.
#[track_caller]
fn check_project(modules: &[(&str, &str)], fixture: &str) {
    let mut workspace = Workspace::new();
    for &(path, text) in modules {
        let module = ModulePath::parse(path).unwrap();
        workspace.add_file(format!("{path}.bal"), module, text);
    }
    let file = workspace.add_file("main.bal", ModulePath::parse("main").unwrap(), fixture);

    let db = workspace.db();
    let diagnostics = check_file(db, file);
    let mut actual = collect_actual(db, file, diagnostics);
    let mut expected = parse_expectations(fixture);

    expected.sort_by_key(|diag| (diag.line, diag.message.clone()));

    assert_eq!(
        expected.len(),
        actual.len(),
        "expected {} diagnostic(s), got {}\nexpected: {expected:#?}\nactual: {actual:#?}",
        expected.len(),
        actual.len(),
    );

    for expected_diag in expected {
        let Some(pos) = actual.iter().position(|diag| {
            diag.line == expected_diag.line
                && diag.severity == expected_diag.severity
                && diag.message.contains(&expected_diag.message)
        }) else {
            panic!(
                "missing diagnostic on line {} containing `{}`\nactual: {actual:#?}",
                expected_diag.line, expected_diag.message
            );
        };
        actual.remove(pos);
    }

    assert!(actual.is_empty(), "unexpected diagnostics:\n{actual:#?}");
}

#[test]
fn well_typed_function() {
    check(
        r#"
function add(int x, int y) returns int {
    return x + y;
}
"#,
    );
}

#[test]
fn undeclared_name() {
    check(
        r#"
function main() {
    int y = x; //~ ERROR undeclared name `x`
}
"#,
    );
}

#[test]
fn undeclared_type() {
    check(
        r#"
function main() {
    Nope y = 1; //~ ERROR undeclared type `Nope`
}
"#,
    );
}

#[test]
fn mismatched_initializer() {
    check(
        r#"
int x = "hello"; //~ ERROR expected `int`, found `string`
"#,
    );
}

#[test]
fn if_condition_must_be_boolean() {
    check(
        r#"
function main() {
    if 1 { //~ ERROR expected `boolean`, found `int`
    }
}
"#,
    );
}

#[test]
fn binary_operator_type_mismatch() {
    check(
        r#"
function main() {
    int x = 1 + true; //~ ERROR operator `+` cannot be applied to `int` and `boolean`
}
"#,
    );
}

#[test]
fn use_before_declaration() {
    check(
        r#"
function main() {
    int a = b; //~ ERROR `b` is used before its declaration
    int b = 1;
}
"#,
    );
}

#[test]
fn redeclaration() {
    check(
        r#"
function main() {
    int a = 1;
    int a = 2; //~ ERROR `a` is already declared in this scope
}
"#,
    );
}

#[test]
fn missing_semicolon_is_recovered() {
    check(
        r#"
function main() {
    int x = 1 //~ ERROR missing `;`
    int y = x;
}
"#,
    );
}

#[test]
fn missing_return() {
    check(
        r#"
function f(boolean flag) returns int {
    if flag {
        return 1;
    }
} //~ ERROR missing return statement
"#,
    );
}

#[test]
fn unreachable_code_is_a_warning() {
    check(
        r#"
function f() returns int {
    return 1;
    int dead = 2; //~ WARN unreachable code
}
"#,
    );
}

#[test]
fn loop_control_outside_of_a_loop() {
    check(
        r#"
function main() {
    while true {
        break;
    }
    continue; //~ ERROR `continue` outside of a loop
}
"#,
    );
}

#[test]
fn imported_functions() {
    check_project(
        &[(
            "geo",
            "public function origin() returns int { return 0; }\n\
             function hidden() returns int { return 1; }\n",
        )],
        r#"
import geo;

function main() {
    int a = geo:origin();
    int b = geo:hidden(); //~ ERROR `hidden` is not public in module `geo`
    string c = geo:origin(); //~ ERROR expected `string`, found `int`
}
"#,
    );
}

#[test]
fn unknown_module() {
    check_project(
        &[("geo", "")],
        r#"
import nowhere; //~ ERROR cannot resolve module `nowhere`
import geo;
"#,
    );
}

#[test]
fn modules_spread_over_several_units() {
    let mut workspace = Workspace::new();
    let geo = ModulePath::parse("geo").unwrap();
    workspace.add_file("geo/a.bal", geo.clone(), "public function a() returns int { return 1; }");
    workspace.add_file("geo/b.bal", geo, "public function b() returns int { return 2; }");
    let main = workspace.add_file(
        "main.bal",
        ModulePath::parse("main").unwrap(),
        "import geo; function main() { int x = geo:a() + geo:b(); }",
    );

    assert_eq!(check_file(workspace.db(), main), &[]);
}
