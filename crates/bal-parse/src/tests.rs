use std::fs;
use std::path::{Path, PathBuf};

use bal_errors::DiagnosticCode;
use bal_inputs::{CancellationFlag, TextEdit};
use bal_yellow::ast::{AstNode as _, HasName as _, HasSignature as _, Item};
use bal_yellow::{SyntaxKind, SyntaxNode, TextRange, TextSize, WalkEvent};
use expect_test::expect;

use super::*;

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct TestCase {
    input: PathBuf,
    text: String,
}

impl TestCase {
    fn list() -> Vec<Self> {
        let test_data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_data");

        let mut cases = fs::read_dir(&test_data_dir)
            .unwrap_or_else(|err| {
                panic!("Cannot read directory {}: {err}", test_data_dir.display())
            })
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension()? == "bal" {
                    let text = fs::read_to_string(&path).ok()?;
                    Some(Self { input: path, text })
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        cases.sort();
        cases
    }

    fn name(&self) -> &str {
        self.input.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default()
    }
}

fn kinds(node: &SyntaxNode) -> Vec<SyntaxKind> {
    node.preorder_with_tokens()
        .filter_map(|event| match event {
            WalkEvent::Enter(element) => Some(element.kind()),
            WalkEvent::Leave(_) => None,
        })
        .collect()
}

fn codes(parse: &Parse) -> Vec<DiagnosticCode> {
    parse.diagnostics().iter().map(|diagnostic| diagnostic.code()).collect()
}

fn messages(parse: &Parse) -> Vec<&str> {
    parse.diagnostics().iter().map(|diagnostic| diagnostic.message()).collect()
}

fn count(node: &SyntaxNode, kind: SyntaxKind) -> usize {
    node.descendants().filter(|node| node.kind() == kind).count()
}

fn offset(text: &str, needle: &str) -> TextSize {
    let index = text.find(needle).unwrap_or_else(|| panic!("{needle:?} not in {text:?}"));
    TextSize::new(index as u32)
}

/// Reparses `old` and checks the result against a full parse of the edited
/// text.
fn assert_reparse(old: &Parse, edit: &TextEdit) -> Parse {
    let new_text = edit.apply(&old.syntax_node().text()).expect("edit fits the text");
    let reparsed = old.reparse(edit).expect("edit fits the text");
    let fresh = parse(&new_text);
    assert_eq!(reparsed.syntax_node().text(), new_text);
    assert_eq!(
        reparsed,
        fresh,
        "reparse differs from a full parse after {edit:?}\n--- reparsed\n{}--- fresh\n{}",
        reparsed.debug_tree(),
        fresh.debug_tree()
    );
    reparsed
}

#[test]
fn parse_test_data() {
    let test_cases = TestCase::list();
    assert!(!test_cases.is_empty());

    for case in test_cases {
        let parse = parse(&case.text);
        let root = parse.syntax_node();
        assert_eq!(root.text(), case.text, "{}", case.name());
        assert_eq!(root.kind(), MODULE);
        assert_eq!(parse.status(), Status::Complete);

        let again = super::parse(&root.text());
        assert_eq!(kinds(&again.syntax_node()), kinds(&root), "{}", case.name());

        if case.name().starts_with("ok_") {
            assert!(
                parse.diagnostics().is_empty(),
                "{} has diagnostics:\n{}",
                case.name(),
                parse.debug_tree()
            );
            assert_eq!(count(&root, ERROR), 0, "{}", case.name());
        } else {
            assert!(parse.has_errors(), "{} parsed without errors", case.name());
        }

        let ranges: Vec<_> =
            parse.diagnostics().iter().map(|diagnostic| diagnostic.range().start()).collect();
        assert!(ranges.is_sorted(), "{}", case.name());
        assert!(
            parse.diagnostics().iter().all(|d| d.range().end() <= root.text_range().end()),
            "{}",
            case.name()
        );
    }
}

#[test]
fn reparse_test_data() {
    for case in TestCase::list() {
        let text = &case.text;
        let len = text.len() as u32;
        let step = (len / 40).max(1);
        let old = parse(text);

        for at in (0..len).step_by(step as usize) {
            let at = TextSize::new(at);
            assert_reparse(&old, &TextEdit::insert(at, "x"));
            assert_reparse(&old, &TextEdit::insert(at, " "));
            assert_reparse(&old, &TextEdit::delete(TextRange::at(at, 1.into())));
        }
        assert_reparse(&old, &TextEdit::insert(TextSize::new(len), "\n"));
    }
}

#[test]
fn simple_tree() {
    let parse = parse("int x = 1;");
    expect![[r#"
        MODULE@0..10
          MODULE_VAR_DECL@0..10
            BUILTIN_TYPE@0..4
              INT_KW@0..3 "int"
            NAME@4..5 "x"
            EQ@6..7 "="
            LITERAL@8..9
              DECIMAL_INT@8..9 "1"
            SEMICOLON@9..10 ";"
          EOF@10..10 ""
        Errors:
    "#]]
    .assert_eq(&parse.debug_tree());
}

#[test]
fn add_function() {
    let parse = parse("function add(int x, int y) returns int { return x + y; }");
    assert!(parse.diagnostics().is_empty(), "{}", parse.debug_tree());

    let items: Vec<_> = parse.module().items().collect();
    assert_eq!(items.len(), 1);
    let Item::Function(function) = &items[0] else { panic!("expected a function") };
    assert_eq!(function.name().map(|name| name.text_trimmed().to_owned()).as_deref(), Some("add"));

    let params: Vec<_> = function.param_list().expect("parameters").params().collect();
    assert_eq!(params.len(), 2);
    assert!(function.return_type().is_some());

    let body = function.body().expect("body");
    assert_eq!(count(body.syntax(), RETURN_STMT), 1);
    assert_eq!(count(body.syntax(), BINARY_EXPR), 1);
}

#[test]
fn unclosed_function_body() {
    let text = "function f() { ";
    let parse = parse(text);
    assert_eq!(parse.syntax_node().text(), text);
    assert_eq!(codes(&parse), [DiagnosticCode::MissingToken]);
    assert_eq!(messages(&parse), ["missing `}`"]);
    assert_eq!(parse.diagnostics()[0].range(), TextRange::empty(14.into()));

    let root = parse.syntax_node();
    assert_eq!(count(&root, FUNCTION_DEF), 1);
    let close = root.descendants_tokens().find(|token| token.kind() == RIGHT_BRACE);
    assert!(close.is_some_and(|token| token.is_missing()));
}

#[test]
fn totality() {
    let deep_parens = format!("function f() {{ int x = {}1; }}", "(".repeat(2000));
    let deep_blocks = format!("function f() {}", "{".repeat(2000));
    let deep_mixed = "([{".repeat(1000);
    let deep_unary = format!("int x = {}1;", "-".repeat(2000));
    let deep_types = format!("type T {}int;", "map<".repeat(1000));
    let long_sum = format!("int x = 1{};", " + 1".repeat(5000));
    let long_union = format!("type T int{};", "|int".repeat(5000));
    let long_access = format!("var x = y{};", "[0].z".repeat(5000));
    let bytes: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
    let garbage = String::from_utf8_lossy(&bytes).into_owned();

    let inputs = [
        "",
        " ",
        "\n\n// comment only\n",
        "}}}]]]))) ;;;",
        "function",
        "function f(",
        "class { function",
        "xml `<a><b>${",
        "string `${ string `${",
        "# + \n# `",
        "from int i in",
        "transaction { commit",
        deep_parens.as_str(),
        deep_blocks.as_str(),
        deep_mixed.as_str(),
        deep_unary.as_str(),
        deep_types.as_str(),
        long_sum.as_str(),
        long_union.as_str(),
        long_access.as_str(),
        garbage.as_str(),
    ];

    for text in inputs {
        let parse = parse(text);
        assert_eq!(parse.syntax_node().text(), text);
        assert_eq!(parse.status(), Status::Complete);
    }

    for text in [&deep_parens, &long_sum, &long_union, &long_access] {
        let parse = parse(text);
        assert!(codes(&parse).contains(&DiagnosticCode::NestingTooDeep));
    }

    let parse = parse(&format!("int x = 1{};", " + 1".repeat(200)));
    assert!(parse.diagnostics().is_empty());
}

#[test]
fn nested_templates() {
    let text = "string s = string `a ${ string `b ${c}` } d`;";
    let parse = parse(text);
    assert!(parse.diagnostics().is_empty(), "{}", parse.debug_tree());

    let root = parse.syntax_node();
    assert_eq!(count(&root, STRING_TEMPLATE_EXPR), 2);
    assert_eq!(count(&root, INTERPOLATION), 2);
    assert_eq!(count(&root, NAME_REF), 1);
}

#[test]
fn unterminated_template() {
    let text = "string s = `abc ${x";
    let parse = parse(text);
    assert_eq!(parse.syntax_node().text(), text);
    assert!(codes(&parse).contains(&DiagnosticCode::UnterminatedTemplate));
}

#[test]
fn xml_tag_mismatch() {
    let text = "xml x = xml `<a><b></c></a>`;";
    let parse = parse(text);
    assert_eq!(codes(&parse), [DiagnosticCode::XmlTagMismatch]);
    assert_eq!(messages(&parse), ["mismatched closing tag: expected `</b>`, found `</c>`"]);

    let c = offset(text, "c>");
    assert_eq!(parse.diagnostics()[0].range(), TextRange::at(c, 1.into()));
    assert_eq!(count(&parse.syntax_node(), XML_ELEMENT), 2);
}

#[test]
fn xml_sections() {
    let text = r#"xml x = xml `<?target ${t}?><a k="v ${u}"><![CDATA[x < y]]></a>`;"#;
    let parse = parse(text);
    assert!(parse.diagnostics().is_empty(), "{}", parse.debug_tree());

    let root = parse.syntax_node();
    assert_eq!(count(&root, XML_PI), 1);
    assert_eq!(count(&root, XML_ATTR_VALUE), 1);
    assert_eq!(count(&root, INTERPOLATION), 2);
    assert_eq!(count(&root, NAME_REF), 2);

    let parse = super::parse("xml x = xml `<a k=/>`;");
    assert_eq!(messages(&parse), ["missing attribute value"]);
}

#[test]
fn stray_xml_end_tag() {
    let parse = parse("xml x = xml `</a>`;");
    assert_eq!(messages(&parse), ["closing tag without a matching opening tag"]);
    assert_eq!(count(&parse.syntax_node(), ERROR), 1);
}

#[test]
fn query_keywords_are_contextual() {
    let text = "int[] ys = from int x in xs where x > 1 let int y = x select y;\nint where = 1;";
    let parse = parse(text);
    assert!(parse.diagnostics().is_empty(), "{}", parse.debug_tree());

    let root = parse.syntax_node();
    assert_eq!(count(&root, QUERY_EXPR), 1);
    assert_eq!(count(&root, FROM_CLAUSE), 1);
    assert_eq!(count(&root, WHERE_CLAUSE), 1);
    assert_eq!(count(&root, LET_CLAUSE), 1);
    assert_eq!(count(&root, SELECT_CLAUSE), 1);
    assert_eq!(count(&root, MODULE_VAR_DECL), 2);
}

#[test]
fn query_without_select() {
    let parse = parse("var ys = from var x in xs where x > 1;");
    assert_eq!(messages(&parse), ["missing `select`"]);
}

#[test]
fn shift_operators() {
    let parse = parse("function f() { a >>= 1; b >>>= 2; int c = a >> 1 >>> 2 << 3; d = e > f; }");
    assert!(parse.diagnostics().is_empty(), "{}", parse.debug_tree());

    let root = parse.syntax_node();
    assert_eq!(count(&root, COMPOUND_ASSIGN_STMT), 2);
    assert_eq!(count(&root, BINARY_EXPR), 4);
    assert_eq!(count(&root, ASSIGN_STMT), 1);
}

#[test]
fn declarations_and_expression_statements() {
    let text = "function f() {
    Person p = {name: \"a\"};
    foo:Bar q;
    foo(x);
    foo:bar(x);
    x[0] = 1;
    a.b = c;
    T t;
    x = y;
}";
    let parse = parse(text);
    assert!(parse.diagnostics().is_empty(), "{}", parse.debug_tree());

    let root = parse.syntax_node();
    assert_eq!(count(&root, LOCAL_VAR_DECL), 3);
    assert_eq!(count(&root, EXPR_STMT), 2);
    assert_eq!(count(&root, ASSIGN_STMT), 3);
    assert_eq!(count(&root, QUALIFIED_NAME_REF), 1);
    assert_eq!(count(&root, MAPPING_CONSTRUCTOR), 1);
}

#[test]
fn arrow_functions_and_parens() {
    let parse = parse("var f = (a, b) => a + b;\nvar g = (a);\nvar h = x => x;\nvar n = ();");
    assert!(parse.diagnostics().is_empty(), "{}", parse.debug_tree());

    let root = parse.syntax_node();
    assert_eq!(count(&root, ARROW_FUNCTION), 2);
    assert_eq!(count(&root, PAREN_EXPR), 1);
    assert_eq!(count(&root, NIL_LITERAL), 1);
}

#[test]
fn precedence() {
    let parse = parse("int x = 1 + 2 * 3 == 7 && true;");
    let root = parse.syntax_node();
    let outer = root.descendants().find(|node| node.kind() == BINARY_EXPR).expect("binary");
    let op = outer
        .children_with_tokens()
        .find_map(NodeOrToken::into_token)
        .map(|token| token.kind());
    assert_eq!(op, Some(AMP2));
}

#[test]
fn recovery_keeps_later_items() {
    let text = "function f( { int x = ; }\n$$ function g() {}\ntype T int;";
    let parse = parse(text);
    assert_eq!(parse.syntax_node().text(), text);
    assert!(parse.has_errors());

    let names: Vec<_> = parse
        .module()
        .items()
        .filter_map(|item| item.name())
        .map(|name| name.text_trimmed().to_owned())
        .collect();
    assert_eq!(names, ["f", "g", "T"]);
}

#[test]
fn missing_semicolon_is_inserted() {
    let parse = parse("function f() { int x = 1 int y = 2; }");
    assert_eq!(messages(&parse), ["missing `;`"]);
    assert_eq!(count(&parse.syntax_node(), LOCAL_VAR_DECL), 2);
}

#[test]
fn duplicate_qualifier() {
    let parse = parse("public public function f() {}");
    assert_eq!(codes(&parse), [DiagnosticCode::DuplicateQualifier]);
}

#[test]
fn documentation_lines() {
    let parse = parse("# Adds.\n# + x - value\n# + return - result\nfunction f(int x) returns int { return x; }");
    assert!(parse.diagnostics().is_empty(), "{}", parse.debug_tree());

    let root = parse.syntax_node();
    assert_eq!(count(&root, DOCUMENTATION), 1);
    assert_eq!(count(&root, DOC_PARAM_LINE), 2);
    assert_eq!(count(&root, DOC_LINE), 1);
}

#[test]
fn relex_single_token() {
    let text = "function first() { int alpha = 1; }\nfunction second() { return; }";
    let old = parse(text);
    let edit = TextEdit::insert(offset(text, "pha"), "x");
    let new = assert_reparse(&old, &edit);

    let old_second = old.module().items().nth(1).expect("second");
    let new_second = new.module().items().nth(1).expect("second");
    assert!(old_second.syntax().green().ptr_eq(new_second.syntax().green()));
}

#[test]
fn relex_rejects_kind_changes() {
    let text = "function f() { int ab = 1; }";
    assert_reparse(&parse(text), &TextEdit::replace(TextRange::at(offset(text, "ab"), 2.into()), "if"));
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "ab") + TextSize::new(1), " "));
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "1"), "\""));
}

#[test]
fn relex_keeps_diagnostics() {
    let text = "function f() { int ab = 1 }\nint y = \"bad \\q\";";
    let old = parse(text);
    assert_eq!(old.diagnostics().len(), 2);

    let new = assert_reparse(&old, &TextEdit::insert(offset(text, "ab"), "c"));
    assert_eq!(new.diagnostics().len(), 2);
    let fixed = assert_reparse(&old, &TextEdit::delete(TextRange::at(offset(text, "\\q"), 2.into())));
    assert_eq!(codes(&fixed), [DiagnosticCode::MissingToken]);
}

#[test]
fn reparse_block() {
    let text = "function first() { int a = 1; }\nfunction second() {\n    int b = 2;\n}\n";
    let old = parse(text);
    let edit = TextEdit::insert(offset(text, "    int b"), "    b = b + 1;\n");
    let new = assert_reparse(&old, &edit);

    let old_first = old.module().items().next().expect("first");
    let new_first = new.module().items().next().expect("first");
    assert!(old_first.syntax().green().ptr_eq(new_first.syntax().green()));
    assert_eq!(count(&new.syntax_node(), ASSIGN_STMT), 1);
}

#[test]
fn reparse_block_with_errors() {
    let text = "function f() {\n    int x = 1\n}\nfunction g() {\n    int y = ;\n}\n";
    let old = parse(text);
    assert_eq!(old.diagnostics().len(), 2);

    let new = assert_reparse(&old, &TextEdit::insert(offset(text, "\n}\nfunction g"), ";"));
    assert_eq!(messages(&new), ["expected expression"]);
}

#[test]
fn reparse_class_body() {
    let text = "class C {\n    int x = 0;\n}\nfunction f() {}\n";
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "}\nfunction"), "    function get() returns int { return self.x; }\n"));
}

#[test]
fn reparse_falls_back_when_braces_change() {
    let text = "function f() {\n    int x = 1;\n}\nfunction g() {}\n";
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "    int x"), "}"));
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "    int x"), "{"));
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "    int x"), "`"));
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "    int x"), "string s = \""));
    assert_reparse(&parse(text), &TextEdit::delete(TextRange::at(offset(text, "}\nfunction g"), 1.into())));
}

#[test]
fn reparse_inside_templates_and_queries() {
    let text = "function f() {\n    string s = `a ${ function () { int x = 1; } } b`;\n    var q = from int i in xs select function () { int y = 2; };\n}\n";
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "int x"), "x = 2; "));
    assert_reparse(&parse(text), &TextEdit::insert(offset(text, "int y"), "select;"));
}

#[test]
fn reparse_rejects_bad_edits() {
    let text = "int é = 1;";
    let parse = parse(text);
    assert_eq!(parse.reparse(&TextEdit::insert(5.into(), "x")), None);
    assert_eq!(parse.reparse(&TextEdit::delete(TextRange::new(0.into(), 100.into()))), None);
}

#[test]
fn cancellation_returns_partial_tree() {
    let flag = CancellationFlag::new();
    flag.cancel();
    let text = "function f() { int x = 1; }\nfunction g() {}";
    let parse = parse_with(text, &flag);
    assert_eq!(parse.status(), Status::Cancelled);
    assert!(parse.diagnostics().is_empty());
    assert_eq!(parse.syntax_node().kind(), MODULE);

    assert_eq!(parse.reparse(&TextEdit::insert(0.into(), " ")), None);
}
