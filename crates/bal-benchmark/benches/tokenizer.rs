use codspeed_criterion_compat::{
    Criterion, Throughput, black_box, criterion_group, criterion_main,
};

static SOURCE: &str = "
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
function f(int a) returns int|error { return a >>> 2 ?: check g(a) ... 3; }
";

static TEMPLATES: &str = "
string s = string `hello ${name}, you are ${age + 1} years old`;
xml x = xml `<greeting lang=\"en\"><name>${name}</name><!-- note --></greeting>`;
string s = string `hello ${name}, you are ${age + 1} years old`;
xml x = xml `<greeting lang=\"en\"><name>${name}</name><!-- note --></greeting>`;
string s = string `hello ${name}, you are ${age + 1} years old`;
xml x = xml `<greeting lang=\"en\"><name>${name}</name><!-- note --></greeting>`;
string s = string `hello ${name}, you are ${age + 1} years old`;
xml x = xml `<greeting lang=\"en\"><name>${name}</name><!-- note --></greeting>`;
";

static CANDIDATES: [(&str, &str); 2] =
    [("keywords_operators_and_punctuators", SOURCE), ("templates", TEMPLATES)];

fn iterate(s: &str) {
    use bal_tokenizer::{SyntaxKind, Tokenizer};

    let mut tokenizer = Tokenizer::new(s);

    loop {
        let next_token = tokenizer.next_token();

        if next_token.kind == SyntaxKind::EOF {
            break;
        }

        black_box(next_token);
    }
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for (name, source) in CANDIDATES {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(name, &source, |b, &s| b.iter(|| iterate(s)));
    }
}

criterion_group!(benches, bench_iterate);
criterion_main!(benches);
