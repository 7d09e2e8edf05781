use std::hint::black_box;

use bal_inputs::TextEdit;
use codspeed_criterion_compat::{
    BenchmarkId, Criterion, Throughput, criterion_group, criterion_main,
};
use text_size::{TextRange, TextSize};

mod fixtures;

fn benchmark_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parser Benchmark");

    for (name, text) in fixtures::CANDIDATES {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse_code", name), &text, |b, &text| {
            b.iter(|| black_box(bal_parse::parse(text)));
        });
    }

    group.finish();
}

fn benchmark_reparse(c: &mut Criterion) {
    let text = fixtures::MEDIUM;
    let parse = bal_parse::parse(text);
    let offset = text.find("total / 2").unwrap_or_default();
    let edit = TextEdit::replace(
        TextRange::at(TextSize::from(offset as u32), TextSize::from(5)),
        "count",
    );

    c.bench_function("reparse_block", |b| {
        b.iter(|| black_box(parse.reparse(&edit)));
    });
}

criterion_group!(benches, benchmark_parser, benchmark_reparse);
criterion_main!(benches);
