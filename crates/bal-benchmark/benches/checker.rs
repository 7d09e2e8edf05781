use std::hint::black_box;

use bal_analysis::NoModules;
use bal_inputs::NeverCancel;
use codspeed_criterion_compat::{
    BenchmarkId, Criterion, Throughput, criterion_group, criterion_main,
};

mod fixtures;

fn benchmark_checker(c: &mut Criterion) {
    let mut group = c.benchmark_group("Checker Benchmark");

    for (name, text) in fixtures::CANDIDATES {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("analyze", name), &text, |b, &text| {
            b.iter(|| black_box(bal_analysis::analyze(text, &NoModules, &NeverCancel)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_checker);
criterion_main!(benches);
