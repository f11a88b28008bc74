#[macro_use]
extern crate criterion;

#[cfg(feature = "jemallocator")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

use core::time::Duration;
use criterion::{BatchSize, Criterion, Throughput, criterion_group};
use tape_json::{Document, Parser};

/// A record-heavy document in the spirit of the usual twitter.json corpus,
/// built in memory so the bench has no fixture dependency.
fn synthetic_doc(records: usize) -> Vec<u8> {
    let mut out = String::with_capacity(records * 120);
    out.push_str(r#"{"statuses":["#);
    for i in 0..records {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!(
            r#"{{"id":{i},"text":"status update number {i} with some body text","user":{{"name":"user_{i}","verified":{}}},"retweets":{},"score":{}.5}}"#,
            i % 7 == 0,
            i * 3 % 1000,
            i % 89,
        ));
    }
    out.push_str("]}");
    out.into_bytes()
}

fn bench_parse_tape(c: &mut Criterion) {
    let core_ids = core_affinity::get_core_ids().unwrap();
    core_affinity::set_for_current(core_ids[0]);

    let data = synthetic_doc(8192);

    let mut group = c.benchmark_group("parse_tape");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group
        .warm_up_time(Duration::from_secs(5))
        .measurement_time(Duration::from_secs(20));

    let mut parser = Parser::default();
    let mut doc = Document::default();

    group.bench_with_input("tape_json::parse_into", &data, |b, data| {
        b.iter_batched(
            || (),
            |()| parser.parse_into(data, &mut doc).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_parse_tape);
criterion_main!(benches);
