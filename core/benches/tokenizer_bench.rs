use criterion::{criterion_group, criterion_main, Criterion};
use cinedex_core::tokenizer::tokenize;

const OVERVIEW: &str = "Set in the 22nd century, The Matrix tells the story of a computer hacker who joins a group \
of underground insurgents fighting the vast and powerful computers who now rule the earth. \
Thomas A. Anderson is a man living two lives: by day he is an average computer programmer, by night \
a malevolent hacker known as Neo. Neo has always questioned his reality, but the truth is far beyond \
his imagination.";

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_overview", |b| b.iter(|| tokenize(OVERVIEW)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
