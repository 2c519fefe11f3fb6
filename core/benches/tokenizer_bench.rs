use cinedex_core::{Corpus, Document, SearchIndex, Tokenizer};
use criterion::{criterion_group, criterion_main, Criterion};

const TEXT: &str = "A former prisoner of war devises an elaborate escape from a heavily \
guarded camp, while his friends dig tunnels, forge papers and distract the guards \
with increasingly desperate schemes before the final breakout.";

fn bench_tokenize(c: &mut Criterion) {
    let tok = Tokenizer::default();
    c.bench_function("tokenize_description", |b| b.iter(|| tok.tokenize(TEXT)));
}

fn bench_build(c: &mut Criterion) {
    let tok = Tokenizer::default();
    let corpus = Corpus::new((0..500).map(|i| Document::new(i, format!("Movie {i}"), TEXT)).collect());
    c.bench_function("build_500_docs", |b| b.iter(|| SearchIndex::build(&tok, &corpus)));
}

criterion_group!(benches, bench_tokenize, bench_build);
criterion_main!(benches);
