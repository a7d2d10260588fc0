use criterion::{criterion_group, criterion_main, Criterion};
use lexis_core::{Analyzer, Language};

const TEXT: &str = "Regăsirea informaţiei se ocupă cu găsirea documentelor relevante \
pentru o cerere formulată de utilizator. Motoarele de căutare construiesc un index \
inversat care asociază fiecărui termen lista documentelor în care apare.";

fn bench_analyze(c: &mut Criterion) {
    let romanian = Analyzer::for_language(Language::Romanian);
    let standard = Analyzer::standard();
    c.bench_function("analyze_romanian", |b| b.iter(|| romanian.analyze(TEXT)));
    c.bench_function("analyze_standard", |b| b.iter(|| standard.analyze(TEXT)));
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
