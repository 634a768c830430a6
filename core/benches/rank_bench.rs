use criterion::{criterion_group, criterion_main, Criterion};
use quarry::document::Document;
use quarry::rank::term_counts;
use quarry::{Dictionary, VectorModel};

fn synthetic_corpus(num_docs: u32, terms_per_doc: usize) -> Vec<Document> {
    (0..num_docs)
        .map(|id| {
            let terms = (0..terms_per_doc)
                .map(|i| format!("term{}", (id as usize * 31 + i * 7) % 500))
                .collect();
            Document::new(id, terms)
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let docs = synthetic_corpus(1_000, 50);
    let dictionary = Dictionary::build(&docs).unwrap();
    let model = VectorModel::build(&docs, &dictionary).unwrap();
    let query: Vec<String> = vec!["term1".into(), "term42".into(), "term99".into()];
    let vector = model.query_vector(&term_counts(&query));
    c.bench_function("rank_1k_docs_top10", |b| {
        b.iter(|| model.rank(&vector, 10).unwrap())
    });
}

criterion_group!(benches, bench_rank);
criterion_main!(benches);
