use lexis_core::overrides::suffix_boost;
use lexis_core::{
    Analyzer, Document, Engine, EngineConfig, Error, ExtractedDocument, Field, FsStore, IndexWriter, Language,
    MemoryStore, Query, Schema, Searcher, Store,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn extracted(path: &str, text: &str, meta: &[(&str, &str)]) -> ExtractedDocument {
    ExtractedDocument {
        source_id: path.to_string(),
        text: text.to_string(),
        metadata: meta.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
    }
}

fn engine() -> Engine {
    Engine::in_memory(EngineConfig::default())
}

fn paths(hits: &[lexis_core::SearchHit]) -> Vec<String> {
    hits.iter().filter_map(|h| h.path.clone()).collect()
}

#[test]
fn pdf_override_ranks_pdf_first() {
    let engine = engine();
    engine
        .reindex(vec![
            extracted("b.txt", "cautare lenta", &[]),
            extracted("a.pdf", "cautare rapida", &[]),
        ])
        .unwrap();

    let pdf = suffix_boost("path", ".pdf", 2.0);
    let hits = engine.search_with("cautare", "contents", 10, Some(&pdf)).unwrap();
    assert_eq!(paths(&hits), vec!["a.pdf", "b.txt"]);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn every_analyzed_term_finds_its_document() {
    let engine = engine();
    let texts = [
        ("one.txt", "Regăsirea informaţiei este un domeniu vast"),
        ("two.txt", "motoarele de căutare folosesc indexuri inversate"),
        ("three.txt", "documentele PDF au metadate şi titluri"),
    ];
    engine.reindex(texts.iter().map(|(p, t)| extracted(p, t, &[]))).unwrap();

    let analyzer = engine.config().analyzer();
    for (path, text) in texts {
        for term in analyzer.analyze(text) {
            let hits = engine
                .searcher()
                .unwrap()
                .search(&Query::term("contents", term.clone()), 10, None);
            let found = hits.hits.iter().any(|h| {
                engine.stored(h.doc_id).unwrap().unwrap()["path"][0] == path
            });
            assert!(found, "{path} not found for term {term}");
        }
    }
}

#[test]
fn title_boost_outranks_contents_match() {
    let engine = engine();
    engine
        .reindex(vec![
            extracted("titled.txt", "", &[("title", "arhitectura")]),
            extracted("plain.txt", "arhitectura", &[]),
        ])
        .unwrap();
    let hits = engine.search("title:arhitectura OR arhitectura", "contents", 10).unwrap();
    assert_eq!(paths(&hits), vec!["titled.txt", "plain.txt"]);
}

#[test]
fn contents_metadata_key_does_not_hide_body_text() {
    let engine = engine();
    let report = engine
        .reindex(vec![
            extracted("a.pdf", "cautare rapida", &[("Contents", "table of contents")]),
            extracted("b.txt", "cautare lenta", &[]),
        ])
        .unwrap();
    assert!(report.skipped_fields.is_empty(), "{:?}", report.skipped_fields);
    let hits = engine.search("cautare", "contents", 10).unwrap();
    assert_eq!(paths(&hits).len(), 2);
}

#[test]
fn unbounded_limit_returns_every_match() {
    let engine = engine();
    engine
        .reindex((0..3).map(|i| extracted(&format!("{i}.txt"), "cautare", &[])))
        .unwrap();
    assert_eq!(engine.search("cautare", "contents", usize::MAX).unwrap().len(), 3);
    assert_eq!(engine.search("cautare", "contents", 1 << 40).unwrap().len(), 3);
}

#[test]
fn override_never_changes_the_matching_set() {
    let engine = engine();
    let docs: Vec<_> = (0..20)
        .map(|i| {
            let ext = if i % 3 == 0 { "pdf" } else { "txt" };
            let text = if i % 2 == 0 { "index rapid" } else { "index index lent" };
            extracted(&format!("{i}.{ext}"), text, &[])
        })
        .collect();
    engine.reindex(docs).unwrap();

    let plain = engine.search("index", "contents", 20).unwrap();
    let pdf = suffix_boost("path", ".pdf", 5.0);
    let boosted = engine.search_with("index", "contents", 20, Some(&pdf)).unwrap();
    let mut a = paths(&plain);
    let mut b = paths(&boosted);
    assert_eq!(a.len(), 20);
    assert_ne!(a, b);
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn search_is_idempotent() {
    let engine = engine();
    engine
        .reindex((0..10).map(|i| extracted(&format!("{i}.txt"), "same text every time", &[])))
        .unwrap();
    let first = engine.search("text", "contents", 5).unwrap();
    let second = engine.search("text", "contents", 5).unwrap();
    assert_eq!(first, second);
    assert_eq!(paths(&first), vec!["0.txt", "1.txt", "2.txt", "3.txt", "4.txt"]);
}

#[test]
fn empty_commit_is_searchable() {
    let store = Arc::new(MemoryStore::new());
    let mut writer = IndexWriter::open(store.clone(), Schema::new(Analyzer::standard())).unwrap();
    writer.delete_all();
    let generation = writer.commit().unwrap();
    assert_eq!(generation.num_docs, 0);

    let searcher = Searcher::new(store.open_for_read().unwrap());
    let query = searcher.parse("anything at all", "contents").unwrap();
    assert_eq!(searcher.search(&query, 10, None).total_hits, 0);
}

#[test]
fn search_before_any_commit_returns_nothing() {
    assert!(engine().search("cautare", "contents", 10).unwrap().is_empty());
}

#[test]
fn unknown_field_returns_no_results() {
    let engine = engine();
    engine.reindex(vec![extracted("a.pdf", "cautare", &[])]).unwrap();
    assert!(engine.search("cautare", "nonexistent", 10).unwrap().is_empty());
    assert!(engine.search("nonexistent:cautare", "contents", 10).unwrap().is_empty());
}

#[test]
fn syntax_errors_surface() {
    let engine = engine();
    assert!(matches!(engine.search("  ", "contents", 10), Err(Error::QuerySyntax { .. })));
    assert!(matches!(engine.search("cautare", "bad field", 10), Err(Error::QuerySyntax { .. })));
}

#[test]
fn keywords_are_exact_matches() {
    let engine = engine();
    engine
        .reindex(vec![
            extracted("a.pdf", "text", &[("Keywords", "Rust, Lucene")]),
            extracted("b.pdf", "text", &[("Keywords", "rust")]),
        ])
        .unwrap();
    assert_eq!(paths(&engine.search("Rust", "keywords", 10).unwrap()), vec!["a.pdf"]);
    assert_eq!(paths(&engine.search("field=keywords rust", "contents", 10).unwrap()), vec!["b.pdf"]);
}

#[test]
fn explanation_is_attached() {
    let engine = engine();
    engine.reindex(vec![extracted("a.pdf", "cautare", &[])]).unwrap();
    let hits = engine.search("cautare", "contents", 1).unwrap();
    assert!(hits[0].explanation.contains("idf"));
}

#[test]
fn reindex_replaces_previous_generation() {
    let engine = engine();
    engine.reindex(vec![extracted("old.txt", "vechi", &[])]).unwrap();
    let report = engine.reindex(vec![extracted("new.txt", "nou", &[])]).unwrap();
    assert_eq!(report.generation, 2);
    assert_eq!(report.indexed, 1);
    assert!(engine.search("vechi", "contents", 10).unwrap().is_empty());
    assert_eq!(paths(&engine.search("nou", "contents", 10).unwrap()), vec!["new.txt"]);
}

#[test]
fn open_searcher_survives_reindex() {
    let engine = engine();
    engine.reindex(vec![extracted("old.txt", "vechi", &[])]).unwrap();
    let before = engine.searcher().unwrap();
    engine.reindex(vec![extracted("new.txt", "nou", &[])]).unwrap();

    let q = before.parse("vechi", "contents").unwrap();
    assert_eq!(before.search(&q, 10, None).total_hits, 1);
    assert_eq!(engine.searcher().unwrap().search(&q, 10, None).total_hits, 0);
}

#[test]
fn concurrent_searchers_agree() {
    let engine = engine();
    engine
        .reindex((0..50).map(|i| extracted(&format!("{i}.txt"), if i % 2 == 0 { "par" } else { "impar" }, &[])))
        .unwrap();
    let searcher = engine.searcher().unwrap();
    let query = searcher.parse("par", "contents").unwrap();
    let expected = searcher.search(&query, 100, None);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| searcher.search(&query, 100, None)))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn fs_engine_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig { index_location: dir.path().to_path_buf(), ..EngineConfig::default() };
    Engine::open(config.clone())
        .unwrap()
        .reindex(vec![extracted("a.pdf", "cautare rapida", &[("title", "Raport")])])
        .unwrap();

    let reopened = Engine::open(config).unwrap();
    let hits = reopened.search("raport", "title", 10).unwrap();
    assert_eq!(paths(&hits), vec!["a.pdf"]);
    assert_eq!(reopened.stored(0).unwrap().unwrap()["title"], vec!["Raport"]);
}

#[test]
fn second_writer_is_refused_while_first_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn Store> = Arc::new(FsStore::open(dir.path()).unwrap());
    let schema = Schema::new(Analyzer::for_language(Language::Romanian));
    let mut first = IndexWriter::open(store.clone(), schema.clone()).unwrap();
    assert!(matches!(IndexWriter::open(store.clone(), schema.clone()), Err(Error::WriterBusy)));
    first.add_document(Document::new("a").with(Field::keyword("path", "a").store()));
    first.commit().unwrap();
    assert!(IndexWriter::open(store, schema).is_ok());
}
