use serde::Serialize;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::document::{ExtractedDocument, PATH_FIELD};
use crate::error::Result;
use crate::index::StoredFields;
use crate::search::{ScoreOverride, Searcher};
use crate::store::{FsStore, MemoryStore, Store};
use crate::writer::IndexWriter;
use crate::DocId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    /// `None` for documents indexed without a `path` field.
    pub path: Option<String>,
    pub score: f32,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    pub generation: u64,
    pub indexed: u32,
    pub skipped_fields: Vec<String>,
}

/// Ties a configuration to a store: full reindex on one side, search on the other.
pub struct Engine {
    config: EngineConfig,
    store: Arc<dyn Store>,
}

impl Engine {
    pub fn new(config: EngineConfig, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    /// Engine over the on-disk store at `config.index_location`.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let store = FsStore::open(&config.index_location)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn writer(&self) -> Result<IndexWriter> {
        IndexWriter::open(self.store.clone(), self.config.schema())
    }

    pub fn searcher(&self) -> Result<Searcher> {
        Ok(Searcher::new(self.store.open_for_read()?))
    }

    /// Replace the whole index with `docs`.
    pub fn reindex<I>(&self, docs: I) -> Result<IndexReport>
    where
        I: IntoIterator<Item = ExtractedDocument>,
    {
        let policy = self.config.ingest_policy();
        let mut writer = self.writer()?;
        writer.delete_all();
        for extracted in docs {
            let doc_id = writer.add_document(policy.to_document(&extracted));
            tracing::debug!(doc_id, source = %extracted.source_id, "indexed");
        }
        let skipped_fields = writer.ingestion_errors().iter().map(ToString::to_string).collect();
        let generation = writer.commit()?;
        Ok(IndexReport { generation: generation.number, indexed: generation.num_docs, skipped_fields })
    }

    pub fn search(&self, query: &str, field: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.search_with(query, field, limit, None)
    }

    /// Search the latest generation, rescoring candidates with `rescorer` if given.
    pub fn search_with(
        &self,
        query: &str,
        field: &str,
        limit: usize,
        rescorer: Option<&dyn ScoreOverride>,
    ) -> Result<Vec<SearchHit>> {
        let searcher = self.searcher()?;
        let parsed = searcher.parse(query, field)?;
        let top = searcher.search(&parsed, limit, rescorer);
        tracing::info!(query, field, parsed = %parsed, total_hits = top.total_hits, "search");

        Ok(top
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                doc_id: hit.doc_id,
                path: searcher.generation().stored_value(hit.doc_id, PATH_FIELD).map(str::to_string),
                score: hit.score,
                explanation: searcher.explain(&parsed, hit.doc_id).to_string(),
            })
            .collect())
    }

    pub fn stored(&self, doc: DocId) -> Result<Option<StoredFields>> {
        Ok(self.store.open_for_read()?.stored(doc).cloned())
    }
}
