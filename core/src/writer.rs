use std::collections::HashMap;
use std::sync::Arc;

use crate::document::{Document, Field, FieldKind};
use crate::error::{Error, Result};
use crate::index::{Generation, GenerationBuilder};
use crate::schema::Schema;
use crate::store::{Store, WriteLease};
use crate::DocId;

/// Single-writer session building the next generation of a [`Store`].
///
/// Nothing is visible to readers until [`IndexWriter::commit`]. Dropping the
/// writer without committing leaves the previous generation in place.
pub struct IndexWriter {
    store: Arc<dyn Store>,
    lease: WriteLease,
    schema: Schema,
    builder: GenerationBuilder,
    skipped: Vec<Error>,
}

impl IndexWriter {
    /// Open a session. `schema` supplies the analyzers; fields are registered as documents arrive.
    pub fn open(store: Arc<dyn Store>, schema: Schema) -> Result<Self> {
        let lease = store.open_for_write()?;
        Ok(Self { store, lease, schema, builder: GenerationBuilder::default(), skipped: Vec::new() })
    }

    /// Field-level failures skipped so far in this session.
    pub fn ingestion_errors(&self) -> &[Error] {
        &self.skipped
    }

    /// Discard every document added in this session. Sessions always start
    /// empty, so the committed generation is replaced wholesale on commit.
    pub fn delete_all(&mut self) {
        self.builder = GenerationBuilder::default();
        self.schema.clear_fields();
        self.skipped.clear();
    }

    /// Index one document and return its dense id.
    ///
    /// A field that cannot be indexed is logged, recorded and skipped; the rest
    /// of the document still goes in.
    pub fn add_document(&mut self, doc: Document) -> DocId {
        let doc_id = self.builder.push_doc();
        for field in doc.fields {
            if let Err(err) = self.add_field(doc_id, &doc.source_id, field) {
                tracing::warn!(error = %err, "skipping field");
                self.skipped.push(err);
            }
        }
        doc_id
    }

    fn add_field(&mut self, doc: DocId, source_id: &str, field: Field) -> Result<()> {
        let reject = |reason: String| Error::Ingestion {
            doc,
            source_id: source_id.to_string(),
            field: field.name.clone(),
            reason,
        };
        if field.name.trim().is_empty() {
            return Err(reject("empty field name".into()));
        }
        if !field.boost.is_finite() || field.boost < 0.0 {
            return Err(reject(format!("boost must be finite and non-negative, got {}", field.boost)));
        }

        if field.kind.is_indexed() {
            let entry = self.schema.register(&field.name, field.kind).map_err(|e| reject(e.to_string()))?;
            let terms = match field.kind {
                FieldKind::IndexedTokenized => entry.analyzer.analyze(&field.value),
                FieldKind::IndexedUntokenized if field.value.is_empty() => Vec::new(),
                _ => vec![field.value.clone()],
            };

            let length = terms.len() as u32;
            let mut tf: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *tf.entry(term).or_insert(0) += 1;
            }
            for (term, count) in tf {
                self.builder.add_occurrences(&field.name, term, doc, count);
            }
            self.builder.add_norm(&field.name, doc, length, field.boost);
        }

        if field.stored {
            self.builder.store(doc, &field.name, field.value);
        }
        Ok(())
    }

    /// Publish the session's documents as the new generation.
    pub fn commit(self) -> Result<Arc<Generation>> {
        let IndexWriter { store, lease, schema, builder, skipped } = self;
        let generation = builder.finish(lease.generation(), schema);
        tracing::info!(
            generation = generation.number,
            num_docs = generation.num_docs,
            skipped_fields = skipped.len(),
            "committing"
        );
        store.commit(&lease, generation)
    }
}
