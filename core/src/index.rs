use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::schema::Schema;
use crate::DocId;

pub type TermId = u32;

/// Stored values of one document: field name to values in insertion order.
pub type StoredFields = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

/// Per-document statistics of one field, used for length normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldNorm {
    /// Tokens (text fields) or values (keyword fields) across all instances.
    pub length: u32,
    /// Product of the boosts of all instances.
    pub boost: f32,
}

impl Default for FieldNorm {
    fn default() -> Self {
        Self { length: 0, boost: 1.0 }
    }
}

/// One immutable, committed snapshot of the inverted index.
///
/// Posting lists are sorted by `doc_id` with no duplicate entries.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Generation {
    pub number: u64,
    pub schema: Schema,
    /// field -> term -> term id
    pub dictionary: HashMap<String, HashMap<String, TermId>>,
    /// indexed by term id
    pub postings: Vec<Vec<Posting>>,
    /// field -> norms indexed by doc id
    pub norms: HashMap<String, Vec<FieldNorm>>,
    /// indexed by doc id
    pub stored: Vec<StoredFields>,
    pub num_docs: u32,
}

impl Generation {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn term_id(&self, field: &str, term: &str) -> Option<TermId> {
        self.dictionary.get(field)?.get(term).copied()
    }

    /// Posting list of `(field, term)`, empty when the pair was never indexed.
    pub fn postings(&self, field: &str, term: &str) -> &[Posting] {
        match self.term_id(field, term) {
            Some(id) => &self.postings[id as usize],
            None => &[],
        }
    }

    pub fn doc_freq(&self, field: &str, term: &str) -> u32 {
        self.postings(field, term).len() as u32
    }

    pub fn norm(&self, field: &str, doc: DocId) -> FieldNorm {
        self.norms
            .get(field)
            .and_then(|n| n.get(doc as usize))
            .copied()
            .unwrap_or_default()
    }

    pub fn stored(&self, doc: DocId) -> Option<&StoredFields> {
        self.stored.get(doc as usize)
    }

    /// First stored value of `field` for `doc`.
    pub fn stored_value(&self, doc: DocId, field: &str) -> Option<&str> {
        self.stored(doc)?.get(field)?.first().map(String::as_str)
    }
}

/// Mutable accumulator the writer fills before freezing it into a [`Generation`].
#[derive(Debug, Default)]
pub(crate) struct GenerationBuilder {
    dictionary: HashMap<String, HashMap<String, TermId>>,
    postings: Vec<Vec<Posting>>,
    norms: HashMap<String, Vec<FieldNorm>>,
    stored: Vec<StoredFields>,
}

impl GenerationBuilder {
    pub fn num_docs(&self) -> u32 {
        self.stored.len() as u32
    }

    /// Reserve the next dense doc id.
    pub fn push_doc(&mut self) -> DocId {
        self.stored.push(StoredFields::new());
        self.stored.len() as DocId - 1
    }

    fn term_id(&mut self, field: &str, term: String) -> TermId {
        let next = self.postings.len() as TermId;
        let terms = self.dictionary.entry(field.to_string()).or_default();
        let id = *terms.entry(term).or_insert(next);
        if id == next {
            self.postings.push(Vec::new());
        }
        id
    }

    /// Add `tf` occurrences of `term` in `field` for `doc`.
    ///
    /// Docs are added in increasing id order, so appending keeps lists sorted;
    /// a repeat for the last doc bumps its frequency instead.
    pub fn add_occurrences(&mut self, field: &str, term: String, doc: DocId, tf: u32) {
        let id = self.term_id(field, term);
        let list = &mut self.postings[id as usize];
        match list.last_mut() {
            Some(last) if last.doc_id == doc => last.term_frequency += tf,
            _ => list.push(Posting { doc_id: doc, term_frequency: tf }),
        }
    }

    pub fn add_norm(&mut self, field: &str, doc: DocId, length: u32, boost: f32) {
        let norms = self.norms.entry(field.to_string()).or_default();
        if norms.len() <= doc as usize {
            norms.resize(doc as usize + 1, FieldNorm::default());
        }
        let norm = &mut norms[doc as usize];
        norm.length += length;
        norm.boost *= boost;
    }

    pub fn store(&mut self, doc: DocId, field: &str, value: String) {
        self.stored[doc as usize].entry(field.to_string()).or_default().push(value);
    }

    pub fn finish(self, number: u64, schema: Schema) -> Generation {
        let num_docs = self.num_docs();
        Generation {
            number,
            schema,
            dictionary: self.dictionary,
            postings: self.postings,
            norms: self.norms,
            stored: self.stored,
            num_docs,
        }
    }
}
