//! Single-node full-text indexing and retrieval.
//!
//! Documents go through an [`Analyzer`] into an [`IndexWriter`], which commits
//! immutable [`Generation`]s to a [`Store`]. A [`Searcher`] evaluates a
//! [`Query`] against one generation and can rescore results with a
//! [`ScoreOverride`].

pub mod analysis;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod overrides;
pub mod query;
pub mod schema;
pub mod search;
pub mod store;
pub mod writer;

pub type DocId = u32;

/// A normalized token. Compared byte-wise.
pub type Term = String;

pub use analysis::{Analyzer, Language};
pub use config::EngineConfig;
pub use document::{Document, ExtractedDocument, Field, FieldKind, IngestPolicy};
pub use engine::{Engine, IndexReport, SearchHit};
pub use error::{Error, Result};
pub use index::{Generation, Posting, StoredFields};
pub use query::{Query, QueryParser};
pub use schema::Schema;
pub use search::{Explanation, Hit, ScoreOverride, Searcher, TopDocs};
pub use store::{FsStore, MemoryStore, Store};
pub use writer::IndexWriter;
