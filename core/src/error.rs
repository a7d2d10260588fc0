use thiserror::Error;

use crate::DocId;

/// Errors surfaced by the indexing and retrieval engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A single field of a document could not be indexed. The writer skips the
    /// field and keeps going.
    #[error("cannot index field `{field}` of document {doc} ({source_id}): {reason}")]
    Ingestion {
        doc: DocId,
        source_id: String,
        field: String,
        reason: String,
    },

    #[error("invalid query `{query}` near `{token}`: {reason}")]
    QuerySyntax {
        query: String,
        token: String,
        reason: String,
    },

    #[error("field `{field}`: {reason}")]
    Schema { field: String, reason: String },

    #[error("a write session is already open on this store")]
    WriterBusy,

    #[error("write lease does not belong to this store")]
    ForeignLease,

    #[error("generation {found} does not match the write lease for generation {expected}")]
    GenerationMismatch { expected: u64, found: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn syntax(query: &str, token: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::QuerySyntax {
            query: query.to_string(),
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error only affects one document field and the batch can continue.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Error::Ingestion { .. })
    }
}
