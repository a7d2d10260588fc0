//! In-memory document model and the mapping from extracted text + metadata.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

lazy_static! {
    static ref KEYWORD_SEPARATOR: Regex = Regex::new(r"[,\s]+").expect("valid regex");
}

pub const PATH_FIELD: &str = "path";
pub const CONTENTS_FIELD: &str = "contents";
pub const TITLE_FIELD: &str = "title";
pub const KEYWORDS_FIELD: &str = "keywords";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Retrievable verbatim, not searchable.
    Stored,
    /// Analyzed into terms and scored.
    IndexedTokenized,
    /// Indexed as one exact-match term.
    IndexedUntokenized,
}

impl FieldKind {
    pub fn is_indexed(self) -> bool {
        !matches!(self, FieldKind::Stored)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub value: String,
    /// Index-time relevance weight, must be finite and non-negative.
    pub boost: f32,
    /// Whether the raw value is kept for retrieval. Always true for `Stored`.
    pub stored: bool,
}

impl Field {
    fn new(name: impl Into<String>, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
            boost: 1.0,
            stored: kind == FieldKind::Stored,
        }
    }

    pub fn stored(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Stored, value)
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FieldKind::IndexedTokenized, value)
    }

    pub fn keyword(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FieldKind::IndexedUntokenized, value)
    }

    /// Also keep the raw value for retrieval.
    pub fn store(mut self) -> Self {
        self.stored = true;
        self
    }

    /// Multiply the field's current weight by `factor`.
    pub fn boosted(mut self, factor: f32) -> Self {
        self.boost *= factor;
        self
    }
}

/// One record: an ordered list of fields. Field names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier used in log lines and errors.
    pub source_id: String,
    pub fields: Vec<Field>,
}

impl Document {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), fields: Vec::new() }
    }

    pub fn add(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn with(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields.iter().filter(move |f| f.name == name).map(|f| f.value.as_str())
    }
}

/// Output of the text-extraction collaborator for one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    #[serde(alias = "path", alias = "id")]
    pub source_id: String,
    #[serde(default, alias = "body", alias = "contents")]
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Weights applied while mapping extracted documents onto fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IngestPolicy {
    pub title_boost: f32,
    pub contents_boost: f32,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self { title_boost: 3.0, contents_boost: 2.0 }
    }
}

impl IngestPolicy {
    /// Build the document for one extracted source.
    ///
    /// `keywords` splits into several exact-match fields, `title` becomes a
    /// boosted text field, every other key is stored and indexed verbatim.
    /// Blank values are dropped. The body text lands in an unstored `contents`
    /// field and the source identifier in a stored `path` keyword; metadata keys
    /// naming either of those are skipped.
    pub fn to_document(&self, extracted: &ExtractedDocument) -> Document {
        let mut doc = Document::new(extracted.source_id.clone());
        doc.add(Field::keyword(PATH_FIELD, extracted.source_id.clone()).store());
        doc.add(Field::text(CONTENTS_FIELD, extracted.text.clone()).boosted(self.contents_boost));

        for (key, value) in &extracted.metadata {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let name = key.to_lowercase();
            match name.as_str() {
                PATH_FIELD | CONTENTS_FIELD => {
                    tracing::warn!(source_id = %extracted.source_id, key = %key, "skipping metadata key reserved for a built-in field");
                }
                KEYWORDS_FIELD => {
                    for keyword in KEYWORD_SEPARATOR.split(value).filter(|k| !k.is_empty()) {
                        doc.add(Field::keyword(KEYWORDS_FIELD, keyword).store());
                    }
                }
                TITLE_FIELD => {
                    doc.add(Field::text(TITLE_FIELD, value).store().boosted(self.title_boost));
                }
                _ => {
                    doc.add(Field::keyword(name, value).store());
                }
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(meta: &[(&str, &str)]) -> ExtractedDocument {
        ExtractedDocument {
            source_id: "report.pdf".into(),
            text: "body text".into(),
            metadata: meta.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn path_and_contents_always_present() {
        let doc = IngestPolicy::default().to_document(&extracted(&[]));
        let path = &doc.fields[0];
        assert_eq!(path.name, PATH_FIELD);
        assert_eq!(path.kind, FieldKind::IndexedUntokenized);
        assert!(path.stored);

        let contents = &doc.fields[1];
        assert_eq!(contents.name, CONTENTS_FIELD);
        assert_eq!(contents.kind, FieldKind::IndexedTokenized);
        assert!(!contents.stored);
        assert_eq!(contents.boost, 2.0);
    }

    #[test]
    fn keywords_split_on_commas_and_whitespace() {
        let doc = IngestPolicy::default().to_document(&extracted(&[("Keywords", "rust, search  index")]));
        let keywords: Vec<&str> = doc.values(KEYWORDS_FIELD).collect();
        assert_eq!(keywords, vec!["rust", "search", "index"]);
        assert!(doc
            .fields
            .iter()
            .filter(|f| f.name == KEYWORDS_FIELD)
            .all(|f| f.kind == FieldKind::IndexedUntokenized && f.stored));
    }

    #[test]
    fn title_is_boosted_text() {
        let policy = IngestPolicy { title_boost: 4.0, ..IngestPolicy::default() };
        let doc = policy.to_document(&extracted(&[("TITLE", "Regasirea Informatiei")]));
        let title = doc.fields.iter().find(|f| f.name == TITLE_FIELD).unwrap();
        assert_eq!(title.kind, FieldKind::IndexedTokenized);
        assert!(title.stored);
        assert_eq!(title.boost, 4.0);
    }

    #[test]
    fn other_metadata_keeps_value_and_blank_is_dropped() {
        let doc = IngestPolicy::default().to_document(&extracted(&[("Author", "Andrei"), ("Subject", "   ")]));
        let author = doc.fields.iter().find(|f| f.name == "author").unwrap();
        assert_eq!(author.value, "Andrei");
        assert_eq!(author.kind, FieldKind::IndexedUntokenized);
        assert!(doc.fields.iter().all(|f| f.name != "subject"));
    }

    #[test]
    fn metadata_cannot_shadow_path_or_contents() {
        let doc = IngestPolicy::default().to_document(&extracted(&[("Contents", "table of contents"), ("PATH", "elsewhere")]));
        assert_eq!(doc.values(PATH_FIELD).collect::<Vec<_>>(), vec!["report.pdf"]);
        assert_eq!(doc.values(CONTENTS_FIELD).collect::<Vec<_>>(), vec!["body text"]);
        assert!(doc
            .fields
            .iter()
            .filter(|f| f.name == CONTENTS_FIELD)
            .all(|f| f.kind == FieldKind::IndexedTokenized));
    }
}
