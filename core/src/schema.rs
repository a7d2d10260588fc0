use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::Analyzer;
use crate::document::FieldKind;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub kind: FieldKind,
    pub analyzer: Analyzer,
}

/// Field name to kind and analyzer, shared by the writer and the query parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    default_analyzer: Analyzer,
    overrides: BTreeMap<String, Analyzer>,
    fields: BTreeMap<String, FieldEntry>,
}

impl Schema {
    /// Empty schema analyzing every text field with `default_analyzer`.
    pub fn new(default_analyzer: Analyzer) -> Self {
        Self { default_analyzer, ..Self::default() }
    }

    /// Use `analyzer` for text field `name` instead of the default.
    pub fn with_analyzer(mut self, name: impl Into<String>, analyzer: Analyzer) -> Self {
        self.overrides.insert(name.into(), analyzer);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name)
    }

    /// The analyzer a field is indexed and queried with.
    ///
    /// Fields not yet registered resolve to the analyzer they would receive as text fields.
    pub fn analyzer(&self, name: &str) -> &Analyzer {
        match self.fields.get(name) {
            Some(entry) => &entry.analyzer,
            None => self.overrides.get(name).unwrap_or(&self.default_analyzer),
        }
    }

    /// Register `name` on first sight; afterwards its indexed kind is fixed.
    pub(crate) fn register(&mut self, name: &str, kind: FieldKind) -> Result<&FieldEntry> {
        if !self.fields.contains_key(name) {
            let analyzer = match kind {
                FieldKind::IndexedUntokenized => Analyzer::keyword(),
                _ => self.overrides.get(name).unwrap_or(&self.default_analyzer).clone(),
            };
            self.fields.insert(name.to_string(), FieldEntry { kind, analyzer });
        }
        let entry = &self.fields[name];
        if kind.is_indexed() && entry.kind.is_indexed() && entry.kind != kind {
            return Err(Error::Schema {
                field: name.to_string(),
                reason: format!("declared as {:?}, document supplies {:?}", entry.kind, kind),
            });
        }
        Ok(entry)
    }

    /// Forget registered fields, keeping analyzer configuration.
    pub(crate) fn clear_fields(&mut self) {
        self.fields.clear();
    }
}
