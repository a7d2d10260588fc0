use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::{Analyzer, Language};
use crate::document::{IngestPolicy, CONTENTS_FIELD};
use crate::error::Result;
use crate::schema::Schema;

/// Engine settings. Every field has a default, so a config file only needs the overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub documents_location: PathBuf,
    pub index_location: PathBuf,
    pub language: Language,
    pub fold_diacritics: bool,
    pub title_boost: f32,
    pub contents_boost: f32,
    pub default_field: String,
    pub default_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            documents_location: PathBuf::from("./documents"),
            index_location: PathBuf::from("./index"),
            language: Language::Romanian,
            fold_diacritics: false,
            title_boost: 3.0,
            contents_boost: 2.0,
            default_field: CONTENTS_FIELD.to_string(),
            default_limit: 10,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn analyzer(&self) -> Analyzer {
        Analyzer::for_language(self.language).with_diacritic_folding(self.fold_diacritics)
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.analyzer())
    }

    pub fn ingest_policy(&self) -> IngestPolicy {
        IngestPolicy { title_boost: self.title_boost, contents_boost: self.contents_boost }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexis.json");
        fs::write(&path, r#"{ "index_location": "/tmp/idx", "language": "english" }"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.index_location, PathBuf::from("/tmp/idx"));
        assert_eq!(config.language, Language::English);
        assert_eq!(config.title_boost, 3.0);
        assert_eq!(config.default_field, "contents");
    }
}
