//! Ready-made [`ScoreOverride`]s and a way to chain them.

use crate::index::StoredFields;
use crate::search::ScoreOverride;
use crate::DocId;

/// Multiply the score of documents whose `field` ends with `suffix`, ignoring case.
#[derive(Debug, Clone)]
pub struct SuffixBoost {
    field: String,
    suffix: String,
    factor: f32,
}

pub fn suffix_boost(field: impl Into<String>, suffix: &str, factor: f32) -> SuffixBoost {
    SuffixBoost { field: field.into(), suffix: suffix.to_lowercase(), factor }
}

impl ScoreOverride for SuffixBoost {
    fn rescore(&self, _doc: DocId, base: f32, stored: &StoredFields) -> f32 {
        let hit = stored
            .get(&self.field)
            .is_some_and(|values| values.iter().any(|v| v.to_lowercase().ends_with(&self.suffix)));
        if hit {
            base * self.factor
        } else {
            base
        }
    }
}

/// Replace the score with a fixed value when `field` has exactly `value`.
#[derive(Debug, Clone)]
pub struct ValueEquals {
    field: String,
    value: String,
    score: f32,
}

pub fn value_equals(field: impl Into<String>, value: impl Into<String>, score: f32) -> ValueEquals {
    ValueEquals { field: field.into(), value: value.into(), score }
}

impl ScoreOverride for ValueEquals {
    fn rescore(&self, _doc: DocId, base: f32, stored: &StoredFields) -> f32 {
        match stored.get(&self.field) {
            Some(values) if values.iter().any(|v| *v == self.value) => self.score,
            _ => base,
        }
    }
}

/// Applies overrides left to right, feeding each one the previous score.
#[derive(Default)]
pub struct Chain {
    steps: Vec<Box<dyn ScoreOverride>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, step: impl ScoreOverride + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }
}

impl ScoreOverride for Chain {
    fn rescore(&self, doc: DocId, base: f32, stored: &StoredFields) -> f32 {
        self.steps.iter().fold(base, |score, step| step.rescore(doc, score, stored))
    }
}
