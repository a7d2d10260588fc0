//! Query evaluation over one committed generation.
//!
//! Per matching term the base score is
//! `tf * ln(1 + N / df) / sqrt(field_length) * field_boost * query_boost`,
//! summed over the clauses a document matches.

use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::index::{Generation, StoredFields};
use crate::query::{Query, QueryParser};
use crate::DocId;

/// Rewrites a candidate's score after retrieval.
///
/// Runs once per matching document with the stored values of the generation
/// being searched. Must not panic and should return a finite score; a
/// non-finite result falls back to the base score.
pub trait ScoreOverride: Send + Sync {
    fn rescore(&self, doc: DocId, base: f32, stored: &StoredFields) -> f32;
}

impl<F> ScoreOverride for F
where
    F: Fn(DocId, f32, &StoredFields) -> f32 + Send + Sync,
{
    fn rescore(&self, doc: DocId, base: f32, stored: &StoredFields) -> f32 {
        self(doc, base, stored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDocs {
    /// Number of documents that matched, before the limit was applied.
    pub total_hits: usize,
    pub hits: Vec<Hit>,
}

/// Factors of one term's contribution to a document score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermScore {
    pub field: String,
    pub term: String,
    pub term_frequency: u32,
    pub doc_freq: u32,
    pub total_docs: u32,
    pub idf: f32,
    pub length_norm: f32,
    pub field_boost: f32,
    pub query_boost: f32,
}

impl TermScore {
    pub fn value(&self) -> f32 {
        self.term_frequency as f32 * self.idf * self.length_norm * self.field_boost * self.query_boost
    }
}

pub fn idf(doc_freq: u32, total_docs: u32) -> f32 {
    (1.0 + total_docs as f32 / doc_freq.max(1) as f32).ln()
}

pub fn length_norm(field_length: u32) -> f32 {
    1.0 / (field_length.max(1) as f32).sqrt()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub matched: bool,
    pub value: f32,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<TermScore>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Explanation>,
}

impl Explanation {
    fn node(matched: bool, value: f32, description: impl Into<String>, details: Vec<Explanation>) -> Self {
        Self { matched, value, description: description.into(), term: None, details }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{} = {}", "", self.value, self.description, indent = depth * 2)?;
        if let Some(t) = &self.term {
            let pad = (depth + 1) * 2;
            writeln!(f, "{:pad$}{} = termFreq", "", t.term_frequency)?;
            writeln!(f, "{:pad$}{} = idf(docFreq={}, docCount={})", "", t.idf, t.doc_freq, t.total_docs)?;
            writeln!(f, "{:pad$}{} = lengthNorm", "", t.length_norm)?;
            writeln!(f, "{:pad$}{} = boost(field={}, query={})", "", t.field_boost * t.query_boost, t.field_boost, t.query_boost)?;
        }
        for detail in &self.details {
            detail.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

type Scored = Vec<(DocId, f32)>;

/// Read-only view of one generation. Cheap to clone; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Searcher {
    generation: Arc<Generation>,
}

impl Searcher {
    pub fn new(generation: Arc<Generation>) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Parse `input` with the analyzers of this generation's schema.
    pub fn parse(&self, input: &str, default_field: &str) -> Result<Query> {
        QueryParser::new(&self.generation.schema, default_field).parse(input)
    }

    /// Top `limit` documents by score, ties broken by ascending doc id.
    pub fn search(&self, query: &Query, limit: usize, rescorer: Option<&dyn ScoreOverride>) -> TopDocs {
        let candidates = self.evaluate(query, 1.0);
        let total_hits = candidates.len();
        if limit == 0 {
            return TopDocs { total_hits, hits: Vec::new() };
        }

        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, Reverse<DocId>)>> = BinaryHeap::with_capacity(limit.min(total_hits));
        for (doc, base) in candidates {
            let score = match rescorer {
                Some(rescorer) => self.rescore(rescorer, doc, base),
                None => base,
            };
            heap.push(Reverse((OrderedFloat(score), Reverse(doc))));
            if heap.len() > limit {
                heap.pop();
            }
        }

        let hits = heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse((score, Reverse(doc_id)))| Hit { doc_id, score: score.0 })
            .collect();
        tracing::debug!(%query, total_hits, limit, "search complete");
        TopDocs { total_hits, hits }
    }

    fn rescore(&self, rescorer: &dyn ScoreOverride, doc: DocId, base: f32) -> f32 {
        let empty = StoredFields::new();
        let stored = self.generation.stored(doc).unwrap_or(&empty);
        let score = rescorer.rescore(doc, base, stored);
        if score.is_finite() {
            score
        } else {
            tracing::warn!(doc, base, score, "score override returned a non-finite score, keeping base score");
            base
        }
    }

    /// Matching docs in ascending id order with their base scores.
    fn evaluate(&self, query: &Query, boost: f32) -> Scored {
        match query {
            Query::Term { field, term } => {
                let g = &self.generation;
                let postings = g.postings(field, term);
                let idf = idf(postings.len() as u32, g.num_docs);
                postings
                    .iter()
                    .map(|p| {
                        let norm = g.norm(field, p.doc_id);
                        let score = p.term_frequency as f32 * idf * length_norm(norm.length) * norm.boost * boost;
                        (p.doc_id, score)
                    })
                    .collect()
            }
            Query::And(children) => {
                let mut lists: Vec<Scored> = children.iter().map(|c| self.evaluate(c, boost)).collect();
                lists.sort_by_key(Vec::len);
                let mut lists = lists.into_iter();
                let mut running = match lists.next() {
                    Some(first) => first,
                    None => return Vec::new(),
                };
                for next in lists {
                    if running.is_empty() {
                        break;
                    }
                    running = intersect(&running, &next);
                }
                running
            }
            Query::Or(children) => children
                .iter()
                .map(|c| self.evaluate(c, boost))
                .fold(Vec::new(), |acc, next| union(&acc, &next)),
            Query::Boost(inner, factor) => self.evaluate(inner, boost * factor),
        }
    }

    /// Per-term breakdown of `doc`'s base score, without running retrieval.
    pub fn explain(&self, query: &Query, doc: DocId) -> Explanation {
        self.explain_with(query, doc, 1.0)
    }

    fn explain_with(&self, query: &Query, doc: DocId, boost: f32) -> Explanation {
        match query {
            Query::Term { field, term } => {
                let g = &self.generation;
                let postings = g.postings(field, term);
                match postings.binary_search_by_key(&doc, |p| p.doc_id) {
                    Ok(i) => {
                        let norm = g.norm(field, doc);
                        let score = TermScore {
                            field: field.clone(),
                            term: term.clone(),
                            term_frequency: postings[i].term_frequency,
                            doc_freq: postings.len() as u32,
                            total_docs: g.num_docs,
                            idf: idf(postings.len() as u32, g.num_docs),
                            length_norm: length_norm(norm.length),
                            field_boost: norm.boost,
                            query_boost: boost,
                        };
                        Explanation {
                            matched: true,
                            value: score.value(),
                            description: format!("weight({field}:{term} in {doc})"),
                            term: Some(score),
                            details: Vec::new(),
                        }
                    }
                    Err(_) => Explanation::node(false, 0.0, format!("no match on {field}:{term}"), Vec::new()),
                }
            }
            Query::And(children) => {
                let details: Vec<Explanation> = children.iter().map(|c| self.explain_with(c, doc, boost)).collect();
                if !details.is_empty() && details.iter().all(|d| d.matched) {
                    let value = details.iter().map(|d| d.value).sum();
                    Explanation::node(true, value, "sum of:", details)
                } else {
                    Explanation::node(false, 0.0, "failure to match all clauses", details)
                }
            }
            Query::Or(children) => {
                let details: Vec<Explanation> = children.iter().map(|c| self.explain_with(c, doc, boost)).collect();
                let matched = details.iter().any(|d| d.matched);
                let value = details.iter().filter(|d| d.matched).map(|d| d.value).sum();
                let description = if matched { "sum of matching clauses:" } else { "no matching clause" };
                Explanation::node(matched, value, description, details)
            }
            Query::Boost(inner, factor) => {
                let inner = self.explain_with(inner, doc, boost * factor);
                Explanation::node(inner.matched, inner.value, format!("boost ^{factor}"), vec![inner])
            }
        }
    }
}

/// Merge-join of two doc-sorted lists, summing scores of common docs.
fn intersect(a: &[(DocId, f32)], b: &[(DocId, f32)]) -> Scored {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    out
}

fn union(a: &[(DocId, f32)], b: &[(DocId, f32)]) -> Scored {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
