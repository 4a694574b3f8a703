//! Query dispatch and evaluation over an immutable [`Snapshot`].
//!
//! A raw query line is classified by its surface syntax, checked in order:
//!
//! 1. `"<a>" w/<k> "<b>"` is a proximity query (`w/` is case-insensitive).
//! 2. `"<text>"` is an exact phrase query.
//! 3. Anything else is ranked with the vector-space model.
//!
//! Proximity and phrase queries return unranked DocIds; vector-space queries
//! return at most [`TOP_K`] scored documents.

pub mod phrase;
pub mod proximity;
pub mod vector;

pub use vector::{ScoredDoc, TOP_K};

use crate::index::{DocId, Snapshot};
use crate::tokenizer::Normalizer;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::num::IntErrorKind;
use std::sync::Arc;

lazy_static! {
    static ref PROXIMITY_RE: Regex =
        Regex::new(r#"(?i)^"([^"]*)"\s*w/([0-9]+)\s*"([^"]*)"$"#).expect("valid regex");
    static ref PHRASE_RE: Regex = Regex::new(r#"^"([^"]+)"$"#).expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Proximity { left: String, right: String, distance: u32 },
    Phrase(String),
    Vector(String),
}

impl Query {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(caps) = PROXIMITY_RE.captures(raw) {
            let distance = match caps[2].parse::<u32>() {
                Ok(d) => Some(d),
                // Distances beyond u32 cannot be exceeded by any position pair.
                Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u32::MAX),
                Err(_) => None,
            };
            if let Some(distance) = distance {
                return Query::Proximity {
                    left: caps[1].to_string(),
                    right: caps[3].to_string(),
                    distance,
                };
            }
        }
        if let Some(caps) = PHRASE_RE.captures(raw) {
            return Query::Phrase(caps[1].to_string());
        }
        Query::Vector(raw.to_string())
    }
}

/// Result of a query, tagged by whether it carries scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "results", rename_all = "lowercase")]
pub enum SearchResults {
    Ranked(Vec<ScoredDoc>),
    Unranked(Vec<DocId>),
}

impl SearchResults {
    pub fn len(&self) -> usize {
        match self {
            SearchResults::Ranked(r) => r.len(),
            SearchResults::Unranked(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn doc_ids(&self) -> Vec<&str> {
        match self {
            SearchResults::Ranked(r) => r.iter().map(|d| d.doc_id.as_str()).collect(),
            SearchResults::Unranked(r) => r.iter().map(String::as_str).collect(),
        }
    }
}

/// Read-only query evaluator. Cloning is cheap and clones share the snapshot.
#[derive(Clone)]
pub struct Engine {
    snapshot: Arc<Snapshot>,
    normalizer: Arc<dyn Normalizer>,
}

impl Engine {
    pub fn new(snapshot: Arc<Snapshot>, normalizer: Arc<dyn Normalizer>) -> Self {
        Self { snapshot, normalizer }
    }

    pub fn search(&self, raw: &str) -> SearchResults {
        self.run(&Query::parse(raw))
    }

    pub fn run(&self, query: &Query) -> SearchResults {
        match query {
            Query::Proximity { left, right, distance } => {
                tracing::debug!(left = %left, right = %right, distance, "proximity query");
                let left = self.normalizer.normalize(left, true);
                let right = self.normalizer.normalize(right, true);
                match (left.first(), right.first()) {
                    (Some(l), Some(r)) => {
                        SearchResults::Unranked(proximity::evaluate(l, r, *distance, &self.snapshot))
                    }
                    _ => SearchResults::Unranked(Vec::new()),
                }
            }
            Query::Phrase(text) => {
                tracing::debug!(phrase = %text, "phrase query");
                let terms = self.normalizer.normalize(text, true);
                SearchResults::Unranked(phrase::evaluate(&terms, &self.snapshot))
            }
            Query::Vector(text) => {
                tracing::debug!(query = %text, "vector-space query");
                let terms = self.normalizer.normalize(text, true);
                SearchResults::Ranked(vector::evaluate(&terms, &self.snapshot))
            }
        }
    }
}
