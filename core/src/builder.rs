use crate::error::{Error, Result};
use crate::index::{tf_weight, DocId, DocLengths, InvertedIndex, Position, Snapshot, SoundexMap, Term};
use crate::soundex;
use crate::tokenizer::Normalizer;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Accumulates postings one document at a time; `finalize` produces the snapshot.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    inverted_index: InvertedIndex,
    soundex_map: SoundexMap,
    // Documents are recorded even when they produce no terms, so they still
    // count toward TotalDocs and receive a zero length.
    docs: BTreeSet<DocId>,
    total_docs: u32,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document's normalized term stream. Position `i` is the index of
    /// the term within `terms`.
    ///
    /// The stream is checked in full before anything is recorded, so a
    /// rejected document leaves the builder unchanged.
    pub fn ingest<I>(&mut self, doc_id: impl Into<DocId>, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = Term>,
    {
        let doc_id = doc_id.into();
        if self.docs.contains(&doc_id) {
            return Err(Error::DuplicateDocument(doc_id));
        }
        let total_docs = self.total_docs.checked_add(1).ok_or_else(|| {
            Error::InvalidInput(format!("cannot add document {doc_id:?}: too many documents"))
        })?;

        let mut doc_postings: BTreeMap<Term, Vec<Position>> = BTreeMap::new();
        for (pos, term) in terms.into_iter().enumerate() {
            if term.is_empty() {
                return Err(Error::InvalidInput(format!("empty term in document {doc_id:?}")));
            }
            let pos = Position::try_from(pos).map_err(|_| {
                Error::InvalidInput(format!("document {doc_id:?} has too many terms"))
            })?;
            doc_postings.entry(term).or_default().push(pos);
        }
        let mut new_codes = Vec::new();
        for term in doc_postings.keys() {
            if !self.inverted_index.contains_key(term) {
                new_codes.push((soundex::encode(term)?, term.clone()));
            }
        }

        for (code, term) in new_codes {
            self.soundex_map.entry(code).or_default().insert(term);
        }
        for (term, positions) in doc_postings {
            let entry = self.inverted_index.entry(term).or_default();
            entry.postings.insert(doc_id.clone(), positions);
            entry.document_frequency += 1;
        }
        self.docs.insert(doc_id);
        self.total_docs = total_docs;
        Ok(())
    }

    pub fn finalize(self) -> Snapshot {
        let mut sum_sq: BTreeMap<&str, f64> = self.docs.iter().map(|d| (d.as_str(), 0.0)).collect();
        for entry in self.inverted_index.values() {
            for (doc_id, positions) in &entry.postings {
                if let Some(acc) = sum_sq.get_mut(doc_id.as_str()) {
                    *acc += tf_weight(positions.len()).powi(2);
                }
            }
        }
        let doc_lengths: DocLengths = sum_sq
            .into_iter()
            .map(|(doc_id, s)| (doc_id.to_string(), s.sqrt()))
            .collect();
        let total_docs = self.total_docs;
        tracing::debug!(total_docs, terms = self.inverted_index.len(), "finalized index");
        Snapshot {
            inverted_index: self.inverted_index,
            doc_lengths,
            soundex_map: self.soundex_map,
            total_docs,
        }
    }
}

/// Build a snapshot from `(DocId, raw text)` pairs.
///
/// Normalization runs in parallel; ingestion is sequential in ascending DocId
/// order, so the output equals a single-threaded build of the same corpus.
pub fn build<N>(documents: Vec<(DocId, String)>, normalizer: &N) -> Result<Snapshot>
where
    N: Normalizer + ?Sized,
{
    let mut normalized: Vec<(DocId, Vec<Term>)> = documents
        .into_par_iter()
        .map(|(doc_id, text)| {
            let terms = normalizer.normalize(&text, true);
            (doc_id, terms)
        })
        .collect();
    normalized.sort_by(|a, b| a.0.cmp(&b.0));

    let mut builder = IndexBuilder::new();
    for (doc_id, terms) in normalized {
        builder.ingest(doc_id, terms)?;
    }
    let snapshot = builder.finalize();
    let stats = snapshot.stats();
    tracing::info!(total_docs = stats.total_docs, terms = stats.terms, postings = stats.postings, "built index");
    Ok(snapshot)
}
