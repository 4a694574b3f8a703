use crate::error::{Error, Result};
use crate::soundex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A normalized token, the key for every lookup.
pub type Term = String;
/// Opaque document identifier (the corpus file name). Ordered ascending everywhere.
pub type DocId = String;
/// Zero-based index into a document's stopword-filtered term stream.
pub type Position = u32;

/// Per-document position lists for one term, keyed by DocId.
pub type Postings = BTreeMap<DocId, Vec<Position>>;
pub type InvertedIndex = BTreeMap<Term, PostingsEntry>;
/// Phonetic code -> every indexed term sharing it.
pub type SoundexMap = BTreeMap<String, BTreeSet<Term>>;
/// L2 norm of each document's `1 + log10(tf)` weight vector.
pub type DocLengths = BTreeMap<DocId, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingsEntry {
    #[serde(rename = "df")]
    pub document_frequency: u32,
    pub postings: Postings,
}

/// Logarithmic term-frequency weight shared by documents and queries.
#[inline]
pub fn tf_weight(tf: usize) -> f64 {
    if tf == 0 {
        0.0
    } else {
        1.0 + (tf as f64).log10()
    }
}

/// The four structures produced by one build, always handled as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub inverted_index: InvertedIndex,
    pub doc_lengths: DocLengths,
    pub soundex_map: SoundexMap,
    pub total_docs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub total_docs: u32,
    pub terms: usize,
    pub postings: usize,
    pub positions: usize,
    pub phonetic_codes: usize,
}

impl Snapshot {
    pub fn entry(&self, term: &str) -> Option<&PostingsEntry> {
        self.inverted_index.get(term)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.inverted_index.contains_key(term)
    }

    pub fn stats(&self) -> SnapshotStats {
        let mut postings = 0;
        let mut positions = 0;
        for entry in self.inverted_index.values() {
            postings += entry.postings.len();
            positions += entry.postings.values().map(Vec::len).sum::<usize>();
        }
        SnapshotStats {
            total_docs: self.total_docs,
            terms: self.inverted_index.len(),
            postings,
            positions,
            phonetic_codes: self.soundex_map.len(),
        }
    }

    /// Check every structural invariant a freshly built snapshot satisfies.
    /// Used after loading so that a tampered or truncated snapshot is rejected
    /// instead of answering queries from inconsistent state.
    pub fn validate(&self) -> Result<()> {
        if self.doc_lengths.len() != self.total_docs as usize {
            return Err(Error::Inconsistent(format!(
                "total_docs is {} but {} document lengths are stored",
                self.total_docs,
                self.doc_lengths.len()
            )));
        }

        let mut doc_positions: HashMap<&str, Vec<Position>> = HashMap::new();
        let mut doc_sum_sq: HashMap<&str, f64> = HashMap::new();
        for (term, entry) in &self.inverted_index {
            let non_empty = entry.postings.values().filter(|p| !p.is_empty()).count();
            if non_empty == 0 || entry.postings.len() != non_empty {
                return Err(Error::Inconsistent(format!("term {term:?} has an empty posting list")));
            }
            if entry.document_frequency as usize != non_empty {
                return Err(Error::Inconsistent(format!(
                    "term {term:?} has df {} but occurs in {non_empty} documents",
                    entry.document_frequency
                )));
            }
            for (doc_id, positions) in &entry.postings {
                if !positions.windows(2).all(|w| w[0] < w[1]) {
                    return Err(Error::Inconsistent(format!(
                        "positions of {term:?} in {doc_id:?} are not strictly increasing"
                    )));
                }
                if !self.doc_lengths.contains_key(doc_id) {
                    return Err(Error::Inconsistent(format!("document {doc_id:?} has no stored length")));
                }
                doc_positions.entry(doc_id.as_str()).or_default().extend_from_slice(positions);
                *doc_sum_sq.entry(doc_id.as_str()).or_default() += tf_weight(positions.len()).powi(2);
            }
        }

        for (doc_id, mut positions) in doc_positions {
            positions.sort_unstable();
            let contiguous = positions.iter().enumerate().all(|(i, &p)| p as usize == i);
            if !contiguous {
                return Err(Error::Inconsistent(format!(
                    "positions in {doc_id:?} do not cover a contiguous token stream"
                )));
            }
        }
        for (doc_id, &length) in &self.doc_lengths {
            let expected = doc_sum_sq.get(doc_id.as_str()).copied().unwrap_or(0.0).sqrt();
            if (expected - length).abs() > 1e-9 {
                return Err(Error::Inconsistent(format!(
                    "document {doc_id:?} has length {length} but its postings give {expected}"
                )));
            }
        }

        let mut coded_terms = 0;
        for (code, terms) in &self.soundex_map {
            for term in terms {
                if !self.inverted_index.contains_key(term) {
                    return Err(Error::Inconsistent(format!(
                        "phonetic code {code} lists unknown term {term:?}"
                    )));
                }
                if soundex::encode(term)? != *code {
                    return Err(Error::Inconsistent(format!(
                        "term {term:?} is stored under the wrong phonetic code {code}"
                    )));
                }
                coded_terms += 1;
            }
        }
        // Each term has exactly one code, so an exact count means full coverage.
        if coded_terms != self.inverted_index.len() {
            return Err(Error::Inconsistent(format!(
                "{} terms are indexed but {coded_terms} have phonetic codes",
                self.inverted_index.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;

    fn terms(s: &str) -> Vec<Term> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn sample() -> Snapshot {
        let mut b = IndexBuilder::new();
        b.ingest("a.txt", terms("rust index rust")).unwrap();
        b.ingest("b.txt", terms("index query")).unwrap();
        b.finalize()
    }

    #[test]
    fn built_snapshot_is_valid() {
        sample().validate().unwrap();
    }

    #[test]
    fn tf_weight_is_logarithmic() {
        assert_eq!(tf_weight(0), 0.0);
        assert_eq!(tf_weight(1), 1.0);
        assert!((tf_weight(10) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn drifted_df_is_rejected() {
        let mut snap = sample();
        snap.inverted_index.get_mut("index").unwrap().document_frequency = 1;
        assert!(matches!(snap.validate(), Err(Error::Inconsistent(_))));
    }

    #[test]
    fn missing_phonetic_entry_is_rejected() {
        let mut snap = sample();
        snap.soundex_map.retain(|_, terms| !terms.contains("query"));
        assert!(snap.validate().is_err());
    }

    #[test]
    fn stale_doc_length_is_rejected() {
        let mut snap = sample();
        *snap.doc_lengths.get_mut("a.txt").unwrap() = 1.0;
        assert!(snap.validate().is_err());
    }

    #[test]
    fn stats_count_structures() {
        let stats = sample().stats();
        assert_eq!(stats.total_docs, 2);
        assert_eq!(stats.terms, 3);
        assert_eq!(stats.postings, 4);
        assert_eq!(stats.positions, 5);
    }
}
