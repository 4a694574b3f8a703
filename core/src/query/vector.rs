use crate::index::{tf_weight, DocId, Snapshot, Term};
use crate::soundex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Maximum number of ranked documents returned.
pub const TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Map each query term to the index terms that stand in for it: itself when
/// indexed, otherwise every indexed term sharing its phonetic code.
fn resolve<'a>(snapshot: &'a Snapshot, term: &'a str) -> Vec<&'a str> {
    if snapshot.contains(term) {
        return vec![term];
    }
    let Ok(code) = soundex::encode(term) else {
        return Vec::new();
    };
    match snapshot.soundex_map.get(&code) {
        Some(terms) => {
            tracing::debug!(term, %code, matches = ?terms, "expanding out-of-vocabulary term");
            terms.iter().map(String::as_str).collect()
        }
        None => Vec::new(),
    }
}

/// Cosine-style ranking. The query side is weighted `(1 + log10 tf) * idf`,
/// the document side `1 + log10 tf` and normalized by the stored document
/// length, which carries no idf either.
pub fn evaluate(query_terms: &[Term], snapshot: &Snapshot) -> Vec<ScoredDoc> {
    if query_terms.is_empty() {
        return Vec::new();
    }

    // First-seen order keeps expansion deterministic.
    let mut order: Vec<&str> = Vec::new();
    let mut tf: HashMap<&str, usize> = HashMap::new();
    for term in query_terms {
        let n = tf.entry(term.as_str()).or_insert(0);
        if *n == 0 {
            order.push(term.as_str());
        }
        *n += 1;
    }

    let total_docs = f64::from(snapshot.total_docs);
    let mut query_vector: BTreeMap<&str, f64> = BTreeMap::new();
    for term in order {
        let q_tf = tf_weight(tf[term]);
        for resolved in resolve(snapshot, term) {
            let Some(entry) = snapshot.entry(resolved) else { continue };
            debug_assert!(entry.document_frequency > 0, "indexed term {resolved:?} has df 0");
            if entry.document_frequency == 0 {
                continue;
            }
            let idf = (total_docs / f64::from(entry.document_frequency)).log10();
            // A term reached through several query terms keeps its first weight.
            query_vector.entry(resolved).or_insert(q_tf * idf);
        }
    }

    let sum_sq: f64 = query_vector.values().map(|w| w * w).sum();
    let query_length = if sum_sq > 0.0 { sum_sq.sqrt() } else { 1.0 };

    let mut dot: HashMap<&str, f64> = HashMap::new();
    for (term, q_w) in &query_vector {
        let Some(entry) = snapshot.entry(term) else { continue };
        for (doc_id, positions) in &entry.postings {
            *dot.entry(doc_id.as_str()).or_insert(0.0) += q_w * tf_weight(positions.len());
        }
    }

    let mut scored: Vec<ScoredDoc> = dot
        .into_iter()
        .filter_map(|(doc_id, d)| {
            let doc_length = snapshot.doc_lengths.get(doc_id).copied().unwrap_or(0.0);
            (doc_length > 0.0).then(|| ScoredDoc {
                doc_id: doc_id.to_string(),
                score: d / (doc_length * query_length),
            })
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    scored.truncate(TOP_K);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;

    fn snap(docs: &[(&str, &str)]) -> Snapshot {
        let mut b = IndexBuilder::new();
        for (id, text) in docs {
            b.ingest(*id, text.split_whitespace().map(String::from)).unwrap();
        }
        b.finalize()
    }

    fn q(s: &str) -> Vec<Term> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn empty_query_is_empty() {
        let s = snap(&[("d1", "alpha")]);
        assert!(evaluate(&[], &s).is_empty());
    }

    #[test]
    fn scores_follow_formula() {
        let s = snap(&[("d1", "cat cat dog"), ("d2", "dog"), ("d3", "bird")]);
        let results = evaluate(&q("cat"), &s);
        assert_eq!(results.len(), 1);
        // q: idf(cat) = log10(3); length = idf; d1: tf 2 -> 1 + log10 2
        let idf = 3f64.log10();
        let d_w = 1.0 + 2f64.log10();
        let d_len = (d_w * d_w + 1.0).sqrt();
        let expected = idf * d_w / (d_len * idf);
        assert_eq!(results[0].doc_id, "d1");
        assert!((results[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn repeated_query_terms_raise_query_weight() {
        let s = snap(&[("d1", "cat dog"), ("d2", "dog"), ("d3", "bird")]);
        let results = evaluate(&q("cat dog cat"), &s);
        assert_eq!(results, evaluate(&q("cat cat dog"), &s));

        let q_cat = (1.0 + 2f64.log10()) * 3f64.log10();
        let q_dog = 1.5f64.log10();
        let q_len = (q_cat * q_cat + q_dog * q_dog).sqrt();
        assert_eq!(results[0].doc_id, "d1");
        assert!((results[0].score - (q_cat + q_dog) / (2f64.sqrt() * q_len)).abs() < 1e-12);
        assert!((results[1].score - q_dog / q_len).abs() < 1e-12);
    }

    #[test]
    fn ties_break_by_doc_id() {
        let s = snap(&[("c", "apple"), ("a", "apple"), ("b", "apple"), ("z", "pear")]);
        let ids: Vec<String> = evaluate(&q("apple"), &s).into_iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn caps_at_top_k() {
        let docs: Vec<(String, &str)> = (0..15).map(|i| (format!("d{i:02}"), "shared")).collect();
        let mut b = IndexBuilder::new();
        for (id, text) in &docs {
            b.ingest(id.clone(), q(text)).unwrap();
        }
        b.ingest("other", q("else")).unwrap();
        let results = evaluate(&q("shared"), &b.finalize());
        assert_eq!(results.len(), TOP_K);
        assert_eq!(results[0].doc_id, "d00");
    }

    #[test]
    fn term_in_every_doc_scores_zero() {
        let s = snap(&[("d1", "common"), ("d2", "common")]);
        let results = evaluate(&q("common"), &s);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|d| d.score == 0.0));
    }

    #[test]
    fn unknown_term_without_phonetic_match_contributes_nothing() {
        let s = snap(&[("d1", "alpha"), ("d2", "beta")]);
        assert!(evaluate(&q("zzz"), &s).is_empty());
    }

    #[test]
    fn phonetic_substitute_matches_direct_query() {
        let s = snap(&[("d1", "robert smith"), ("d2", "jones"), ("d3", "smith")]);
        assert_eq!(evaluate(&q("rupert"), &s), evaluate(&q("robert"), &s));
        assert_eq!(evaluate(&q("rupert"), &s)[0].doc_id, "d1");
    }

    #[test]
    fn expansion_keeps_first_weight() {
        // "robert" is indexed; "rupert" is not and expands back to "robert".
        let s = snap(&[("d1", "robert"), ("d2", "other"), ("d3", "thing")]);
        let twice = evaluate(&q("robert rupert"), &s);
        let once = evaluate(&q("robert"), &s);
        assert_eq!(twice, once);
    }
}
