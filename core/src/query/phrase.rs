use crate::index::{DocId, Position, Snapshot, Term};
use std::collections::BTreeMap;

/// Documents containing `phrase_terms` at consecutive positions, ascending.
pub fn evaluate(phrase_terms: &[Term], snapshot: &Snapshot) -> Vec<DocId> {
    let Some((first, rest)) = phrase_terms.split_first() else {
        return Vec::new();
    };
    let Some(entry) = snapshot.entry(first) else {
        return Vec::new();
    };

    // DocId -> positions of the most recently matched phrase term.
    let mut candidates: BTreeMap<&str, Vec<Position>> = entry
        .postings
        .iter()
        .map(|(doc_id, positions)| (doc_id.as_str(), positions.clone()))
        .collect();

    for term in rest {
        let Some(entry) = snapshot.entry(term) else {
            return Vec::new();
        };
        candidates = candidates
            .into_iter()
            .filter_map(|(doc_id, positions)| {
                let next = entry.postings.get(doc_id)?;
                let advanced: Vec<Position> = positions
                    .into_iter()
                    .filter_map(|p| p.checked_add(1))
                    .filter(|p| next.binary_search(p).is_ok())
                    .collect();
                (!advanced.is_empty()).then_some((doc_id, advanced))
            })
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }
    }

    candidates.into_keys().map(str::to_string).collect()
}
