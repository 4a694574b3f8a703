use crate::index::{DocId, Snapshot};

/// Documents where `left` and `right` occur within `distance` positions of
/// each other, ascending. Symmetric in `left` and `right`.
pub fn evaluate(left: &str, right: &str, distance: u32, snapshot: &Snapshot) -> Vec<DocId> {
    let (Some(a), Some(b)) = (snapshot.entry(left), snapshot.entry(right)) else {
        return Vec::new();
    };

    a.postings
        .iter()
        .filter_map(|(doc_id, xs)| {
            let ys = b.postings.get(doc_id)?;
            within(xs, ys, distance).then(|| doc_id.clone())
        })
        .collect()
}

/// Two-pointer scan over sorted position lists; stops at the first close pair.
fn within(xs: &[u32], ys: &[u32], distance: u32) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < xs.len() && j < ys.len() {
        if xs[i].abs_diff(ys[j]) <= distance {
            return true;
        }
        if xs[i] < ys[j] {
            i += 1;
        } else {
            j += 1;
        }
    }
    false
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

    #[test]
    fn distance_is_inclusive() {
        let s = snap(&[("d1", "cat a b dog")]);
        assert!(evaluate("cat", "dog", 2, &s).is_empty());
        assert_eq!(evaluate("cat", "dog", 3, &s), vec!["d1"]);
    }

    #[test]
    fn symmetric() {
        let s = snap(&[
            ("d1", "dog x cat"),
            ("d2", "cat x x x x dog"),
            ("d3", "dog cat dog"),
            ("d4", "cat"),
        ]);
        for k in 0..6 {
            assert_eq!(evaluate("cat", "dog", k, &s), evaluate("dog", "cat", k, &s), "k = {k}");
        }
        assert_eq!(evaluate("cat", "dog", 1, &s), vec!["d3"]);
        assert_eq!(evaluate("cat", "dog", 2, &s), vec!["d1", "d3"]);
    }

    #[test]
    fn same_term_with_zero_distance() {
        let s = snap(&[("d1", "echo")]);
        assert_eq!(evaluate("echo", "echo", 0, &s), vec!["d1"]);
    }

    #[test]
    fn scans_past_far_pairs() {
        let s = snap(&[("d1", "a x x x x x b x x x x a b")]);
        assert_eq!(evaluate("a", "b", 1, &s), vec!["d1"]);
    }

    #[test]
    fn unknown_term_is_empty() {
        let s = snap(&[("d1", "a b")]);
        assert!(evaluate("a", "zz", 10, &s).is_empty());
        assert!(evaluate("zz", "b", 10, &s).is_empty());
    }
}
