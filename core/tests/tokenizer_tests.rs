use posidx_core::tokenizer::{EnglishNormalizer, Normalizer};

#[test]
fn it_normalizes_and_stems() {
    let words = EnglishNormalizer.normalize("Running Runners RUN! The menu's ﬁsh dish.", true);
    assert!(words.contains(&"run".to_string()));
    // NFKC folds the ligature into plain letters
    assert!(words.contains(&"fish".to_string()));
    assert!(!words.iter().any(|w| w.contains('\'')));
}

#[test]
fn it_filters_stopwords() {
    let words = EnglishNormalizer.normalize("The quick brown fox and the lazy dog", true);
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words.len(), 5);
}

#[test]
fn it_drops_digits_and_punctuation() {
    let words = EnglishNormalizer.normalize("cat 66, big-dog #12", false);
    assert_eq!(words, vec!["cat", "big", "dog"]);
}

#[test]
fn it_is_deterministic() {
    let text = "Warwickshire came from an ancient family and was the heiress to some land";
    assert_eq!(EnglishNormalizer.normalize(text, true), EnglishNormalizer.normalize(text, true));
}
