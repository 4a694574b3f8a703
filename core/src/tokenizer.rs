use crate::index::Term;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Turns raw text into the ordered term stream the index is built from.
///
/// Implementations must be deterministic for a given `(text, remove_stopwords)`
/// pair, otherwise rebuilding an unchanged corpus yields a different snapshot.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str, remove_stopwords: bool) -> Vec<Term>;
}

lazy_static! {
    static ref RE: Regex = Regex::new(r"\p{L}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","ain","all","am","an","and","any","are","aren","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","couldn",
            "d","did","didn","do","does","doesn","doing","don","down","during",
            "each","few","for","from","further",
            "had","hadn","has","hasn","have","haven","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","it","its","itself","just",
            "ll","m","ma","me","mightn","more","most","mustn","my","myself",
            "needn","no","nor","not","now",
            "o","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "re","s","same","shan","she","should","shouldn","so","some","such",
            "t","than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","we","were","weren","what","when","where","which","while","who","whom","why","will","with","won","wouldn",
            "y","you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// English normalizer: NFKC, lowercase, letter runs only, optional stopword
/// removal, Snowball stemming.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishNormalizer;

impl Normalizer for EnglishNormalizer {
    fn normalize(&self, text: &str, remove_stopwords: bool) -> Vec<Term> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        RE.find_iter(&normalized)
            .map(|m| m.as_str())
            .filter(|token| !(remove_stopwords && is_stopword(token)))
            .map(|token| STEMMER.stem(token).into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_and_lowercases() {
        let t = EnglishNormalizer.normalize("Running, runner's RUN!", true);
        assert_eq!(t.first().map(String::as_str), Some("run"));
        assert!(t.iter().all(|w| w.chars().all(char::is_lowercase)));
    }

    #[test]
    fn stopwords_are_optional() {
        let kept = EnglishNormalizer.normalize("the cat", false);
        let dropped = EnglishNormalizer.normalize("the cat", true);
        assert_eq!(kept, vec!["the", "cat"]);
        assert_eq!(dropped, vec!["cat"]);
    }
}
