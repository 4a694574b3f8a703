pub mod builder;
pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod soundex;
pub mod tokenizer;

pub use builder::IndexBuilder;
pub use error::{Error, Result};
pub use index::{
    DocId, DocLengths, InvertedIndex, Position, Postings, PostingsEntry, Snapshot, SnapshotStats,
    SoundexMap, Term,
};
pub use query::{Engine, Query, ScoredDoc, SearchResults};
pub use tokenizer::{EnglishNormalizer, Normalizer};
