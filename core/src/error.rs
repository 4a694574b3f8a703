use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("corpus directory {0:?} does not exist or is not a directory")]
    CorpusMissing(PathBuf),

    #[error("document {0:?} was ingested twice")]
    DuplicateDocument(String),

    #[error("snapshot file {path:?} is not a valid index snapshot: {reason}")]
    Schema { path: PathBuf, reason: String },

    #[error("snapshot is inconsistent: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
