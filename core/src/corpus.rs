use crate::error::{Error, Result};
use crate::index::DocId;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Documents read from a corpus directory, ascending by DocId.
///
/// An unreadable document is excluded and warned about rather than aborting
/// the build; it is listed in `skipped` and does not count toward TotalDocs.
#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<(DocId, String)>,
    pub skipped: Vec<PathBuf>,
}

/// Read every `*.txt` file directly inside `dir`. The file name is the DocId.
pub fn read_corpus<P: AsRef<Path>>(dir: P) -> Result<Corpus> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::CorpusMissing(dir.to_path_buf()));
    }

    let mut corpus = Corpus::default();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable corpus entry");
                if let Some(p) = err.path() {
                    corpus.skipped.push(p.to_path_buf());
                }
                continue;
            }
        };
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        let Some(doc_id) = path.file_name().and_then(|s| s.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping document with a non UTF-8 name");
            corpus.skipped.push(path.to_path_buf());
            continue;
        };
        match fs::read_to_string(path) {
            Ok(text) => corpus.documents.push((doc_id.to_string(), text)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable document");
                corpus.skipped.push(path.to_path_buf());
            }
        }
    }
    corpus.documents.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::info!(
        dir = %dir.display(),
        documents = corpus.documents.len(),
        skipped = corpus.skipped.len(),
        "read corpus"
    );
    Ok(corpus)
}
