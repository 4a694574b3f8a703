use crate::builder;
use crate::corpus::read_corpus;
use crate::error::{Error, Result};
use crate::index::{DocLengths, InvertedIndex, Snapshot, SoundexMap};
use crate::tokenizer::Normalizer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Bumped whenever the on-disk index record changes shape.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnapshotFormat {
    #[default]
    Json,
    Bincode,
}

impl SnapshotFormat {
    fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Bincode => "bin",
        }
    }
}

impl FromStr for SnapshotFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SnapshotFormat::Json),
            "bincode" | "bin" => Ok(SnapshotFormat::Bincode),
            other => Err(format!("unknown snapshot format {other:?} (expected json or bincode)")),
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotFormat::Json => f.write_str("json"),
            SnapshotFormat::Bincode => f.write_str("bincode"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
    pub format: SnapshotFormat,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf(), format: SnapshotFormat::default() }
    }

    pub fn with_format(mut self, format: SnapshotFormat) -> Self {
        self.format = format;
        self
    }

    pub fn index(&self) -> PathBuf {
        self.root.join(format!("index.{}", self.format.extension()))
    }

    pub fn doc_lengths(&self) -> PathBuf {
        self.root.join(format!("doc_lengths.{}", self.format.extension()))
    }
}

#[derive(Serialize)]
struct IndexRecordRef<'a> {
    version: u32,
    doc_lengths_crc: u32,
    inverted_index: &'a InvertedIndex,
    soundex_map: &'a SoundexMap,
    total_docs: u32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexRecord {
    version: u32,
    /// CRC32 of the document-length record written alongside this one.
    doc_lengths_crc: u32,
    inverted_index: InvertedIndex,
    soundex_map: SoundexMap,
    total_docs: u32,
}

fn encode<T: Serialize>(format: SnapshotFormat, value: &T) -> Result<Vec<u8>> {
    Ok(match format {
        SnapshotFormat::Json => serde_json::to_vec_pretty(value)?,
        SnapshotFormat::Bincode => bincode::serialize(value)?,
    })
}

/// Decode one record. A truncated or syntactically broken file yields
/// `Ok(None)`; a complete file of the wrong shape is an `Error::Schema`.
fn decode<T: DeserializeOwned>(format: SnapshotFormat, path: &Path, bytes: &[u8]) -> Result<Option<T>> {
    let (corrupt, reason) = match format {
        SnapshotFormat::Json => match serde_json::from_slice(bytes) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => (matches!(e.classify(), Category::Syntax | Category::Eof | Category::Io), e.to_string()),
        },
        SnapshotFormat::Bincode => match bincode::deserialize(bytes) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => (matches!(*e, bincode::ErrorKind::Io(_)), e.to_string()),
        },
    };
    if corrupt {
        tracing::warn!(path = %path.display(), error = %reason, "snapshot record is corrupt, ignoring it");
        Ok(None)
    } else {
        Err(Error::Schema { path: path.to_path_buf(), reason })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Persist both records. The index record is written last and carries the
/// checksum of the document lengths, so a save interrupted between the two
/// writes is detected on load and treated as no snapshot.
pub fn save_snapshot(paths: &IndexPaths, snapshot: &Snapshot) -> Result<()> {
    fs::create_dir_all(&paths.root)?;
    let lengths = encode(paths.format, &snapshot.doc_lengths)?;
    write_atomic(&paths.doc_lengths(), &lengths)?;
    let record = IndexRecordRef {
        version: SNAPSHOT_VERSION,
        doc_lengths_crc: crc32fast::hash(&lengths),
        inverted_index: &snapshot.inverted_index,
        soundex_map: &snapshot.soundex_map,
        total_docs: snapshot.total_docs,
    };
    write_atomic(&paths.index(), &encode(paths.format, &record)?)?;
    tracing::info!(root = %paths.root.display(), format = %paths.format, "saved snapshot");
    Ok(())
}

/// Load a persisted snapshot.
///
/// Returns `Ok(None)` when either record is missing, truncated, or from a
/// different save than its partner. A record that decodes but has the wrong
/// shape, another version, or violates an index invariant is an
/// `Error::Schema`.
pub fn load_snapshot(paths: &IndexPaths) -> Result<Option<Snapshot>> {
    let index_path = paths.index();
    let lengths_path = paths.doc_lengths();
    if !index_path.is_file() || !lengths_path.is_file() {
        tracing::info!(root = %paths.root.display(), "no snapshot on disk");
        return Ok(None);
    }

    let Some(record) = decode::<IndexRecord>(paths.format, &index_path, &fs::read(&index_path)?)? else {
        return Ok(None);
    };
    if record.version != SNAPSHOT_VERSION {
        return Err(Error::Schema {
            path: index_path,
            reason: format!("version {} is not supported (expected {SNAPSHOT_VERSION})", record.version),
        });
    }
    let lengths = fs::read(&lengths_path)?;
    if crc32fast::hash(&lengths) != record.doc_lengths_crc {
        tracing::warn!(path = %lengths_path.display(), "document lengths do not match the index record, ignoring snapshot");
        return Ok(None);
    }
    let Some(doc_lengths) = decode::<DocLengths>(paths.format, &lengths_path, &lengths)? else {
        return Ok(None);
    };

    let snapshot = Snapshot {
        inverted_index: record.inverted_index,
        doc_lengths,
        soundex_map: record.soundex_map,
        total_docs: record.total_docs,
    };
    snapshot
        .validate()
        .map_err(|e| Error::Schema { path: index_path, reason: e.to_string() })?;
    tracing::info!(root = %paths.root.display(), total_docs = snapshot.total_docs, "loaded snapshot");
    Ok(Some(snapshot))
}

/// Build a snapshot from the corpus and persist it, replacing any previous one.
pub fn rebuild<N>(paths: &IndexPaths, corpus_dir: &Path, normalizer: &N) -> Result<Snapshot>
where
    N: Normalizer + ?Sized,
{
    let corpus = read_corpus(corpus_dir)?;
    if !corpus.skipped.is_empty() {
        tracing::warn!(skipped = corpus.skipped.len(), "documents excluded from the index");
    }
    let snapshot = builder::build(corpus.documents, normalizer)?;
    save_snapshot(paths, &snapshot)?;
    Ok(snapshot)
}

/// Load the persisted snapshot, building it from `corpus_dir` when absent.
pub fn load_or_build<N>(paths: &IndexPaths, corpus_dir: &Path, normalizer: &N) -> Result<Snapshot>
where
    N: Normalizer + ?Sized,
{
    match load_snapshot(paths)? {
        Some(snapshot) => Ok(snapshot),
        None => rebuild(paths, corpus_dir, normalizer),
    }
}
