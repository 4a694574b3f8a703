use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use posidx_core::persist::{self, IndexPaths, SnapshotFormat};
use posidx_core::{EnglishNormalizer, Engine, Normalizer, SearchResults, Snapshot, SnapshotStats};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub index_dir: PathBuf,
    pub corpus_dir: PathBuf,
    pub format: SnapshotFormat,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub snippets: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub kind: &'static str,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Shared handler state. The snapshot is replaced wholesale on rebuild; a
/// query clones the current `Arc` once and never observes a partial index.
#[derive(Clone)]
pub struct AppState {
    pub paths: IndexPaths,
    pub corpus_dir: PathBuf,
    pub snapshot: Arc<RwLock<Arc<Snapshot>>>,
    pub normalizer: Arc<dyn Normalizer>,
    pub admin_token: Option<String>,
    rebuild_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn engine(&self) -> Engine {
        Engine::new(self.snapshot.read().clone(), self.normalizer.clone())
    }

    pub fn publish(&self, snapshot: Snapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let paths = IndexPaths::new(&config.index_dir).with_format(config.format);
    let normalizer: Arc<dyn Normalizer> = Arc::new(EnglishNormalizer);
    let snapshot = persist::load_or_build(&paths, &config.corpus_dir, normalizer.as_ref())?;
    tracing::info!(total_docs = snapshot.total_docs, "snapshot ready");

    let app_state = AppState {
        paths,
        corpus_dir: config.corpus_dir,
        snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
        normalizer,
        admin_token: config.admin_token,
        rebuild_lock: Arc::new(tokio::sync::Mutex::new(())),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let engine = state.engine();
    let results = engine.search(&params.q);
    let total_hits = results.len();

    let raw_terms = if params.snippets { highlight_words(&params.q) } else { Vec::new() };
    let snippet_for = |doc_id: &str| {
        if params.snippets {
            snippet_from_file(&state.corpus_dir.join(doc_id), &raw_terms)
        } else {
            None
        }
    };
    let (kind, results): (&'static str, Vec<SearchHit>) = match results {
        SearchResults::Ranked(hits) => (
            "ranked",
            hits.into_iter()
                .map(|h| SearchHit { snippet: snippet_for(&h.doc_id), score: Some(h.score), doc_id: h.doc_id })
                .collect(),
        ),
        SearchResults::Unranked(ids) => (
            "unranked",
            ids.into_iter()
                .map(|doc_id| SearchHit { snippet: snippet_for(&doc_id), score: None, doc_id })
                .collect(),
        ),
    };

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, kind, total_hits, "search served");
    Json(SearchResponse { query: params.q, kind, took_s: elapsed.as_secs_f64(), total_hits, results })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<SnapshotStats> {
    Json(state.snapshot.read().stats())
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    // Only DocIds known to the snapshot map to files, which keeps paths inside the corpus.
    let known = state.snapshot.read().doc_lengths.contains_key(&doc_id);
    if !known {
        return Err((StatusCode::NOT_FOUND, format!("unknown document {doc_id}")));
    }
    let text = std::fs::read_to_string(state.corpus_dir.join(&doc_id))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("reading {doc_id}: {e}")))?;
    Ok(Json(serde_json::json!({ "doc_id": doc_id, "text": text })))
}

/// Rebuild from the corpus off to the side, then swap the new snapshot in.
async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<SnapshotStats>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let Ok(_guard) = state.rebuild_lock.try_lock() else {
        return Err((StatusCode::CONFLICT, "a rebuild is already running".into()));
    };

    let (paths, corpus_dir, normalizer) = (state.paths.clone(), state.corpus_dir.clone(), state.normalizer.clone());
    let built = tokio::task::spawn_blocking(move || persist::rebuild(&paths, &corpus_dir, normalizer.as_ref()))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("rebuild task failed: {e}")))?;
    let snapshot = built.map_err(|e| {
        tracing::error!(error = %e, "rebuild failed, keeping the current snapshot");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let stats = snapshot.stats();
    state.publish(snapshot);
    tracing::info!(total_docs = stats.total_docs, terms = stats.terms, "published rebuilt snapshot");
    Ok(Json(stats))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

/// Words of the raw query worth highlighting: quotes and `w/k` operators removed.
fn highlight_words(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|w| w.trim_matches('"'))
        .filter(|w| !w.is_empty())
        .filter(|w| {
            let lower = w.to_ascii_lowercase();
            !(lower.starts_with("w/") && lower[2..].chars().all(|c| c.is_ascii_digit()))
        })
        .map(str::to_string)
        .collect()
}

fn snippet_from_file(path: &std::path::Path, raw_terms: &[String]) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    if text.is_empty() { return None; }
    // find first match (case-insensitive) of any raw term
    let first_idx = raw_terms
        .iter()
        .find_map(|t| case_insensitive(t).and_then(|re| re.find(&text)).map(|m| m.start()));
    let snippet = match first_idx {
        Some(idx) => {
            let start = floor_boundary(&text, idx.saturating_sub(100));
            let end = floor_boundary(&text, (idx + 200).min(text.len()));
            text[start..end].to_string()
        }
        None => text.chars().take(200).collect(),
    };
    Some(highlight_terms(&snippet, raw_terms))
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn case_insensitive(term: &str) -> Option<regex::Regex> {
    RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build().ok()
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for pat in terms.iter().filter_map(|t| case_insensitive(t)) {
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_words_drop_operators() {
        assert_eq!(highlight_words(r#""rust" W/3 "memory safety""#), vec!["rust", "memory", "safety"]);
        assert_eq!(highlight_words("w/ward"), vec!["w/ward"]);
    }

    #[test]
    fn highlights_case_insensitively() {
        let out = highlight_terms("Rust and rust", &["RUST".to_string()]);
        assert_eq!(out, "<em>Rust</em> and <em>rust</em>");
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let text = format!("{}needle{}", "é".repeat(120), "ü".repeat(150));
        std::fs::write(&path, &text).unwrap();
        let snippet = snippet_from_file(&path, &["needle".to_string()]).unwrap();
        assert!(snippet.contains("<em>needle</em>"));
    }
}
