use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use posidx_core::persist::{self, IndexPaths, SnapshotFormat};
use posidx_core::{EnglishNormalizer, Engine, SearchResults};
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a positional inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Snapshot directory
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Corpus directory of .txt files, used when the snapshot must be built
    #[arg(long, default_value = "./corpus")]
    corpus: PathBuf,
    /// Snapshot encoding: json or bincode
    #[arg(long, default_value_t = SnapshotFormat::Json)]
    format: SnapshotFormat,
    /// Rebuild from the corpus even if a snapshot exists
    #[arg(long, default_value_t = false)]
    rebuild: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot from a corpus directory, replacing any existing one
    Build {
        /// Corpus directory of .txt files
        #[arg(long)]
        corpus: PathBuf,
        /// Output snapshot directory
        #[arg(long)]
        output: PathBuf,
        /// Snapshot encoding: json or bincode
        #[arg(long, default_value_t = SnapshotFormat::Json)]
        format: SnapshotFormat,
    },
    /// Run a single query
    Search {
        #[command(flatten)]
        snapshot: SnapshotArgs,
        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Free text, "a phrase", or "a" w/k "b"
        query: String,
    },
    /// Read queries from stdin until `exit`
    Repl {
        #[command(flatten)]
        snapshot: SnapshotArgs,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { corpus, output, format } => {
            let paths = IndexPaths::new(&output).with_format(format);
            let snapshot = persist::rebuild(&paths, &corpus, &EnglishNormalizer)
                .with_context(|| format!("building index from {}", corpus.display()))?;
            let stats = snapshot.stats();
            tracing::info!(output = %output.display(), total_docs = stats.total_docs, terms = stats.terms, "index build complete");
            Ok(())
        }
        Commands::Search { snapshot, json, query } => {
            let engine = open_engine(&snapshot)?;
            let results = engine.search(&query);
            let mut out = io::stdout().lock();
            if json {
                serde_json::to_writer_pretty(&mut out, &results)?;
                writeln!(out)?;
            } else {
                print_results(&mut out, &results)?;
            }
            Ok(())
        }
        Commands::Repl { snapshot } => {
            let engine = open_engine(&snapshot)?;
            repl(&engine)
        }
    }
}

fn open_engine(args: &SnapshotArgs) -> Result<Engine> {
    let paths = IndexPaths::new(&args.index).with_format(args.format);
    let snapshot = if args.rebuild {
        persist::rebuild(&paths, &args.corpus, &EnglishNormalizer)
    } else {
        persist::load_or_build(&paths, &args.corpus, &EnglishNormalizer)
    }
    .with_context(|| format!("opening snapshot in {}", args.index.display()))?;
    Ok(Engine::new(Arc::new(snapshot), Arc::new(EnglishNormalizer)))
}

fn repl(engine: &Engine) -> Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    writeln!(out, "Proximity queries look like: \"term1\" w/k \"term2\". Type 'exit' to quit.")?;
    loop {
        write!(out, "\nquery> ")?;
        out.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        let results = engine.search(line);
        print_results(&mut out, &results)?;
    }
    Ok(())
}

fn print_results<W: Write>(out: &mut W, results: &SearchResults) -> io::Result<()> {
    if results.is_empty() {
        return writeln!(out, "No matching documents found.");
    }
    match results {
        SearchResults::Ranked(hits) => {
            writeln!(out, "Results (ranked by cosine similarity):")?;
            for (rank, hit) in hits.iter().enumerate() {
                writeln!(out, "{}. {}  score {:.6}", rank + 1, hit.doc_id, hit.score)?;
            }
        }
        SearchResults::Unranked(docs) => {
            writeln!(out, "Documents matching query:")?;
            for doc_id in docs {
                writeln!(out, "- {doc_id}")?;
            }
        }
    }
    Ok(())
}
