use anyhow::Result;
use axum::Router;
use clap::Parser;
use posidx_core::persist::SnapshotFormat;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use server::{build_app, ServerConfig};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Snapshot directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Corpus directory, used to build the snapshot when none exists
    #[arg(long, default_value = "./corpus")]
    corpus: PathBuf,
    /// Snapshot encoding: json or bincode
    #[arg(long, default_value_t = SnapshotFormat::Json)]
    format: SnapshotFormat,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig {
        index_dir: args.index,
        corpus_dir: args.corpus,
        format: args.format,
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    };
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
