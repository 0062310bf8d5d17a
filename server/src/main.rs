use anyhow::{Context, Result};
use axum::Router;
use cinedex_core::persist::IndexPaths;
use cinedex_core::schema::{OVERVIEW, TITLE};
use cinedex_core::{Engine, FieldBoosts, Schema};
use cinedex_server::{build_app, DEFAULT_MAX_UPLOAD_BYTES};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Snapshot directory, loaded at startup and written on shutdown. In-memory only when omitted
    #[arg(long)]
    index: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 3000)]
    port: u16,
    /// Score multiplier for title matches
    #[arg(long, default_value_t = 2.0)]
    title_boost: f32,
    /// Score multiplier for overview matches
    #[arg(long, default_value_t = 1.0)]
    overview_boost: f32,
    /// Maximum accepted upload size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let boosts = FieldBoosts::new([(TITLE, args.title_boost), (OVERVIEW, args.overview_boost)])?;
    let paths = args.index.as_ref().map(IndexPaths::new);
    let engine = match &paths {
        Some(paths) => Engine::load(paths, Schema::movies(), boosts).context("loading snapshot")?,
        None => Engine::new(Schema::movies(), boosts),
    };
    let engine = Arc::new(engine);
    let app: Router = build_app(Arc::clone(&engine), args.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, num_docs = engine.stats().num_docs, "server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    if let Some(paths) = &paths {
        engine.save(paths).context("saving snapshot")?;
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
