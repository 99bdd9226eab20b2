use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gleaner::api::create_router;
use gleaner::config::Config;
use gleaner::pipeline::Pipeline;

/// Answers questions about the university from web search results.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber (also picks up `log` records from dependencies)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    tracing::info!(
        search_results = config.search_results,
        model = %config.llm_model,
        stop_words = %config.stop_words_language,
        "configuration loaded"
    );

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let app = create_router(pipeline);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
