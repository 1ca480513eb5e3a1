mod config;
mod errors;
mod evaluation;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::evaluation::evaluator::Evaluator;
use crate::evaluation::extractor::PdfTextExtractor;
use crate::evaluation::fetcher::DocumentFetcher;
use crate::evaluation::history::EvaluationHistory;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client. A malformed or rejected key stops startup here.
    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone())
        .context("Completion client initialisation failed")?;
    if config.verify_api_key {
        llm.verify()
            .await
            .context("Completion service rejected the configured credential")?;
        info!("Completion credential verified");
    }
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize the evaluation pipeline
    let fetcher = DocumentFetcher::new(config.scratch_path.clone())
        .context("Failed to build document HTTP client")?;
    info!("Scratch file: {}", config.scratch_path.display());
    let evaluator = Evaluator::new(fetcher, Arc::new(PdfTextExtractor), Arc::new(llm));

    // Build app state
    let state = AppState {
        evaluator: Arc::new(evaluator),
        history: Arc::new(EvaluationHistory::new(config.history_capacity)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
