mod config;
mod db;
mod docio;
mod errors;
mod generation;
mod llm_client;
mod models;
mod orchestrator;
mod retrieval;
mod routes;
mod routing;
mod separator;
mod sessions;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::generation::HandlerRegistry;
use crate::llm_client::{LlmClient, TextCompletion};
use crate::orchestrator::Orchestrator;
use crate::retrieval::index::{HttpVectorIndex, SimilarityIndex};
use crate::retrieval::ContextRetriever;
use crate::routes::build_router;
use crate::routing::IntentRouter;
use crate::state::{AppState, SessionLocks};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumate API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client
    let llm: Arc<dyn TextCompletion> = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize vector index client
    let index: Arc<dyn SimilarityIndex> =
        Arc::new(HttpVectorIndex::new(config.vector_index_url.clone()));
    info!("Vector index client initialized ({})", config.vector_index_url);

    // Wire the pipeline
    let router = IntentRouter::new(llm.clone(), config.tuning.history_window);
    let retriever = ContextRetriever::new(index.clone(), &config.tuning);
    let registry = HandlerRegistry::llm_backed(llm.clone());

    let orchestrator = Arc::new(Orchestrator::new(
        db.clone(),
        s3,
        config.s3_bucket.clone(),
        router,
        retriever,
        registry,
        index,
        config.tuning.clone(),
    ));

    // Build app state
    let state = AppState {
        db,
        orchestrator,
        session_locks: SessionLocks::default(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resumate-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
