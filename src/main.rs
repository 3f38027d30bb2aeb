use std::sync::Arc;

use anyhow::Result;

use rag_web::config::AppConfig;
use rag_web::logger;
use rag_web::rag::RAGEngine;
use rag_web::routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logger::init_tracing();

    let config = AppConfig::load()?;
    tracing::info!("Connecting to Azure OpenAI: {}", config.openai.endpoint);
    tracing::info!("Connecting to Qdrant: {}", config.store.url);

    let engine = RAGEngine::initialize(&config).await?;
    tracing::info!("RAG engine ready ({} store, collection {})", engine.backend(), engine.collection());

    let state = Arc::new(AppState::new(engine, &config.server.page_title));
    let app = app_router(state, &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!("Serving the app on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
