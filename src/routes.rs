use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::models::{AnswerResponse, ChatRequest, ErrorResponse};
use crate::rag::{RAGEngine, SearchMode};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

pub struct AppState {
    pub engine: RAGEngine,
    landing_page: String,
}

impl AppState {
    pub fn new(engine: RAGEngine, page_title: &str) -> Self {
        let landing_page = INDEX_TEMPLATE.replace("{{ title }}", &escape_html(page_title));
        Self { engine, landing_page }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn app_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(landing_page))
        .route("/chat", post(chat_handler))
        .route("/api/health", get(health_check))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn landing_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.landing_page.clone())
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = Uuid::new_v4();

    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected request {}: {}", request_id, rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "Invalid request body: {}",
                rejection.body_text()
            ))),
        )
    })?;

    let mode = request.option.parse::<SearchMode>().map_err(|e| {
        tracing::warn!("Rejected request {}: {}", request_id, e);
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string())))
    })?;

    tracing::info!("Request {} ({}): {} chars", request_id, mode, request.message.len());
    let answer = state.engine.answer(&request.message, mode).await;

    Ok(Json(AnswerResponse { answer }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "store": state.engine.backend().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>R&D</b>"), "&lt;b&gt;R&amp;D&lt;/b&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
