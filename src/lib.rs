pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use axum::{
    routing::{get, patch, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    ai_service::{GeminiProvider, QuizProvider},
    generation_service::GenerationService,
    quiz_validator::ValidationPolicy,
    session_service::SessionStore,
};

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub generation_service: GenerationService,
    pub max_reference_bytes: usize,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn QuizProvider>,
        policy: ValidationPolicy,
        max_reference_bytes: usize,
    ) -> Self {
        let sessions = SessionStore::new();
        let generation_service = GenerationService::new(provider, sessions.clone(), policy);

        Self {
            sessions,
            generation_service,
            max_reference_bytes,
        }
    }

    /// State backed by the Gemini provider.
    pub fn from_config(config: &Config) -> error::Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.ai_timeout_secs))
            .build()
            .map_err(|e| error::Error::Config(format!("HTTP client: {}", e)))?;
        let provider = GeminiProvider::from_config(config, http_client);

        Ok(Self::new(
            Arc::new(provider),
            config.validation_policy,
            config.max_reference_bytes,
        ))
    }
}

/// All routes. Cross-cutting layers (CORS, tracing, body limit) are added by the binary.
pub fn app(state: AppState, generation_rps: u32) -> Router {
    let base_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/catalog", get(routes::catalog::get_catalog));

    let session_api = Router::new()
        .route("/api/sessions", post(routes::quiz::create_session))
        .route(
            "/api/sessions/:id",
            get(routes::quiz::get_session).delete(routes::quiz::delete_session),
        )
        .route(
            "/api/sessions/:id/config",
            axum::routing::put(routes::quiz::update_config),
        )
        .route("/api/sessions/:id/mode", post(routes::quiz::set_mode))
        .route("/api/sessions/:id/level", post(routes::quiz::set_level))
        .route(
            "/api/sessions/:id/question-types/:type_id",
            patch(routes::quiz::update_question_type),
        )
        .route(
            "/api/sessions/:id/reference",
            post(routes::quiz::upload_reference),
        )
        .route("/api/sessions/:id/quiz", get(routes::quiz::get_quiz))
        .route("/api/sessions/:id/images", get(routes::quiz::get_images))
        .route("/api/sessions/:id/view", get(routes::quiz::get_view))
        .route("/api/sessions/:id/export", get(routes::export::export_quiz));

    let generation_api = Router::new()
        .route(
            "/api/sessions/:id/generate",
            post(routes::quiz::generate_quiz),
        )
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rps_state(generation_rps),
            middleware::rate_limit::rps_middleware,
        ));

    base_routes
        .merge(session_api)
        .merge(generation_api)
        .with_state(state)
}
