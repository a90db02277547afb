use axum::extract::DefaultBodyLimit;
use quiz_builder_backend::{
    app,
    config::{get_config, init_config},
    AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let app_state = AppState::from_config(config)?;
    info!(
        quiz_model = %config.quiz_model,
        image_model = %config.image_model,
        validation = ?config.validation_policy,
        "Quiz builder configured"
    );

    {
        let sessions = app_state.sessions.clone();
        let ttl = chrono::Duration::minutes(config.session_ttl_minutes);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                let purged = sessions.purge_idle(ttl);
                if purged > 0 {
                    info!(purged, remaining = sessions.len(), "Idle sessions purged");
                }
            }
        });
    }

    let body_limit = config.max_reference_bytes.max(64 * 1024) + 64 * 1024;
    let app = app(app_state, config.generation_rps)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
