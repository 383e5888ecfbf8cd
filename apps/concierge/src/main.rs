mod config;
mod conversation;
mod errors;
mod llm_client;
mod location;
mod models;
mod recommendations;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::conversation::session::{Engine, SessionStore};
use crate::llm_client::GeminiClient;
use crate::location::NominatimResolver;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting concierge v{}", env!("CARGO_PKG_VERSION"));

    let upstream = Arc::new(GeminiClient::new(config.gemini_api_key.clone()));
    info!("Gemini client initialized (model: {})", llm_client::MODEL);

    let resolver = Arc::new(NominatimResolver::new(config.geocoder_url.clone()));
    info!("Reverse geocoder: {}", config.geocoder_url);
    info!("Load-more dedup policy: {:?}", config.load_more_dedup);

    let sessions = Arc::new(SessionStore::new());
    sessions.spawn_sweeper(config.session_idle_ttl);
    info!(
        "Idle sessions expire after {}s",
        config.session_idle_ttl.as_secs()
    );

    let state = AppState {
        sessions,
        engine: Engine::new(upstream, resolver),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
