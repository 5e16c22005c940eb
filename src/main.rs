use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod analysis;
mod api;
mod chat;
mod config;
mod conversation;
mod error;
mod export;
mod model;
mod prompts;
mod providers;
#[cfg(test)]
mod testing;
mod voice;

use api::AppState;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment wins.
    let _ = dotenvy::dotenv();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // -----------------------------
    // Shared state / Dependencies
    // -----------------------------
    let config = Config::from_env()?;
    let addr = config.bind_addr();
    let body_limit = config.max_upload_bytes;
    let state = AppState::from_config(config)?;

    // -----------------------------
    // Routers
    // -----------------------------
    let app = api::router()
        .layer(DefaultBodyLimit::max(body_limit))
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!(%addr, "Dynamo AI hub listening");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
