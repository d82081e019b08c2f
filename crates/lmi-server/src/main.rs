mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use lmi_core::{AppConfig, FieldMap};
use lmi_insight::GeminiClient;
use lmi_market::Pipeline;
use lmi_scraper::ApifyClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = lmi_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let state = build_state(&config)?;
    let rate_limit = RateLimitState::per_minute(config.search_rate_limit_per_minute);
    let app = build_app(state, rate_limit);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "lmi-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let field_map = match &config.field_map_path {
        Some(path) => lmi_core::load_field_map(path)
            .with_context(|| format!("failed to load field map from {}", path.display()))?,
        None => FieldMap::default(),
    };

    let scraper = if config.apify_token.is_some() {
        Some(Arc::new(
            ApifyClient::from_config(config).context("failed to build Apify client")?,
        ))
    } else {
        tracing::warn!("APIFY_TOKEN not set; /api/v1/search will answer 503");
        None
    };

    let insight = if config.gemini_api_key.is_some() {
        Some(Arc::new(
            GeminiClient::from_config(config).context("failed to build Gemini client")?,
        ))
    } else {
        tracing::info!("GEMINI_API_KEY not set; narrative commentary disabled");
        None
    };

    Ok(AppState {
        pipeline: Arc::new(Pipeline::new(field_map)),
        scraper,
        insight,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
