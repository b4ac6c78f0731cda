mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ohdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let areas = ohdb_core::load_areas(&config.areas_path)?;
    tracing::info!(
        postcode_areas = areas.postcode_areas().len(),
        keyword_groups = areas.keyword_groups().len(),
        "loaded curated area tables"
    );

    let pool_config = ohdb_db::PoolConfig::from_app_config(&config);
    let pool = ohdb_db::connect_pool(&config.database_url, pool_config).await?;
    ohdb_db::run_migrations(&pool).await?;

    let nl = match config.nl_api_key.as_deref() {
        Some(key) => {
            let client = ohdb_engine::NlIntentClient::new(
                &config.nl_base_url,
                key,
                &config.nl_model,
                Duration::from_secs(config.nl_timeout_secs),
            )?;
            tracing::info!(model = %config.nl_model, "nl-intent collaborator enabled");
            Some(Arc::new(client))
        }
        None => {
            tracing::info!("no NL API key configured; using rule-based intent only");
            None
        }
    };

    let state = AppState {
        pool,
        areas: Arc::new(areas),
        nl,
        bare_before_is_closing: config.bare_before_is_closing,
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
