use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use mentorhub_api::app::{AppState, build_app};
use mentorhub_api::config::ServerConfig;
use mentorhub_infra::postgres;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    mentorhub_observability::init(config.log_format);

    let state = match &config.database_url {
        Some(url) => {
            let pool = postgres::connect(url, config.db_max_connections)
                .await
                .context("connecting to postgres")?;
            postgres::ensure_schema(&pool)
                .await
                .context("creating repository schema")?;
            tracing::info!(
                max_connections = config.db_max_connections,
                "using postgres repositories"
            );
            AppState::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory repositories");
            AppState::in_memory()
        }
    };

    let app = build_app(state, Arc::new(config.token_validator()));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
