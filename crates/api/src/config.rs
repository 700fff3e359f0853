//! Process configuration, parsed once at startup.

use std::net::SocketAddr;

use clap::Parser;

use mentorhub_auth::Hs256TokenValidator;
use mentorhub_observability::LogFormat;

const DEV_TOKEN_SECRET: &str = "dev-secret";

/// `mentorhub-api` server arguments. Every flag falls back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mentorhub-api",
    about = "MentorHub administration API",
    version
)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "MENTORHUB_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Postgres connection URL. In-memory repositories are used when omitted.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Maximum size of the Postgres connection pool.
    #[arg(long, env = "MENTORHUB_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// HS256 secret used to verify bearer tokens.
    #[arg(long, env = "MENTORHUB_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Required `aud` claim, if any.
    #[arg(long, env = "MENTORHUB_TOKEN_AUDIENCE")]
    pub token_audience: Option<String>,

    /// Log output: `json` or `pretty`.
    #[arg(long, env = "MENTORHUB_LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Build the bearer token validator.
    ///
    /// Call after tracing is initialized so the insecure-default warning is visible.
    pub fn token_validator(&self) -> Hs256TokenValidator {
        let secret = match &self.token_secret {
            Some(secret) => secret.as_str(),
            None => {
                tracing::warn!("MENTORHUB_TOKEN_SECRET not set; using insecure dev default");
                DEV_TOKEN_SECRET
            }
        };

        let validator = Hs256TokenValidator::new(secret.as_bytes());
        match &self.token_audience {
            Some(audience) => validator.with_audience(audience),
            None => validator,
        }
    }
}
