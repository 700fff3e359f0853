//! HTTP application wiring.
//!
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: request/response shapes
//! - `errors.rs`: error to status mapping

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use sqlx::PgPool;

use mentorhub_auth::TokenValidator;
use mentorhub_infra::{InMemoryRepository, PostgresRepository, Repository};
use mentorhub_mentoring::{Mentor, Student};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Repositories shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub mentors: Arc<dyn Repository<Mentor>>,
    pub students: Arc<dyn Repository<Student>>,
}

impl AppState {
    /// Process-local storage. Contents are lost on restart.
    pub fn in_memory() -> Self {
        Self {
            mentors: Arc::new(InMemoryRepository::<Mentor>::new()),
            students: Arc::new(InMemoryRepository::<Student>::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            mentors: Arc::new(PostgresRepository::<Mentor>::new(pool.clone())),
            students: Arc::new(PostgresRepository::<Student>::new(pool)),
        }
    }
}

/// Build the full HTTP router.
///
/// `/health` is public; everything else requires a valid bearer token.
pub fn build_app(state: AppState, tokens: Arc<dyn TokenValidator>) -> Router {
    let auth_state = middleware::AuthState { tokens };

    let protected = routes::router()
        .layer(Extension(state))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
