use axum::{Router, routing::get};

pub mod mentors;
pub mod students;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/abilities", get(system::abilities))
        .route("/roles", get(system::roles))
        .nest("/mentors", mentors::router())
        .nest("/students", students::router())
}
