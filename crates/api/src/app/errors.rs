use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use mentorhub_auth::AuthzError;
use mentorhub_core::DomainError;
use mentorhub_infra::RepositoryError;

/// Error returned by handlers and the auth middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthenticated => {
                json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required")
            }
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Authz(err @ AuthzError::Forbidden { .. }) => {
                json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
            }
            ApiError::Authz(AuthzError::Evaluation(err)) => internal("ability_evaluation", &err),
            ApiError::Repository(err) => repository_error_to_response(err),
            ApiError::Domain(err) => domain_error_to_response(err),
        }
    }
}

fn repository_error_to_response(err: RepositoryError) -> Response {
    match err {
        err @ RepositoryError::NotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        RepositoryError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        RepositoryError::Domain(err) => domain_error_to_response(err),
        err @ (RepositoryError::Storage(_) | RepositoryError::Serialization(_)) => {
            internal("repository", &err)
        }
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::RuleViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "rule_violation", msg)
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

/// Log the detail, answer with a generic body.
fn internal(source: &'static str, err: &dyn std::error::Error) -> Response {
    tracing::error!(source, error = %err, "request failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentorhub_auth::{AbilityError, Action, ResourceArea};

    fn status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(status(ApiError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(AuthzError::Forbidden { action: Action::View, area: ResourceArea::UserArea }.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(RepositoryError::NotFound { aggregate: "mentoring.mentor", id: "x".into() }.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(RepositoryError::Conflict("stale".into()).into()), StatusCode::CONFLICT);
        assert_eq!(status(DomainError::rule_violation("archived").into()), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(DomainError::validation("empty").into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(RepositoryError::Storage("down".into()).into()), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status(
                AuthzError::Evaluation(AbilityError::MissingField {
                    area: ResourceArea::SessionArea,
                    field: "owner",
                })
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
