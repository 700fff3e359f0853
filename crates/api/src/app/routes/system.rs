use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;

use mentorhub_auth::{
    Action, AuthorizationExplanation, Principal, ResourceArea, RoleDefinition, Rule,
    explain_authorization, role_catalogue,
};

use crate::app::dto::ExplainQuery;
use crate::app::errors::ApiError;
use crate::context::RequestContext;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /whoami
pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> Json<Principal> {
    Json(ctx.principal().clone())
}

#[derive(Debug, Serialize)]
pub struct AbilitiesResponse {
    pub rules: Vec<Rule>,
    pub grants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<AuthorizationExplanation>,
}

/// GET /abilities?action=..&area=..
///
/// Lists the caller's rules. With both query parameters, also explains the
/// decision for that pair without a record.
pub async fn abilities(
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ExplainQuery>,
) -> Result<Json<AbilitiesResponse>, ApiError> {
    let explanation = match (query.action.as_deref(), query.area.as_deref()) {
        (None, None) => None,
        (Some(action), Some(area)) => {
            let action = action
                .parse::<Action>()
                .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
            let area = area
                .parse::<ResourceArea>()
                .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
            Some(explain_authorization(ctx.principal(), ctx.ability(), action, area, None))
        }
        _ => {
            return Err(ApiError::BadRequest(
                "action and area must be given together".to_string(),
            ));
        }
    };

    let rules: Vec<Rule> = ctx.ability().rules().copied().collect();
    let grants = rules.iter().map(Rule::describe).collect();
    Ok(Json(AbilitiesResponse { rules, grants, explanation }))
}

/// GET /roles
pub async fn roles(
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<RoleDefinition>>, ApiError> {
    ctx.require_area(Action::Manage, ResourceArea::UserArea)?;
    Ok(Json(role_catalogue()))
}
