use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use mentorhub_auth::{Action, ResourceArea};
use mentorhub_core::UserId;
use mentorhub_infra::StoredEvent;
use mentorhub_mentoring::{Clearance, Mentor, MentorEvent};

use crate::app::AppState;
use crate::app::dto::{
    self, ArchiveRequest, MentorResponse, RecordCheckRequest, RegisterMentorRequest,
};
use crate::app::errors::ApiError;
use crate::authz::{check_record, mentor_record, prospective_mentor_record};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_mentor))
        .route("/:id", get(get_mentor))
        .route("/:id/history", get(mentor_history))
        .route("/:id/archive", post(archive_mentor))
        .route("/:id/unarchive", post(unarchive_mentor))
        .route("/:id/checks/police", post(record_police_check))
        .route("/:id/checks/wwc", post(record_wwc_check))
}

#[derive(Clone, Copy)]
enum CheckKind {
    Police,
    Wwc,
}

/// POST /mentors
pub async fn register_mentor(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<RegisterMentorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MentorResponse>), ApiError> {
    ctx.require_area(Action::Create, ResourceArea::UserArea)?;
    let req = dto::body(payload)?;
    ctx.require(
        Action::Create,
        &prospective_mentor_record(req.user_id, req.chapter_id),
    )?;

    let mut mentor = Mentor::register(
        req.user_id,
        req.chapter_id,
        req.full_name,
        req.email,
        Utc::now(),
    )?;
    state.mentors.save(&mut mentor).await?;

    tracing::info!(mentor_id = %mentor.id(), by = %ctx.principal().id(), "mentor registered");
    Ok((StatusCode::CREATED, respond(&ctx, &mentor)?))
}

/// GET /mentors/:id
pub async fn get_mentor(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<MentorResponse>, ApiError> {
    let mentor = load(&state, &ctx, Action::View, &id).await?;
    respond(&ctx, &mentor)
}

/// GET /mentors/:id/history
pub async fn mentor_history(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StoredEvent>>, ApiError> {
    let mentor = load(&state, &ctx, Action::View, &id).await?;
    let mut events = state.mentors.history(mentor.id()).await?;
    if !clearances_visible(&ctx, &mentor)? {
        events.retain(|event| !MentorEvent::reveals_clearance(&event.event_type));
    }
    Ok(Json(events))
}

/// POST /mentors/:id/archive
pub async fn archive_mentor(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    payload: Result<Json<ArchiveRequest>, JsonRejection>,
) -> Result<Json<MentorResponse>, ApiError> {
    let mut mentor = load(&state, &ctx, Action::Archive, &id).await?;
    let req = dto::body(payload)?;

    mentor.archive(req.reason, Utc::now())?;
    state.mentors.save(&mut mentor).await?;

    tracing::info!(mentor_id = %mentor.id(), by = %ctx.principal().id(), "mentor archived");
    respond(&ctx, &mentor)
}

/// POST /mentors/:id/unarchive
pub async fn unarchive_mentor(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<MentorResponse>, ApiError> {
    let mut mentor = load(&state, &ctx, Action::Archive, &id).await?;

    mentor.unarchive(Utc::now())?;
    state.mentors.save(&mut mentor).await?;

    tracing::info!(mentor_id = %mentor.id(), by = %ctx.principal().id(), "mentor unarchived");
    respond(&ctx, &mentor)
}

/// POST /mentors/:id/checks/police
pub async fn record_police_check(
    state: Extension<AppState>,
    ctx: Extension<RequestContext>,
    id: Path<String>,
    payload: Result<Json<RecordCheckRequest>, JsonRejection>,
) -> Result<Json<MentorResponse>, ApiError> {
    record_check(state, ctx, id, payload, CheckKind::Police).await
}

/// POST /mentors/:id/checks/wwc
pub async fn record_wwc_check(
    state: Extension<AppState>,
    ctx: Extension<RequestContext>,
    id: Path<String>,
    payload: Result<Json<RecordCheckRequest>, JsonRejection>,
) -> Result<Json<MentorResponse>, ApiError> {
    record_check(state, ctx, id, payload, CheckKind::Wwc).await
}

async fn record_check(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    payload: Result<Json<RecordCheckRequest>, JsonRejection>,
    kind: CheckKind,
) -> Result<Json<MentorResponse>, ApiError> {
    let id: UserId = id.parse()?;

    ctx.require_area(Action::Update, ResourceArea::CheckArea)?;
    let mut mentor = state.mentors.find_by_id(id).await?;
    ctx.require(Action::Update, &check_record(&mentor))?;
    let req = dto::body(payload)?;

    let clearance = Clearance::new(req.reference, req.expires_on)?;
    let at = Utc::now();
    match kind {
        CheckKind::Police => mentor.record_police_check(clearance, at)?,
        CheckKind::Wwc => mentor.record_wwc_check(clearance, at)?,
    }
    state.mentors.save(&mut mentor).await?;

    respond(&ctx, &mentor)
}

/// Parse the id, gate on the area, load, then gate on the loaded record.
///
/// A principal with no grant on the area is refused before the lookup.
async fn load(
    state: &AppState,
    ctx: &RequestContext,
    action: Action,
    id: &str,
) -> Result<Mentor, ApiError> {
    let id: UserId = id.parse()?;
    ctx.require_area(action, ResourceArea::UserArea)?;

    let mentor = state.mentors.find_by_id(id).await?;
    ctx.require(action, &mentor_record(&mentor))?;
    Ok(mentor)
}

/// Clearances are `CheckArea` data: callers who may view the profile but not
/// the checks get neither the clearance fields nor the check events.
fn clearances_visible(ctx: &RequestContext, mentor: &Mentor) -> Result<bool, ApiError> {
    Ok(ctx.allows(Action::View, &check_record(mentor))?)
}

fn respond(ctx: &RequestContext, mentor: &Mentor) -> Result<Json<MentorResponse>, ApiError> {
    let show = clearances_visible(ctx, mentor)?;
    Ok(Json(MentorResponse::new(mentor, show)))
}
