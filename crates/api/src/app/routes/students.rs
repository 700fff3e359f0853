use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use mentorhub_auth::{Action, ResourceArea};
use mentorhub_core::StudentId;
use mentorhub_infra::StoredEvent;
use mentorhub_mentoring::Student;

use crate::app::AppState;
use crate::app::dto::{self, ArchiveRequest, RegisterStudentRequest, StudentResponse};
use crate::app::errors::ApiError;
use crate::authz::{prospective_student_record, student_record};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_student))
        .route("/:id", get(get_student))
        .route("/:id/history", get(student_history))
        .route("/:id/archive", post(archive_student))
        .route("/:id/unarchive", post(unarchive_student))
}

pub async fn register_student(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<RegisterStudentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    ctx.require_area(Action::Create, ResourceArea::StudentArea)?;
    let req = dto::body(payload)?;
    let id = StudentId::new();
    ctx.require(Action::Create, &prospective_student_record(id, req.chapter_id))?;

    let mut student = Student::register(id, req.chapter_id, req.full_name, Utc::now())?;
    state.students.save(&mut student).await?;

    tracing::info!(student_id = %id, by = %ctx.principal().id(), "student registered");
    Ok((StatusCode::CREATED, Json(StudentResponse::from(&student))))
}

pub async fn get_student(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = load(&state, &ctx, Action::View, &id).await?;
    Ok(Json(StudentResponse::from(&student)))
}

pub async fn student_history(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StoredEvent>>, ApiError> {
    let student = load(&state, &ctx, Action::View, &id).await?;
    Ok(Json(state.students.history(student.id()).await?))
}

pub async fn archive_student(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    payload: Result<Json<ArchiveRequest>, JsonRejection>,
) -> Result<Json<StudentResponse>, ApiError> {
    let mut student = load(&state, &ctx, Action::Archive, &id).await?;
    let req = dto::body(payload)?;

    student.archive(req.reason, Utc::now())?;
    state.students.save(&mut student).await?;

    tracing::info!(student_id = %student.id(), by = %ctx.principal().id(), "student archived");
    Ok(Json(StudentResponse::from(&student)))
}

pub async fn unarchive_student(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<StudentResponse>, ApiError> {
    let mut student = load(&state, &ctx, Action::Archive, &id).await?;

    student.unarchive(Utc::now())?;
    state.students.save(&mut student).await?;

    tracing::info!(student_id = %student.id(), by = %ctx.principal().id(), "student unarchived");
    Ok(Json(StudentResponse::from(&student)))
}

async fn load(
    state: &AppState,
    ctx: &RequestContext,
    action: Action,
    id: &str,
) -> Result<Student, ApiError> {
    let id: StudentId = id.parse()?;
    ctx.require_area(action, ResourceArea::StudentArea)?;

    let student = state.students.find_by_id(id).await?;
    ctx.require(action, &student_record(&student))?;
    Ok(student)
}
