//! Request/response DTOs and mapping from domain types.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use mentorhub_core::{AggregateRoot, ChapterId, StudentId, UserId};
use mentorhub_mentoring::{Clearance, Lifecycle, Mentor, Student};

use crate::app::errors::ApiError;

/// Unwrap a JSON body, reporting malformed input as 400.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct RegisterMentorRequest {
    /// Directory object id of the mentor's user account.
    pub user_id: UserId,
    pub chapter_id: ChapterId,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterStudentRequest {
    pub chapter_id: ChapterId,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordCheckRequest {
    pub reference: String,
    pub expires_on: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl From<&Lifecycle> for LifecycleResponse {
    fn from(lifecycle: &Lifecycle) -> Self {
        Self {
            archived: lifecycle.is_archived(),
            reason: lifecycle.archive_reason().map(str::to_string),
            archived_at: lifecycle.archived_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClearancesResponse {
    pub police_check: Option<Clearance>,
    pub wwc_check: Option<Clearance>,
    /// Both clearances on file and current today.
    pub cleared: bool,
}

#[derive(Debug, Serialize)]
pub struct MentorResponse {
    pub id: UserId,
    pub chapter_id: ChapterId,
    pub full_name: String,
    pub email: String,
    pub lifecycle: LifecycleResponse,
    /// Absent when the caller may not view the mentor's checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clearances: Option<ClearancesResponse>,
    pub version: u64,
}

impl MentorResponse {
    pub fn new(mentor: &Mentor, show_clearances: bool) -> Self {
        let clearances = show_clearances.then(|| ClearancesResponse {
            police_check: mentor.police_check().cloned(),
            wwc_check: mentor.wwc_check().cloned(),
            cleared: mentor.is_cleared_on(Utc::now().date_naive()),
        });

        Self {
            id: mentor.id(),
            chapter_id: mentor.chapter_id(),
            full_name: mentor.full_name().to_string(),
            email: mentor.email().to_string(),
            lifecycle: mentor.lifecycle().into(),
            clearances,
            version: AggregateRoot::version(mentor),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentResponse {
    pub id: StudentId,
    pub chapter_id: ChapterId,
    pub full_name: String,
    pub lifecycle: LifecycleResponse,
    pub version: u64,
}

impl From<&Student> for StudentResponse {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id(),
            chapter_id: student.chapter_id(),
            full_name: student.full_name().to_string(),
            lifecycle: student.lifecycle().into(),
            version: AggregateRoot::version(student),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub action: Option<String>,
    pub area: Option<String>,
}
