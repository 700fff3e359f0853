//! Typed views of protected records, one per resource area.
//!
//! The route layer builds these from loaded aggregates so ability conditions
//! can be checked without inspecting arbitrary record shapes.

use serde::Serialize;

use mentorhub_core::{ChapterId, StudentId, UserId};

use crate::ability::{AbilityError, ResourceArea};

/// A mentor or staff profile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub chapter_id: Option<ChapterId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRecord {
    pub student_id: StudentId,
    pub chapter_id: Option<ChapterId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterRecord {
    pub chapter_id: ChapterId,
}

/// A mentoring session between a mentor and a student.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub mentor_id: Option<UserId>,
    pub chapter_id: Option<ChapterId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    pub author_id: Option<UserId>,
    pub chapter_id: Option<ChapterId>,
}

/// Police or working-with-children check details of a user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRecord {
    pub user_id: UserId,
    pub chapter_id: Option<ChapterId>,
}

/// A roster slot (a mentor's availability on a chapter's schedule).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct RosterRecord {
    pub mentor_id: Option<UserId>,
    pub chapter_id: Option<ChapterId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub attendee_id: Option<UserId>,
    pub chapter_id: Option<ChapterId>,
}

/// A record a scoped permission check is evaluated against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "area", content = "record")]
pub enum Record {
    User(UserRecord),
    Student(StudentRecord),
    Chapter(ChapterRecord),
    Session(SessionRecord),
    Report(ReportRecord),
    Check(CheckRecord),
    Roster(RosterRecord),
    Attendance(AttendanceRecord),
}

impl Record {
    pub fn area(&self) -> ResourceArea {
        match self {
            Record::User(_) => ResourceArea::UserArea,
            Record::Student(_) => ResourceArea::StudentArea,
            Record::Chapter(_) => ResourceArea::ChapterArea,
            Record::Session(_) => ResourceArea::SessionArea,
            Record::Report(_) => ResourceArea::ReportArea,
            Record::Check(_) => ResourceArea::CheckArea,
            Record::Roster(_) => ResourceArea::RosterArea,
            Record::Attendance(_) => ResourceArea::AttendanceArea,
        }
    }

    /// The user a record belongs to.
    pub(crate) fn owner(&self) -> Result<UserId, AbilityError> {
        let owner = match self {
            Record::User(r) => Some(r.user_id),
            Record::Check(r) => Some(r.user_id),
            Record::Session(r) => r.mentor_id,
            Record::Report(r) => r.author_id,
            Record::Roster(r) => r.mentor_id,
            Record::Attendance(r) => r.attendee_id,
            Record::Student(_) | Record::Chapter(_) => None,
        };
        owner.ok_or(AbilityError::MissingField {
            area: self.area(),
            field: "owner",
        })
    }

    pub(crate) fn chapter(&self) -> Result<ChapterId, AbilityError> {
        let chapter = match self {
            Record::User(r) => r.chapter_id,
            Record::Student(r) => r.chapter_id,
            Record::Chapter(r) => Some(r.chapter_id),
            Record::Session(r) => r.chapter_id,
            Record::Report(r) => r.chapter_id,
            Record::Check(r) => r.chapter_id,
            Record::Roster(r) => r.chapter_id,
            Record::Attendance(r) => r.chapter_id,
        };
        chapter.ok_or(AbilityError::MissingField {
            area: self.area(),
            field: "chapter",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn students_have_no_owner_field() {
        let record = Record::Student(StudentRecord {
            student_id: StudentId::new(),
            chapter_id: Some(ChapterId::new()),
        });

        assert_eq!(
            record.owner(),
            Err(AbilityError::MissingField {
                area: ResourceArea::StudentArea,
                field: "owner",
            })
        );
        assert!(record.chapter().is_ok());
    }

    #[test]
    fn unloaded_chapter_is_reported_as_missing() {
        let record = Record::Session(SessionRecord {
            mentor_id: Some(UserId::new()),
            chapter_id: None,
        });

        assert!(record.owner().is_ok());
        assert!(matches!(
            record.chapter(),
            Err(AbilityError::MissingField { field: "chapter", .. })
        ));
    }
}
