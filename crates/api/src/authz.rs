//! Typed authorization records for loaded aggregates.
//!
//! Domain aggregates stay auth-agnostic; the API layer projects them into the
//! record shapes ability conditions are evaluated against.

use mentorhub_auth::record::{CheckRecord, StudentRecord, UserRecord};
use mentorhub_auth::Record;
use mentorhub_core::{ChapterId, StudentId, UserId};
use mentorhub_mentoring::{Mentor, Student};

/// The mentor's profile, as a `UserArea` record.
pub fn mentor_record(mentor: &Mentor) -> Record {
    Record::User(UserRecord {
        user_id: mentor.id(),
        chapter_id: Some(mentor.chapter_id()),
    })
}

/// The mentor's clearances, as a `CheckArea` record.
pub fn check_record(mentor: &Mentor) -> Record {
    Record::Check(CheckRecord {
        user_id: mentor.id(),
        chapter_id: Some(mentor.chapter_id()),
    })
}

/// A mentor that is about to be registered.
pub fn prospective_mentor_record(user_id: UserId, chapter_id: ChapterId) -> Record {
    Record::User(UserRecord {
        user_id,
        chapter_id: Some(chapter_id),
    })
}

pub fn student_record(student: &Student) -> Record {
    Record::Student(StudentRecord {
        student_id: student.id(),
        chapter_id: Some(student.chapter_id()),
    })
}

pub fn prospective_student_record(student_id: StudentId, chapter_id: ChapterId) -> Record {
    Record::Student(StudentRecord {
        student_id,
        chapter_id: Some(chapter_id),
    })
}
