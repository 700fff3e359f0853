//! Mentoring domain: mentors and students.
//!
//! Aggregates are pure (no IO). Every state change goes through a domain
//! method and is kept as a pending change until a repository saves it.

pub mod archival;
pub mod mentor;
pub mod student;

pub use archival::Lifecycle;
pub use mentor::{Clearance, Mentor, MentorCommand, MentorEvent, MentorSnapshot};
pub use student::{Student, StudentCommand, StudentEvent, StudentSnapshot};
