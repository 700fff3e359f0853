use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mentorhub_core::{
    Aggregate, AggregateRoot, ChapterId, DomainError, DomainResult, Entity, Event,
    PersistentAggregate, StudentId, execute,
};

use crate::archival::{Archived, Lifecycle, Unarchived};

/// Aggregate root: a student enrolled with a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    id: StudentId,
    chapter_id: ChapterId,
    full_name: String,
    lifecycle: Lifecycle,
    version: u64,
    pending: Vec<StudentEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentCommand {
    Archive { reason: String, at: DateTime<Utc> },
    Unarchive { at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRegistered {
    pub student_id: StudentId,
    pub chapter_id: ChapterId,
    pub full_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudentEvent {
    Registered(StudentRegistered),
    Archived(Archived),
    Unarchived(Unarchived),
}

impl Event for StudentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StudentEvent::Registered(_) => "mentoring.student.registered",
            StudentEvent::Archived(_) => "mentoring.student.archived",
            StudentEvent::Unarchived(_) => "mentoring.student.unarchived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StudentEvent::Registered(e) => e.occurred_at,
            StudentEvent::Archived(e) => e.occurred_at,
            StudentEvent::Unarchived(e) => e.occurred_at,
        }
    }
}

impl Student {
    pub fn register(
        id: StudentId,
        chapter_id: ChapterId,
        full_name: impl Into<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let full_name = full_name.into().trim().to_string();
        if full_name.is_empty() {
            return Err(DomainError::validation("full name cannot be empty"));
        }

        let registered = StudentEvent::Registered(StudentRegistered {
            student_id: id,
            chapter_id,
            full_name,
            occurred_at: at,
        });

        let mut student = Self {
            id,
            chapter_id,
            full_name: String::new(),
            lifecycle: Lifecycle::Active,
            version: 0,
            pending: Vec::new(),
        };
        student.apply(&registered);
        student.pending.push(registered);
        Ok(student)
    }

    pub fn id(&self) -> StudentId {
        self.id
    }

    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn is_archived(&self) -> bool {
        self.lifecycle.is_archived()
    }

    pub fn archive(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> DomainResult<()> {
        self.run(StudentCommand::Archive { reason: reason.into(), at })
    }

    pub fn unarchive(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.run(StudentCommand::Unarchive { at })
    }

    fn run(&mut self, command: StudentCommand) -> DomainResult<()> {
        let events = execute(self, &command)?;
        self.pending.extend(events);
        Ok(())
    }
}

impl AggregateRoot for Student {
    type Id = StudentId;

    fn id(&self) -> &StudentId {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Entity for Student {
    type Id = StudentId;

    fn id(&self) -> &StudentId {
        &self.id
    }
}

impl Aggregate for Student {
    type Command = StudentCommand;
    type Event = StudentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &StudentEvent) {
        match event {
            StudentEvent::Registered(e) => {
                self.id = e.student_id;
                self.chapter_id = e.chapter_id;
                self.full_name = e.full_name.clone();
                self.lifecycle = Lifecycle::Active;
            }
            StudentEvent::Archived(e) => self.lifecycle = e.lifecycle(),
            StudentEvent::Unarchived(_) => self.lifecycle = Lifecycle::Active,
        }

        self.version += 1;
    }

    fn handle(&self, command: &StudentCommand) -> Result<Vec<StudentEvent>, DomainError> {
        let event = match command {
            StudentCommand::Archive { reason, at } => StudentEvent::Archived(Archived {
                reason: self.lifecycle.decide_archive("student", reason)?,
                occurred_at: *at,
            }),
            StudentCommand::Unarchive { at } => {
                self.lifecycle.decide_unarchive("student")?;
                StudentEvent::Unarchived(Unarchived { occurred_at: *at })
            }
        };
        Ok(vec![event])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub id: StudentId,
    pub chapter_id: ChapterId,
    pub full_name: String,
    pub lifecycle: Lifecycle,
    pub version: u64,
}

impl PersistentAggregate for Student {
    type Snapshot = StudentSnapshot;
    type Change = StudentEvent;

    const AGGREGATE_TYPE: &'static str = "mentoring.student";

    fn snapshot(&self) -> StudentSnapshot {
        StudentSnapshot {
            id: self.id,
            chapter_id: self.chapter_id,
            full_name: self.full_name.clone(),
            lifecycle: self.lifecycle.clone(),
            version: self.version,
        }
    }

    fn restore(s: StudentSnapshot) -> Self {
        Self {
            id: s.id,
            chapter_id: s.chapter_id,
            full_name: s.full_name,
            lifecycle: s.lifecycle,
            version: s.version,
            pending: Vec::new(),
        }
    }

    fn pending_changes(&self) -> &[StudentEvent] {
        &self.pending
    }

    fn mark_persisted(&mut self) {
        self.pending.clear();
    }
}
