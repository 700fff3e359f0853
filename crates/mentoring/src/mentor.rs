use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use mentorhub_core::{
    Aggregate, AggregateRoot, ChapterId, DomainError, DomainResult, Entity, Event,
    PersistentAggregate, UserId, execute,
};

use crate::archival::{Archived, Lifecycle, Unarchived};

/// A police or working-with-children clearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clearance {
    pub reference: String,
    /// Last day on which the clearance is valid.
    pub expires_on: NaiveDate,
}

impl Clearance {
    pub fn new(reference: impl Into<String>, expires_on: NaiveDate) -> DomainResult<Self> {
        let reference = reference.into().trim().to_string();
        if reference.is_empty() {
            return Err(DomainError::validation("clearance reference cannot be empty"));
        }
        Ok(Self { reference, expires_on })
    }

    pub fn is_current(&self, on: NaiveDate) -> bool {
        on <= self.expires_on
    }
}

/// Aggregate root: a volunteer mentor.
///
/// The mentor id is the user's directory object id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mentor {
    id: UserId,
    chapter_id: ChapterId,
    full_name: String,
    email: String,
    lifecycle: Lifecycle,
    police_check: Option<Clearance>,
    wwc_check: Option<Clearance>,
    version: u64,
    pending: Vec<MentorEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentorCommand {
    Archive { reason: String, at: DateTime<Utc> },
    Unarchive { at: DateTime<Utc> },
    RecordPoliceCheck { clearance: Clearance, at: DateTime<Utc> },
    RecordWwcCheck { clearance: Clearance, at: DateTime<Utc> },
}

/// Event: MentorRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorRegistered {
    pub mentor_id: UserId,
    pub chapter_id: ChapterId,
    pub full_name: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a clearance was recorded (police or WWC, per variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecorded {
    pub clearance: Clearance,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MentorEvent {
    Registered(MentorRegistered),
    Archived(Archived),
    Unarchived(Unarchived),
    PoliceCheckRecorded(CheckRecorded),
    WwcCheckRecorded(CheckRecorded),
}

impl MentorEvent {
    const POLICE_CHECK_RECORDED: &'static str = "mentoring.mentor.police_check_recorded";
    const WWC_CHECK_RECORDED: &'static str = "mentoring.mentor.wwc_check_recorded";

    /// Whether a stored event of this type carries clearance details.
    pub fn reveals_clearance(event_type: &str) -> bool {
        event_type == Self::POLICE_CHECK_RECORDED || event_type == Self::WWC_CHECK_RECORDED
    }
}

impl Event for MentorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MentorEvent::Registered(_) => "mentoring.mentor.registered",
            MentorEvent::Archived(_) => "mentoring.mentor.archived",
            MentorEvent::Unarchived(_) => "mentoring.mentor.unarchived",
            MentorEvent::PoliceCheckRecorded(_) => Self::POLICE_CHECK_RECORDED,
            MentorEvent::WwcCheckRecorded(_) => Self::WWC_CHECK_RECORDED,
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MentorEvent::Registered(e) => e.occurred_at,
            MentorEvent::Archived(e) => e.occurred_at,
            MentorEvent::Unarchived(e) => e.occurred_at,
            MentorEvent::PoliceCheckRecorded(e) => e.occurred_at,
            MentorEvent::WwcCheckRecorded(e) => e.occurred_at,
        }
    }
}

impl Mentor {
    /// Register a new mentor. The registration is the first pending change.
    pub fn register(
        id: UserId,
        chapter_id: ChapterId,
        full_name: impl Into<String>,
        email: impl Into<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let full_name = full_name.into().trim().to_string();
        if full_name.is_empty() {
            return Err(DomainError::validation("full name cannot be empty"));
        }
        let email = email.into().trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(DomainError::validation(format!("'{email}' is not a valid email address")));
        }

        let registered = MentorEvent::Registered(MentorRegistered {
            mentor_id: id,
            chapter_id,
            full_name,
            email,
            occurred_at: at,
        });

        let mut mentor = Self {
            id,
            chapter_id,
            full_name: String::new(),
            email: String::new(),
            lifecycle: Lifecycle::Active,
            police_check: None,
            wwc_check: None,
            version: 0,
            pending: Vec::new(),
        };
        mentor.apply(&registered);
        mentor.pending.push(registered);
        Ok(mentor)
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn is_archived(&self) -> bool {
        self.lifecycle.is_archived()
    }

    pub fn police_check(&self) -> Option<&Clearance> {
        self.police_check.as_ref()
    }

    pub fn wwc_check(&self) -> Option<&Clearance> {
        self.wwc_check.as_ref()
    }

    /// Both clearances are on file and valid on `on`.
    pub fn is_cleared_on(&self, on: NaiveDate) -> bool {
        let current = |c: &Option<Clearance>| c.as_ref().is_some_and(|c| c.is_current(on));
        current(&self.police_check) && current(&self.wwc_check)
    }

    pub fn archive(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> DomainResult<()> {
        self.run(MentorCommand::Archive { reason: reason.into(), at })
    }

    pub fn unarchive(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.run(MentorCommand::Unarchive { at })
    }

    pub fn record_police_check(&mut self, clearance: Clearance, at: DateTime<Utc>) -> DomainResult<()> {
        self.run(MentorCommand::RecordPoliceCheck { clearance, at })
    }

    pub fn record_wwc_check(&mut self, clearance: Clearance, at: DateTime<Utc>) -> DomainResult<()> {
        self.run(MentorCommand::RecordWwcCheck { clearance, at })
    }

    fn run(&mut self, command: MentorCommand) -> DomainResult<()> {
        let events = execute(self, &command)?;
        self.pending.extend(events);
        Ok(())
    }

    fn decide_check(&self, clearance: &Clearance, at: DateTime<Utc>) -> DomainResult<CheckRecorded> {
        self.lifecycle.ensure_active("mentor")?;
        if !clearance.is_current(at.date_naive()) {
            return Err(DomainError::validation(format!(
                "clearance {} expired on {}",
                clearance.reference, clearance.expires_on
            )));
        }
        Ok(CheckRecorded {
            clearance: clearance.clone(),
            occurred_at: at,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

impl AggregateRoot for Mentor {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Entity for Mentor {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

impl Aggregate for Mentor {
    type Command = MentorCommand;
    type Event = MentorEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &MentorEvent) {
        match event {
            MentorEvent::Registered(e) => {
                self.id = e.mentor_id;
                self.chapter_id = e.chapter_id;
                self.full_name = e.full_name.clone();
                self.email = e.email.clone();
                self.lifecycle = Lifecycle::Active;
            }
            MentorEvent::Archived(e) => self.lifecycle = e.lifecycle(),
            MentorEvent::Unarchived(_) => self.lifecycle = Lifecycle::Active,
            MentorEvent::PoliceCheckRecorded(e) => self.police_check = Some(e.clearance.clone()),
            MentorEvent::WwcCheckRecorded(e) => self.wwc_check = Some(e.clearance.clone()),
        }

        self.version += 1;
    }

    fn handle(&self, command: &MentorCommand) -> Result<Vec<MentorEvent>, DomainError> {
        let event = match command {
            MentorCommand::Archive { reason, at } => MentorEvent::Archived(Archived {
                reason: self.lifecycle.decide_archive("mentor", reason)?,
                occurred_at: *at,
            }),
            MentorCommand::Unarchive { at } => {
                self.lifecycle.decide_unarchive("mentor")?;
                MentorEvent::Unarchived(Unarchived { occurred_at: *at })
            }
            MentorCommand::RecordPoliceCheck { clearance, at } => {
                MentorEvent::PoliceCheckRecorded(self.decide_check(clearance, *at)?)
            }
            MentorCommand::RecordWwcCheck { clearance, at } => {
                MentorEvent::WwcCheckRecorded(self.decide_check(clearance, *at)?)
            }
        };
        Ok(vec![event])
    }
}

/// Stored form of a [`Mentor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorSnapshot {
    pub id: UserId,
    pub chapter_id: ChapterId,
    pub full_name: String,
    pub email: String,
    pub lifecycle: Lifecycle,
    pub police_check: Option<Clearance>,
    pub wwc_check: Option<Clearance>,
    pub version: u64,
}

impl PersistentAggregate for Mentor {
    type Snapshot = MentorSnapshot;
    type Change = MentorEvent;

    const AGGREGATE_TYPE: &'static str = "mentoring.mentor";

    fn snapshot(&self) -> MentorSnapshot {
        MentorSnapshot {
            id: self.id,
            chapter_id: self.chapter_id,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            lifecycle: self.lifecycle.clone(),
            police_check: self.police_check.clone(),
            wwc_check: self.wwc_check.clone(),
            version: self.version,
        }
    }

    fn restore(s: MentorSnapshot) -> Self {
        Self {
            id: s.id,
            chapter_id: s.chapter_id,
            full_name: s.full_name,
            email: s.email,
            lifecycle: s.lifecycle,
            police_check: s.police_check,
            wwc_check: s.wwc_check,
            version: s.version,
            pending: Vec::new(),
        }
    }

    fn pending_changes(&self) -> &[MentorEvent] {
        &self.pending
    }

    fn mark_persisted(&mut self) {
        self.pending.clear();
    }
}
