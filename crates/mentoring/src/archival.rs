use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mentorhub_core::{DomainError, DomainResult};

/// Archival state shared by mentors and students.
///
/// Reason and timestamp only exist together, inside `Archived`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Archived {
        reason: String,
        archived_at: DateTime<Utc>,
    },
}

impl Lifecycle {
    pub fn is_archived(&self) -> bool {
        matches!(self, Lifecycle::Archived { .. })
    }

    pub fn archive_reason(&self) -> Option<&str> {
        match self {
            Lifecycle::Active => None,
            Lifecycle::Archived { reason, .. } => Some(reason),
        }
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Active => None,
            Lifecycle::Archived { archived_at, .. } => Some(*archived_at),
        }
    }

    /// Decide an archive transition. Returns the normalized reason.
    pub(crate) fn decide_archive(&self, subject: &str, reason: &str) -> DomainResult<String> {
        if self.is_archived() {
            return Err(DomainError::rule_violation(format!("{subject} is already archived")));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("archive reason cannot be empty"));
        }
        Ok(reason.to_string())
    }

    pub(crate) fn decide_unarchive(&self, subject: &str) -> DomainResult<()> {
        if !self.is_archived() {
            return Err(DomainError::rule_violation(format!("{subject} is not archived")));
        }
        Ok(())
    }

    pub(crate) fn ensure_active(&self, subject: &str) -> DomainResult<()> {
        if self.is_archived() {
            return Err(DomainError::rule_violation(format!("{subject} is archived")));
        }
        Ok(())
    }
}

/// Event payload: the record was archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archived {
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event payload: the record was restored to active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unarchived {
    pub occurred_at: DateTime<Utc>,
}

impl Archived {
    pub(crate) fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Archived {
            reason: self.reason.clone(),
            archived_at: self.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_decision_checks_state_then_reason() {
        let active = Lifecycle::Active;
        assert_eq!(active.decide_archive("mentor", "  moved away "), Ok("moved away".to_string()));
        assert!(matches!(active.decide_archive("mentor", "   "), Err(DomainError::Validation(_))));

        let archived = Lifecycle::Archived {
            reason: "moved away".to_string(),
            archived_at: Utc::now(),
        };
        assert!(matches!(
            archived.decide_archive("mentor", ""),
            Err(DomainError::RuleViolation(_))
        ));
    }

    #[test]
    fn unarchive_requires_archived_state() {
        assert!(Lifecycle::Active.decide_unarchive("student").unwrap_err().is_rule_violation());
        let archived = Lifecycle::Archived {
            reason: "graduated".to_string(),
            archived_at: Utc::now(),
        };
        assert_eq!(archived.decide_unarchive("student"), Ok(()));
        assert_eq!(archived.archive_reason(), Some("graduated"));
    }

    #[test]
    fn lifecycle_serializes_with_status_tag() {
        let json = serde_json::to_value(Lifecycle::Active).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "active" }));
    }
}
