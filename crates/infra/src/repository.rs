//! Per-aggregate persistence port.
//!
//! A repository stores one snapshot row per aggregate plus the aggregate's
//! change events (the audit trail). Saving writes both in one atomic unit,
//! guarded by an optimistic version check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use mentorhub_core::{AggregateRoot, DomainError, Event, ExpectedVersion, PersistentAggregate};

/// Identifier types a repository can key rows by.
pub trait StorageId: Copy + core::fmt::Display + Into<Uuid> + Send + Sync + 'static {}

impl<T> StorageId for T where T: Copy + core::fmt::Display + Into<Uuid> + Send + Sync + 'static {}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{aggregate} {id} not found")]
    NotFound { aggregate: &'static str, id: String },

    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("serialization failure: {0}")]
    Serialization(String),

    #[error(transparent)]
    Domain(DomainError),
}

impl RepositoryError {
    pub(crate) fn not_found<A: PersistentAggregate>(id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            aggregate: A::AGGREGATE_TYPE,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for RepositoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Domain(other),
        }
    }
}

/// A change event as recorded in an aggregate's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,

    /// Aggregate version reached by applying this event (1-based).
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

/// Everything `save` writes, prepared before touching storage.
pub(crate) struct PendingSave<S> {
    pub aggregate_id: Uuid,
    pub expected: ExpectedVersion,
    pub version: u64,
    pub snapshot: S,
    pub events: Vec<StoredEvent>,
}

/// Serialize the aggregate's state and pending changes.
///
/// Returns `None` when there is nothing to save.
pub(crate) fn prepare_save<A>(aggregate: &A) -> Result<Option<PendingSave<A::Snapshot>>, RepositoryError>
where
    A: PersistentAggregate,
    A::Id: StorageId,
{
    let changes = aggregate.pending_changes();
    if changes.is_empty() {
        return Ok(None);
    }

    let aggregate_id: Uuid = (*aggregate.id()).into();
    let base = aggregate.persisted_version();

    let mut events = Vec::with_capacity(changes.len());
    for (offset, change) in changes.iter().enumerate() {
        let payload = serde_json::to_value(change).map_err(|e| {
            RepositoryError::Serialization(format!("{} payload: {e}", change.event_type()))
        })?;
        events.push(StoredEvent {
            event_id: Uuid::now_v7(),
            aggregate_type: A::AGGREGATE_TYPE.to_string(),
            aggregate_id,
            sequence_number: base + offset as u64 + 1,
            event_type: change.event_type().to_string(),
            event_version: change.version(),
            occurred_at: change.occurred_at(),
            payload,
        });
    }

    Ok(Some(PendingSave {
        aggregate_id,
        expected: ExpectedVersion::Exact(base),
        version: aggregate.version(),
        snapshot: aggregate.snapshot(),
        events,
    }))
}

/// Async gateway for one aggregate type.
#[async_trait]
pub trait Repository<A>: Send + Sync
where
    A: PersistentAggregate,
    A::Id: StorageId,
{
    /// Load an aggregate. Unknown ids are `RepositoryError::NotFound`.
    async fn find_by_id(&self, id: A::Id) -> Result<A, RepositoryError>;

    /// Persist the snapshot and pending changes atomically.
    ///
    /// On success pending changes are cleared. On failure nothing is stored
    /// and the aggregate keeps its pending changes. No pending changes is a no-op.
    async fn save(&self, aggregate: &mut A) -> Result<(), RepositoryError>;

    /// Stored change events of an aggregate, in sequence order.
    async fn history(&self, id: A::Id) -> Result<Vec<StoredEvent>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_conflicts_become_repository_conflicts() {
        let err: RepositoryError = ExpectedVersion::Exact(1).check(2).unwrap_err().into();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err: RepositoryError = DomainError::validation("bad").into();
        assert!(matches!(err, RepositoryError::Domain(DomainError::Validation(_))));
    }
}
