use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use mentorhub_core::PersistentAggregate;

use crate::repository::{Repository, RepositoryError, StorageId, StoredEvent, prepare_save};

struct Row<S> {
    version: u64,
    snapshot: S,
    events: Vec<StoredEvent>,
}

/// In-memory repository.
///
/// Intended for tests/dev. A save runs its version check and both writes
/// under one write lock, so it is atomic.
pub struct InMemoryRepository<A: PersistentAggregate> {
    rows: RwLock<HashMap<Uuid, Row<A::Snapshot>>>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: PersistentAggregate> InMemoryRepository<A> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            _aggregate: PhantomData,
        }
    }

    /// Number of stored aggregates.
    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(self.rows.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.len()? == 0)
    }
}

impl<A: PersistentAggregate> Default for InMemoryRepository<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl<A> Repository<A> for InMemoryRepository<A>
where
    A: PersistentAggregate,
    A::Id: StorageId,
{
    async fn find_by_id(&self, id: A::Id) -> Result<A, RepositoryError> {
        let key: Uuid = id.into();
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let row = rows
            .get(&key)
            .ok_or_else(|| RepositoryError::not_found::<A>(id))?;
        Ok(A::restore(row.snapshot.clone()))
    }

    async fn save(&self, aggregate: &mut A) -> Result<(), RepositoryError> {
        let Some(pending) = prepare_save(aggregate)? else {
            return Ok(());
        };

        {
            let mut rows = self.rows.write().map_err(|_| poisoned())?;
            let current = rows.get(&pending.aggregate_id).map(|r| r.version).unwrap_or(0);
            pending.expected.check(current)?;

            let row = rows.entry(pending.aggregate_id).or_insert_with(|| Row {
                version: 0,
                snapshot: pending.snapshot.clone(),
                events: Vec::new(),
            });
            row.version = pending.version;
            row.snapshot = pending.snapshot;
            row.events.extend(pending.events);
        }

        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %pending.aggregate_id,
            version = pending.version,
            "aggregate saved"
        );
        aggregate.mark_persisted();
        Ok(())
    }

    async fn history(&self, id: A::Id) -> Result<Vec<StoredEvent>, RepositoryError> {
        let key: Uuid = id.into();
        let rows = self.rows.read().map_err(|_| poisoned())?;
        rows.get(&key)
            .map(|row| row.events.clone())
            .ok_or_else(|| RepositoryError::not_found::<A>(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mentorhub_core::{AggregateRoot, ChapterId, StudentId, UserId};
    use mentorhub_mentoring::{Mentor, Student};

    fn new_mentor() -> Mentor {
        Mentor::register(UserId::new(), ChapterId::new(), "Sam Park", "sam@example.org", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let repo = InMemoryRepository::<Mentor>::new();
        let err = repo.find_by_id(UserId::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { aggregate: "mentoring.mentor", .. }));
    }

    #[tokio::test]
    async fn save_then_load_round_trips_and_clears_pending() {
        let repo = InMemoryRepository::<Mentor>::new();
        let mut mentor = new_mentor();
        let id = mentor.id();

        repo.save(&mut mentor).await.unwrap();
        assert!(mentor.pending_changes().is_empty());

        let loaded = repo.find_by_id(id).await.unwrap();
        assert_eq!(loaded.snapshot(), mentor.snapshot());
        assert_eq!(AggregateRoot::version(&loaded), 1);
    }

    #[tokio::test]
    async fn archive_and_unarchive_are_kept_in_history() {
        let repo = InMemoryRepository::<Mentor>::new();
        let mut mentor = new_mentor();
        let id = mentor.id();
        repo.save(&mut mentor).await.unwrap();

        let mut loaded = repo.find_by_id(id).await.unwrap();
        loaded.archive("relocated", Utc::now()).unwrap();
        loaded.unarchive(Utc::now()).unwrap();
        repo.save(&mut loaded).await.unwrap();

        let history = repo.history(id).await.unwrap();
        let types: Vec<_> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "mentoring.mentor.registered",
                "mentoring.mentor.archived",
                "mentoring.mentor.unarchived",
            ]
        );
        let sequence: Vec<_> = history.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequence, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stale_save_conflicts_and_stores_nothing() {
        let repo = InMemoryRepository::<Mentor>::new();
        let mut mentor = new_mentor();
        let id = mentor.id();
        repo.save(&mut mentor).await.unwrap();

        let mut first = repo.find_by_id(id).await.unwrap();
        let mut second = repo.find_by_id(id).await.unwrap();

        first.archive("first writer", Utc::now()).unwrap();
        repo.save(&mut first).await.unwrap();

        second.archive("second writer", Utc::now()).unwrap();
        let err = repo.save(&mut second).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(second.pending_changes().len(), 1);

        let stored = repo.find_by_id(id).await.unwrap();
        assert_eq!(stored.lifecycle().archive_reason(), Some("first writer"));
        assert_eq!(repo.history(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn registering_an_existing_id_conflicts() {
        let repo = InMemoryRepository::<Student>::new();
        let id = StudentId::new();
        let chapter = ChapterId::new();

        let mut first = Student::register(id, chapter, "Ari", Utc::now()).unwrap();
        repo.save(&mut first).await.unwrap();

        let mut duplicate = Student::register(id, chapter, "Ari again", Utc::now()).unwrap();
        assert!(matches!(repo.save(&mut duplicate).await, Err(RepositoryError::Conflict(_))));
        assert_eq!(repo.find_by_id(id).await.unwrap().full_name(), "Ari");
    }

    #[tokio::test]
    async fn saving_without_changes_is_a_no_op() {
        let repo = InMemoryRepository::<Mentor>::new();
        let mut mentor = new_mentor();
        repo.save(&mut mentor).await.unwrap();

        let mut loaded = repo.find_by_id(mentor.id()).await.unwrap();
        repo.save(&mut loaded).await.unwrap();
        assert_eq!(repo.history(mentor.id()).await.unwrap().len(), 1);
        assert_eq!(repo.len().unwrap(), 1);
    }

    #[test]
    fn poisoned_store_reports_storage_error() {
        let repo = InMemoryRepository::<Mentor>::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = repo.rows.write().unwrap();
            panic!("writer died");
        }));

        assert!(matches!(repo.len(), Err(RepositoryError::Storage(_))));
        assert!(matches!(repo.is_empty(), Err(RepositoryError::Storage(_))));
    }
}
