//! Aggregate root traits for domain models persisted as current state plus a
//! change log.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DomainError, DomainResult};
use crate::event::Event;

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented once per applied event, including events not yet persisted.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for migrations and fixtures).
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO or side effects.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations bump `version()` by one per applied event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}

/// Decide and evolve in one step: run `handle`, then `apply` every resulting event.
///
/// If `handle` rejects the command the aggregate is left untouched.
pub fn execute<A: Aggregate>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Event>, A::Error> {
    let events = aggregate.handle(command)?;
    for event in &events {
        aggregate.apply(event);
    }
    Ok(events)
}

/// An aggregate that a repository can store as a snapshot of its current state
/// together with the changes recorded since it was loaded.
pub trait PersistentAggregate: AggregateRoot + Send + Sync + 'static {
    /// Persisted representation of the current state (one row per aggregate).
    type Snapshot: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Change events appended to the aggregate's audit trail on save.
    type Change: Event + Serialize;

    /// Stable aggregate type name used as a storage discriminator.
    const AGGREGATE_TYPE: &'static str;

    /// Capture the current state (including `version()`).
    fn snapshot(&self) -> Self::Snapshot;

    /// Rehydrate an aggregate from its stored snapshot; it has no pending changes.
    fn restore(snapshot: Self::Snapshot) -> Self;

    /// Changes applied since the aggregate was loaded or last saved.
    fn pending_changes(&self) -> &[Self::Change];

    /// Forget pending changes after the repository committed them.
    fn mark_persisted(&mut self);

    /// The version currently held by storage (the version this aggregate was loaded at).
    fn persisted_version(&self) -> u64 {
        self.version() - self.pending_changes().len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Counter {
        id: u8,
        value: u32,
        version: u64,
    }

    impl AggregateRoot for Counter {
        type Id = u8;

        fn id(&self) -> &u8 {
            &self.id
        }

        fn version(&self) -> u64 {
            self.version
        }
    }

    impl Aggregate for Counter {
        type Command = u32;
        type Event = u32;
        type Error = DomainError;

        fn apply(&mut self, event: &u32) {
            self.value += event;
            self.version += 1;
        }

        fn handle(&self, command: &u32) -> Result<Vec<u32>, DomainError> {
            if *command == 0 {
                return Err(DomainError::validation("increment must be positive"));
            }
            Ok(vec![*command])
        }
    }

    #[test]
    fn execute_applies_emitted_events() {
        let mut counter = Counter { id: 1, value: 0, version: 0 };
        let events = execute(&mut counter, &5).unwrap();

        assert_eq!(events, vec![5]);
        assert_eq!(counter.value, 5);
        assert_eq!(counter.version(), 1);
    }

    #[test]
    fn execute_leaves_state_untouched_on_rejection() {
        let mut counter = Counter { id: 1, value: 3, version: 2 };
        let before = counter.clone();

        assert!(execute(&mut counter, &0).is_err());
        assert_eq!(counter, before);
    }

    #[test]
    fn expected_version_check_reports_conflict() {
        assert!(ExpectedVersion::Any.check(9).is_ok());
        assert!(ExpectedVersion::Exact(2).check(2).is_ok());
        assert!(matches!(
            ExpectedVersion::Exact(2).check(3),
            Err(DomainError::Conflict(_))
        ));
    }
}
