//! `mentorhub-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion, PersistentAggregate, execute};
pub use entity::{Entity, same_identity};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{ChapterId, StudentId, UserId};
