//! Infrastructure layer: aggregate repositories (in-memory and Postgres).

pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use in_memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use repository::{Repository, RepositoryError, StorageId, StoredEvent};
