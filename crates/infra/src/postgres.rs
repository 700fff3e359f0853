//! Postgres-backed repository.
//!
//! ## Schema
//!
//! ```sql
//! aggregates(aggregate_type, aggregate_id, version, state JSONB, updated_at)
//!     PRIMARY KEY (aggregate_type, aggregate_id)
//! aggregate_events(event_id, aggregate_type, aggregate_id, sequence_number,
//!                  event_type, event_version, occurred_at, payload JSONB, recorded_at)
//!     UNIQUE (aggregate_type, aggregate_id, sequence_number)
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` (concurrent insert of the same aggregate) |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / network / other | N/A | `Storage` |

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use mentorhub_core::{AggregateRoot, PersistentAggregate};

use crate::repository::{Repository, RepositoryError, StorageId, StoredEvent, prepare_save};

const CREATE_AGGREGATES: &str = r#"
CREATE TABLE IF NOT EXISTS aggregates (
    aggregate_type TEXT NOT NULL,
    aggregate_id UUID NOT NULL,
    version BIGINT NOT NULL CHECK (version > 0),
    state JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (aggregate_type, aggregate_id)
)
"#;

const CREATE_AGGREGATE_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS aggregate_events (
    event_id UUID PRIMARY KEY,
    aggregate_type TEXT NOT NULL,
    aggregate_id UUID NOT NULL,
    sequence_number BIGINT NOT NULL CHECK (sequence_number > 0),
    event_type TEXT NOT NULL,
    event_version INT NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL,
    payload JSONB NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (aggregate_type, aggregate_id, sequence_number)
)
"#;

/// Open a connection pool.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, RepositoryError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Create the repository tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), RepositoryError> {
    for statement in [CREATE_AGGREGATES, CREATE_AGGREGATE_EVENTS] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}

/// Postgres repository for one aggregate type.
///
/// `save` runs in a single transaction: the aggregate row is locked with
/// `SELECT ... FOR UPDATE`, its version compared with the expected one, then
/// the snapshot is upserted and the change events inserted. Two concurrent
/// first saves of the same id collide on the primary key and surface as
/// `Conflict`.
pub struct PostgresRepository<A> {
    pool: PgPool,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: PersistentAggregate> PostgresRepository<A> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _aggregate: PhantomData,
        }
    }
}

async fn locked_version(
    tx: &mut Transaction<'_, Postgres>,
    aggregate_type: &str,
    aggregate_id: Uuid,
) -> Result<u64, RepositoryError> {
    let version: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT version
        FROM aggregates
        WHERE aggregate_type = $1 AND aggregate_id = $2
        FOR UPDATE
        "#,
    )
    .bind(aggregate_type)
    .bind(aggregate_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_aggregate", e))?;

    Ok(version.unwrap_or(0) as u64)
}

#[async_trait]
impl<A> Repository<A> for PostgresRepository<A>
where
    A: PersistentAggregate,
    A::Id: StorageId,
{
    #[instrument(skip_all, fields(aggregate_type = A::AGGREGATE_TYPE, aggregate_id = %id), err)]
    async fn find_by_id(&self, id: A::Id) -> Result<A, RepositoryError> {
        let key: Uuid = id.into();
        let state: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT state
            FROM aggregates
            WHERE aggregate_type = $1 AND aggregate_id = $2
            "#,
        )
        .bind(A::AGGREGATE_TYPE)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_id", e))?;

        let state = state.ok_or_else(|| RepositoryError::not_found::<A>(id))?;
        let snapshot: A::Snapshot = serde_json::from_value(state)
            .map_err(|e| RepositoryError::Serialization(format!("{} snapshot: {e}", A::AGGREGATE_TYPE)))?;

        Ok(A::restore(snapshot))
    }

    #[instrument(
        skip_all,
        fields(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate.id(),
            pending = aggregate.pending_changes().len()
        ),
        err
    )]
    async fn save(&self, aggregate: &mut A) -> Result<(), RepositoryError> {
        let Some(pending) = prepare_save(aggregate)? else {
            return Ok(());
        };
        let state = serde_json::to_value(&pending.snapshot)
            .map_err(|e| RepositoryError::Serialization(format!("{} snapshot: {e}", A::AGGREGATE_TYPE)))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current = locked_version(&mut tx, A::AGGREGATE_TYPE, pending.aggregate_id).await?;
        if let Err(err) = pending.expected.check(current) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(err.into());
        }

        let upsert = if current == 0 {
            sqlx::query(
                r#"
                INSERT INTO aggregates (aggregate_type, aggregate_id, version, state, updated_at)
                VALUES ($1, $2, $3, $4, now())
                "#,
            )
        } else {
            sqlx::query(
                r#"
                UPDATE aggregates
                SET version = $3, state = $4, updated_at = now()
                WHERE aggregate_type = $1 AND aggregate_id = $2
                "#,
            )
        };
        upsert
            .bind(A::AGGREGATE_TYPE)
            .bind(pending.aggregate_id)
            .bind(pending.version as i64)
            .bind(&state)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("write_aggregate", e))?;

        for event in &pending.events {
            sqlx::query(
                r#"
                INSERT INTO aggregate_events (
                    event_id,
                    aggregate_type,
                    aggregate_id,
                    sequence_number,
                    event_type,
                    event_version,
                    occurred_at,
                    payload
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id)
            .bind(&event.aggregate_type)
            .bind(event.aggregate_id)
            .bind(event.sequence_number as i64)
            .bind(&event.event_type)
            .bind(event.event_version as i32)
            .bind(event.occurred_at)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_event", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        aggregate.mark_persisted();
        Ok(())
    }

    #[instrument(skip_all, fields(aggregate_type = A::AGGREGATE_TYPE, aggregate_id = %id), err)]
    async fn history(&self, id: A::Id) -> Result<Vec<StoredEvent>, RepositoryError> {
        let key: Uuid = id.into();
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM aggregates WHERE aggregate_type = $1 AND aggregate_id = $2
            )
            "#,
        )
        .bind(A::AGGREGATE_TYPE)
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("history_exists", e))?;

        if !exists {
            return Err(RepositoryError::not_found::<A>(id));
        }

        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                aggregate_type,
                aggregate_id,
                sequence_number,
                event_type,
                event_version,
                occurred_at,
                payload
            FROM aggregate_events
            WHERE aggregate_type = $1 AND aggregate_id = $2
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(A::AGGREGATE_TYPE)
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("history", e))?;

        rows.iter()
            .map(|row| stored_event_from_row(row).map_err(|e| map_sqlx_error("decode_event", e)))
            .collect()
    }
}

fn stored_event_from_row(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    let sequence_number: i64 = row.try_get("sequence_number")?;
    let event_version: i32 = row.try_get("event_version")?;
    let occurred_at: DateTime<Utc> = row.try_get("occurred_at")?;

    Ok(StoredEvent {
        event_id: row.try_get("event_id")?,
        aggregate_type: row.try_get("aggregate_type")?,
        aggregate_id: row.try_get("aggregate_id")?,
        sequence_number: sequence_number as u64,
        event_type: row.try_get("event_type")?,
        event_version: event_version as u32,
        occurred_at,
        payload: row.try_get("payload")?,
    })
}

/// Map SQLx errors to RepositoryError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Conflict(msg),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
