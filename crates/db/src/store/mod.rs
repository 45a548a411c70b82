//! Transactional session store consumed by the token service.
//!
//! [`SessionStore`] issues sessions outside a transaction and opens
//! [`SessionTx`] transactions for rotation. A transaction that is dropped
//! without [`SessionTx::commit`] rolls back.

use async_trait::async_trait;
use keyturn_core::error::CoreError;
use keyturn_core::types::{DbId, Timestamp};

use crate::models::session::{ActiveSession, NewSession};

pub mod memory;
pub mod postgres;

pub use memory::{MemorySessionStore, MemorySessionTx};
pub use postgres::{PgSessionStore, PgSessionTx};

/// PostgreSQL unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No redeemable row matched. Covers unknown and already-rotated sessions.
    #[error("session not found")]
    NotFound,

    /// A session with the same session id already exists.
    #[error("duplicate session id")]
    Conflict,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict
            }
            _ => StoreError::Database(err),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => CoreError::unauthorized(),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    type Tx: SessionTx;

    /// Open a transaction for a rotation.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Insert a redeemable session in its own implicit transaction.
    async fn create_session(&self, input: &NewSession) -> Result<(), StoreError>;

    /// Check that the backing storage is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionTx: Send {
    /// Look up the redeemable row for `(session_id, user_id)` and hold it
    /// for the rest of the transaction.
    async fn find_active_session(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> Result<ActiveSession, StoreError>;

    async fn create_session(&mut self, input: &NewSession) -> Result<(), StoreError>;

    /// Set `invalidated_at` on a redeemable row. Fails with
    /// [`StoreError::NotFound`] if the row is already invalidated.
    async fn invalidate_session(&mut self, id: DbId, at: Timestamp) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Runtime-selected backend
// ---------------------------------------------------------------------------

/// Store chosen at startup from configuration.
#[derive(Clone)]
pub enum SessionBackend {
    Postgres(PgSessionStore),
    Memory(MemorySessionStore),
}

/// Transaction of whichever backend is active.
pub enum BackendTx {
    Postgres(PgSessionTx),
    Memory(MemorySessionTx),
}

#[async_trait]
impl SessionStore for SessionBackend {
    type Tx = BackendTx;

    async fn begin(&self) -> Result<BackendTx, StoreError> {
        match self {
            SessionBackend::Postgres(store) => store.begin().await.map(BackendTx::Postgres),
            SessionBackend::Memory(store) => store.begin().await.map(BackendTx::Memory),
        }
    }

    async fn create_session(&self, input: &NewSession) -> Result<(), StoreError> {
        match self {
            SessionBackend::Postgres(store) => store.create_session(input).await,
            SessionBackend::Memory(store) => store.create_session(input).await,
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        match self {
            SessionBackend::Postgres(store) => store.health_check().await,
            SessionBackend::Memory(store) => store.health_check().await,
        }
    }
}

#[async_trait]
impl SessionTx for BackendTx {
    async fn find_active_session(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> Result<ActiveSession, StoreError> {
        match self {
            BackendTx::Postgres(tx) => tx.find_active_session(session_id, user_id).await,
            BackendTx::Memory(tx) => tx.find_active_session(session_id, user_id).await,
        }
    }

    async fn create_session(&mut self, input: &NewSession) -> Result<(), StoreError> {
        match self {
            BackendTx::Postgres(tx) => tx.create_session(input).await,
            BackendTx::Memory(tx) => tx.create_session(input).await,
        }
    }

    async fn invalidate_session(&mut self, id: DbId, at: Timestamp) -> Result<(), StoreError> {
        match self {
            BackendTx::Postgres(tx) => tx.invalidate_session(id, at).await,
            BackendTx::Memory(tx) => tx.invalidate_session(id, at).await,
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        match self {
            BackendTx::Postgres(tx) => tx.commit().await,
            BackendTx::Memory(tx) => tx.commit().await,
        }
    }
}
