use async_trait::async_trait;
use keyturn_core::types::{DbId, Timestamp};
use sqlx::{Postgres, Transaction};

use super::{SessionStore, SessionTx, StoreError};
use crate::models::session::{ActiveSession, NewSession};
use crate::repositories::SessionRepo;
use crate::DbPool;

/// [`SessionStore`] over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// An open READ COMMITTED transaction. Rows returned by
/// [`SessionTx::find_active_session`] stay locked until commit or drop.
pub struct PgSessionTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SessionStore for PgSessionStore {
    type Tx = PgSessionTx;

    async fn begin(&self) -> Result<PgSessionTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgSessionTx { tx })
    }

    async fn create_session(&self, input: &NewSession) -> Result<(), StoreError> {
        let session = SessionRepo::create(&self.pool, input).await?;
        tracing::debug!(row_id = session.id, "Session row inserted");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionTx for PgSessionTx {
    async fn find_active_session(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> Result<ActiveSession, StoreError> {
        SessionRepo::find_active_for_update(&mut *self.tx, session_id, user_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn create_session(&mut self, input: &NewSession) -> Result<(), StoreError> {
        let session = SessionRepo::create(&mut *self.tx, input).await?;
        tracing::debug!(row_id = session.id, "Successor session row inserted");
        Ok(())
    }

    async fn invalidate_session(&mut self, id: DbId, at: Timestamp) -> Result<(), StoreError> {
        if SessionRepo::invalidate(&mut *self.tx, id, at).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
