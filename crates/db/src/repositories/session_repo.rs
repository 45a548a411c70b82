//! Repository for the `sessions` table.

use keyturn_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::session::{ActiveSession, NewSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, user_id, refresh_token_hash, ip_address, \
                       created_at, invalidated_at";

/// Provides the queries behind session issuance and rotation.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new redeemable session, returning the created row.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        input: &NewSession,
    ) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (session_id, user_id, refresh_token_hash, ip_address)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(&input.session_id)
            .bind(&input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(&input.ip_address)
            .fetch_one(executor)
            .await
    }

    /// Find the active session for a session id and subject, locking the row
    /// until the surrounding transaction ends.
    ///
    /// A concurrent caller blocked on the lock re-evaluates the
    /// `invalidated_at IS NULL` filter once the winner commits, so it sees no
    /// row.
    pub async fn find_active_for_update(
        executor: impl PgExecutor<'_>,
        session_id: &str,
        user_id: &str,
    ) -> Result<Option<ActiveSession>, sqlx::Error> {
        sqlx::query_as::<_, ActiveSession>(
            "SELECT id, refresh_token_hash, ip_address FROM sessions
             WHERE session_id = $1
               AND user_id = $2
               AND invalidated_at IS NULL
             FOR UPDATE",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Mark a session invalidated. Returns `true` if the row was updated.
    ///
    /// Already-invalidated rows are never touched, so the timestamp is set
    /// exactly once.
    pub async fn invalidate(
        executor: impl PgExecutor<'_>,
        id: DbId,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET invalidated_at = $2 WHERE id = $1 AND invalidated_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a session by its public session id, active or not.
    pub async fn find_by_session_id(
        executor: impl PgExecutor<'_>,
        session_id: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE session_id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(session_id)
            .fetch_optional(executor)
            .await
    }

    /// List every session issued to a user, oldest first.
    pub async fn list_for_user(
        executor: impl PgExecutor<'_>,
        user_id: &str,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE user_id = $1 ORDER BY id");
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }
}
