//! In-process session store.
//!
//! A transaction takes the table lock for its whole lifetime and works on a
//! copy of the table, which replaces the shared table on commit. Concurrent
//! rotations are therefore fully serialized.
//!
//! The lock is held across everything a rotation does while the transaction
//! is open, including hashing the successor secret, so every other issue or
//! refresh waits behind it. Throughput is bounded by one rotation at a time;
//! this store is meant for development and tests, not production load.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use keyturn_core::types::{DbId, Timestamp};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{SessionStore, SessionTx, StoreError};
use crate::models::session::{ActiveSession, NewSession, Session};

#[derive(Debug, Clone, Default)]
struct Table {
    rows: Vec<Session>,
    last_id: DbId,
}

impl Table {
    fn insert(&mut self, input: &NewSession) -> Result<DbId, StoreError> {
        if self.rows.iter().any(|r| r.session_id == input.session_id) {
            return Err(StoreError::Conflict);
        }
        self.last_id += 1;
        self.rows.push(Session {
            id: self.last_id,
            session_id: input.session_id.clone(),
            user_id: input.user_id.clone(),
            refresh_token_hash: input.refresh_token_hash.clone(),
            ip_address: input.ip_address.clone(),
            created_at: Utc::now(),
            invalidated_at: None,
        });
        Ok(self.last_id)
    }
}

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    table: Arc<Mutex<Table>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every session issued to `user_id`, oldest first.
    pub async fn sessions_for_user(&self, user_id: &str) -> Vec<Session> {
        let table = self.table.lock().await;
        table
            .rows
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn find_by_session_id(&self, session_id: &str) -> Option<Session> {
        let table = self.table.lock().await;
        table.rows.iter().find(|r| r.session_id == session_id).cloned()
    }
}

pub struct MemorySessionTx {
    guard: OwnedMutexGuard<Table>,
    working: Table,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    type Tx = MemorySessionTx;

    async fn begin(&self) -> Result<MemorySessionTx, StoreError> {
        let guard = Arc::clone(&self.table).lock_owned().await;
        let working = guard.clone();
        Ok(MemorySessionTx { guard, working })
    }

    async fn create_session(&self, input: &NewSession) -> Result<(), StoreError> {
        let mut table = self.table.lock().await;
        table.insert(input)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl SessionTx for MemorySessionTx {
    async fn find_active_session(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> Result<ActiveSession, StoreError> {
        self.working
            .rows
            .iter()
            .find(|r| r.session_id == session_id && r.user_id == user_id && r.is_active())
            .map(|r| ActiveSession {
                id: r.id,
                refresh_token_hash: r.refresh_token_hash.clone(),
                ip_address: r.ip_address.clone(),
            })
            .ok_or(StoreError::NotFound)
    }

    async fn create_session(&mut self, input: &NewSession) -> Result<(), StoreError> {
        self.working.insert(input)?;
        Ok(())
    }

    async fn invalidate_session(&mut self, id: DbId, at: Timestamp) -> Result<(), StoreError> {
        let row = self
            .working
            .rows
            .iter_mut()
            .find(|r| r.id == id && r.is_active())
            .ok_or(StoreError::NotFound)?;
        row.invalidated_at = Some(at);
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn new_session(session_id: &str, user_id: &str) -> NewSession {
        NewSession {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            refresh_token_hash: "$argon2id$placeholder".to_string(),
            ip_address: "10.0.0.1".to_string(),
        }
    }

    #[tokio::test]
    async fn created_session_is_found_active() {
        let store = MemorySessionStore::new();
        store.create_session(&new_session("s1", "u1")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let active = tx.find_active_session("s1", "u1").await.unwrap();
        assert_eq!(active.ip_address, "10.0.0.1");
    }

    #[tokio::test]
    async fn lookup_requires_matching_subject() {
        let store = MemorySessionStore::new();
        store.create_session(&new_session("s1", "u1")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_matches!(
            tx.find_active_session("s1", "someone-else").await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn duplicate_session_id_conflicts() {
        let store = MemorySessionStore::new();
        store.create_session(&new_session("s1", "u1")).await.unwrap();
        assert_matches!(
            store.create_session(&new_session("s1", "u2")).await,
            Err(StoreError::Conflict)
        );
    }

    #[tokio::test]
    async fn committed_rotation_is_visible() {
        let store = MemorySessionStore::new();
        store.create_session(&new_session("s1", "u1")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let current = tx.find_active_session("s1", "u1").await.unwrap();
        tx.create_session(&new_session("s2", "u1")).await.unwrap();
        tx.invalidate_session(current.id, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let old = store.find_by_session_id("s1").await.unwrap();
        assert!(old.invalidated_at.is_some());
        let new = store.find_by_session_id("s2").await.unwrap();
        assert!(new.is_active());
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = MemorySessionStore::new();
        store.create_session(&new_session("s1", "u1")).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let current = tx.find_active_session("s1", "u1").await.unwrap();
            tx.create_session(&new_session("s2", "u1")).await.unwrap();
            tx.invalidate_session(current.id, Utc::now()).await.unwrap();
        }

        assert!(store.find_by_session_id("s1").await.unwrap().is_active());
        assert!(store.find_by_session_id("s2").await.is_none());
    }

    #[tokio::test]
    async fn open_transaction_blocks_other_writers() {
        let store = MemorySessionStore::new();
        let tx = store.begin().await.unwrap();

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.create_session(&new_session("s1", "u1")),
        )
        .await;
        assert!(blocked.is_err(), "insert must wait for the open transaction");

        drop(tx);
        store.create_session(&new_session("s1", "u1")).await.unwrap();
        assert!(store.find_by_session_id("s1").await.is_some());
    }

    #[tokio::test]
    async fn invalidation_happens_once() {
        let store = MemorySessionStore::new();
        store.create_session(&new_session("s1", "u1")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let current = tx.find_active_session("s1", "u1").await.unwrap();
        tx.invalidate_session(current.id, Utc::now()).await.unwrap();
        assert_matches!(
            tx.invalidate_session(current.id, Utc::now()).await,
            Err(StoreError::NotFound)
        );
    }
}
