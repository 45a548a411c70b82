//! Integration tests for the PostgreSQL session store.
//!
//! Exercises the repository and store layers against a real database to
//! verify that:
//! - Issued sessions are found active by session id and subject
//! - Rotation inserts the successor and invalidates the original atomically
//! - A rolled-back rotation leaves the original redeemable
//! - Concurrent rotations of the same row serialize on the row lock
//! - Session ids are unique across active and invalidated rows

use assert_matches::assert_matches;
use chrono::Utc;
use keyturn_db::models::session::NewSession;
use keyturn_db::repositories::SessionRepo;
use keyturn_db::{PgSessionStore, SessionStore, SessionTx, StoreError};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_session(session_id: &str, user_id: &str) -> NewSession {
    NewSession {
        session_id: session_id.to_string(),
        user_id: user_id.to_string(),
        refresh_token_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        ip_address: "192.0.2.10".to_string(),
    }
}

/// Rotate `from` into `to` inside one transaction and commit.
async fn rotate(
    store: &PgSessionStore,
    from: &str,
    to: &str,
    user_id: &str,
) -> Result<(), StoreError> {
    let mut tx = store.begin().await?;
    let current = tx.find_active_session(from, user_id).await?;
    tx.create_session(&new_session(to, user_id)).await?;
    tx.invalidate_session(current.id, Utc::now()).await?;
    tx.commit().await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn created_session_is_active(pool: PgPool) {
    let store = PgSessionStore::new(pool.clone());
    store.create_session(&new_session("sid-1", "user-1")).await.unwrap();

    let row = SessionRepo::find_by_session_id(&pool, "sid-1")
        .await
        .unwrap()
        .expect("row should exist");
    assert!(row.is_active());
    assert_eq!(row.user_id, "user-1");
    assert_eq!(row.ip_address, "192.0.2.10");
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_session_is_not_found(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    let mut tx = store.begin().await.unwrap();
    assert_matches!(
        tx.find_active_session("missing", "user-1").await,
        Err(StoreError::NotFound)
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn rotation_commits_both_writes(pool: PgPool) {
    let store = PgSessionStore::new(pool.clone());
    store.create_session(&new_session("sid-1", "user-1")).await.unwrap();

    rotate(&store, "sid-1", "sid-2", "user-1").await.unwrap();

    let old = SessionRepo::find_by_session_id(&pool, "sid-1").await.unwrap().unwrap();
    let new = SessionRepo::find_by_session_id(&pool, "sid-2").await.unwrap().unwrap();
    assert!(old.invalidated_at.is_some());
    assert!(new.is_active());

    // A rotated session can never be redeemed again.
    assert_matches!(
        rotate(&store, "sid-1", "sid-3", "user-1").await,
        Err(StoreError::NotFound)
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn dropped_transaction_rolls_back(pool: PgPool) {
    let store = PgSessionStore::new(pool.clone());
    store.create_session(&new_session("sid-1", "user-1")).await.unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        let current = tx.find_active_session("sid-1", "user-1").await.unwrap();
        tx.create_session(&new_session("sid-2", "user-1")).await.unwrap();
        tx.invalidate_session(current.id, Utc::now()).await.unwrap();
    }

    let old = SessionRepo::find_by_session_id(&pool, "sid-1").await.unwrap().unwrap();
    assert!(old.is_active());
    assert!(SessionRepo::find_by_session_id(&pool, "sid-2").await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_session_id_is_conflict(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    store.create_session(&new_session("sid-1", "user-1")).await.unwrap();
    assert_matches!(
        store.create_session(&new_session("sid-1", "user-2")).await,
        Err(StoreError::Conflict)
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_rotations_have_one_winner(pool: PgPool) {
    let store = PgSessionStore::new(pool.clone());
    store.create_session(&new_session("sid-1", "user-1")).await.unwrap();

    let a = tokio::spawn({
        let store = store.clone();
        async move { rotate(&store, "sid-1", "sid-a", "user-1").await }
    });
    let b = tokio::spawn({
        let store = store.clone();
        async move { rotate(&store, "sid-1", "sid-b", "user-1").await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(StoreError::NotFound))));

    let rows = SessionRepo::list_for_user(&pool, "user-1").await.unwrap();
    assert_eq!(rows.len(), 2, "original plus exactly one successor");
    assert_eq!(rows.iter().filter(|r| r.is_active()).count(), 1);
}
