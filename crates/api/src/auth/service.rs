//! Token pair issuance and single-use rotation.
//!
//! A session id moves through `ACTIVE -> ROTATED` (or `REVOKED`); both
//! terminal states are absorbing. [`TokenService::refresh`] performs the
//! lookup, successor insert and invalidation in one store transaction, so two
//! refreshes racing on the same pair produce exactly one successor.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use keyturn_core::error::CoreError;
use keyturn_core::types::TokenPair;
use keyturn_db::models::session::NewSession;
use keyturn_db::{SessionStore, SessionTx, StoreError};
use keyturn_events::{Alert, AlertDispatcher};

use super::hasher::CredentialHasher;
use super::jwt::{Claims, Signer};
use super::material::{
    decode_refresh_token, encode_refresh_token, encode_session_id, random_bytes,
    session_id_prefix,
};

/// Upper bound on the transactional part of a refresh.
pub const REFRESH_DEADLINE: Duration = Duration::from_secs(60);

/// Body of the alert sent when a session is refreshed under a different IP
/// than it was stored with.
pub const IP_CHANGED_MESSAGE: &str = "The IP address was changed since last login";

/// Issues and rotates token pairs against a [`SessionStore`].
pub struct TokenService<S> {
    signer: Arc<Signer>,
    hasher: CredentialHasher,
    store: S,
    alerts: AlertDispatcher,
    alert_destination: String,
}

impl<S: SessionStore> TokenService<S> {
    pub fn new(
        signer: Arc<Signer>,
        hasher: CredentialHasher,
        store: S,
        alerts: AlertDispatcher,
        alert_destination: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            hasher,
            store,
            alerts,
            alert_destination: alert_destination.into(),
        }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a new session for `user_id` observed at `user_ip`.
    ///
    /// The insert is the only write, so any failure leaves nothing behind.
    pub async fn auth(&self, user_id: &str, user_ip: &str) -> Result<TokenPair, CoreError> {
        if user_id.is_empty() {
            return Err(CoreError::Validation("user id must not be empty".into()));
        }

        let (pair, session) = self.issue(user_id, user_ip).await?;
        self.store.create_session(&session).await?;

        tracing::info!(
            user_id,
            session = session_id_prefix(&session.session_id),
            "Session issued"
        );
        Ok(pair)
    }

    /// Redeem `pair` for a successor pair, invalidating the presented one.
    pub async fn refresh(&self, pair: &TokenPair) -> Result<TokenPair, CoreError> {
        if pair.is_incomplete() {
            return Err(CoreError::unauthorized());
        }

        let claims = self.signer.validate(&pair.access_token)?;

        let presented = decode_refresh_token(&pair.refresh_token).map_err(|e| {
            tracing::debug!(error = %e, "Malformed refresh token encoding");
            CoreError::unauthorized()
        })?;

        let (next, stored_ip) =
            tokio::time::timeout(REFRESH_DEADLINE, self.rotate(&claims, presented))
                .await
                .map_err(|_| CoreError::Internal("refresh deadline exceeded".into()))??;

        tracing::info!(
            user_id = %claims.sub,
            session = session_id_prefix(&claims.jti),
            "Session rotated"
        );

        if stored_ip != claims.uip {
            tracing::warn!(
                user_id = %claims.sub,
                stored_ip = %stored_ip,
                token_ip = %claims.uip,
                "Session IP drift detected"
            );
            self.alerts.submit(Alert::new(
                self.alert_destination.as_str(),
                IP_CHANGED_MESSAGE,
                claims.sub.as_str(),
            ));
        }

        Ok(next)
    }

    /// Verify the presented secret and swap the session for its successor.
    ///
    /// Returns the new pair and the IP stored on the rotated row. Returning
    /// early drops the transaction, which rolls it back.
    async fn rotate(
        &self,
        claims: &Claims,
        presented: Vec<u8>,
    ) -> Result<(TokenPair, String), CoreError> {
        let mut tx = self.store.begin().await?;

        let current = tx
            .find_active_session(&claims.jti, &claims.sub)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    tracing::debug!(
                        session = session_id_prefix(&claims.jti),
                        "Unknown access token"
                    );
                    CoreError::unauthorized()
                }
                other => other.into(),
            })?;

        let hash = current.refresh_token_hash.clone();
        if !self.verify_secret(hash, presented).await? {
            tracing::debug!(
                session = session_id_prefix(&claims.jti),
                "Refresh secret mismatch"
            );
            return Err(CoreError::unauthorized());
        }

        // The successor keeps the IP the session was originally issued to.
        let (pair, successor) = self.issue(&claims.sub, &claims.uip).await?;
        tx.create_session(&successor).await?;
        tx.invalidate_session(current.id, Utc::now()).await?;
        tx.commit().await?;

        Ok((pair, current.ip_address))
    }

    /// Generate fresh session material and the row that will hold it.
    async fn issue(
        &self,
        user_id: &str,
        user_ip: &str,
    ) -> Result<(TokenPair, NewSession), CoreError> {
        let session_id = encode_session_id(&random_bytes()?);
        let secret = random_bytes()?;

        let access_token = self.signer.create(&session_id, user_id, user_ip)?;
        let refresh_token = encode_refresh_token(&secret);
        let refresh_token_hash = self.hash_secret(secret.to_vec()).await?;

        let session = NewSession {
            session_id,
            user_id: user_id.to_string(),
            refresh_token_hash,
            ip_address: user_ip.to_string(),
        };
        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            session,
        ))
    }

    /// Argon2 is CPU-bound; run it off the async workers.
    async fn hash_secret(&self, secret: Vec<u8>) -> Result<String, CoreError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| CoreError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn verify_secret(&self, hash: String, secret: Vec<u8>) -> Result<bool, CoreError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &secret))
            .await
            .map_err(|e| CoreError::Internal(format!("verification task failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
