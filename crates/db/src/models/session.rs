//! Session model and DTOs.
//!
//! None of these types print the refresh token hash through `Debug`.

use std::fmt;

use keyturn_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `sessions` table.
#[derive(Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub session_id: String,
    pub user_id: String,
    pub refresh_token_hash: String,
    pub ip_address: String,
    pub created_at: Timestamp,
    pub invalidated_at: Option<Timestamp>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.invalidated_at.is_none()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("refresh_token_hash", &"<redacted>")
            .field("ip_address", &self.ip_address)
            .field("created_at", &self.created_at)
            .field("invalidated_at", &self.invalidated_at)
            .finish()
    }
}

/// The columns needed to redeem a session.
#[derive(Clone, FromRow)]
pub struct ActiveSession {
    pub id: DbId,
    pub refresh_token_hash: String,
    /// IP recorded when the session was issued.
    pub ip_address: String,
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("id", &self.id)
            .field("refresh_token_hash", &"<redacted>")
            .field("ip_address", &self.ip_address)
            .finish()
    }
}

/// DTO for inserting a new, redeemable session.
#[derive(Clone)]
pub struct NewSession {
    pub session_id: String,
    pub user_id: String,
    pub refresh_token_hash: String,
    pub ip_address: String,
}

impl fmt::Debug for NewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSession")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("refresh_token_hash", &"<redacted>")
            .field("ip_address", &self.ip_address)
            .finish()
    }
}
