use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Access/refresh credential pair as it travels over the wire.
///
/// Missing fields deserialize as empty strings so that an incomplete body is
/// rejected as unauthorized rather than as malformed JSON.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl TokenPair {
    /// True when either half of the pair is missing.
    pub fn is_incomplete(&self) -> bool {
        self.access_token.is_empty() || self.refresh_token.is_empty()
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}
