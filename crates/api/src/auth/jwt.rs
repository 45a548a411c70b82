//! HS512 access-token signing and validation.
//!
//! Access tokens are JWTs carrying a [`Claims`] payload. The `jti` claim is
//! the session id of the row holding the matching refresh secret, so a refresh
//! can find that row without a secondary index. Validation is stateless and
//! never touches the session store.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keyturn_core::error::CoreError;
use serde::{Deserialize, Serialize};

/// TTLs below this are treated as unset.
const MIN_TTL: Duration = Duration::from_secs(1);

/// TTL used when the configured value is below [`MIN_TTL`].
const FALLBACK_TTL: Duration = Duration::from_secs(60);

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Session id of the stored refresh secret.
    pub jti: String,
    /// Subject -- the externally issued user id.
    pub sub: String,
    /// IP address the session was issued to.
    pub uip: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

/// Creates and validates access tokens with a process-lifetime key.
pub struct Signer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl Signer {
    /// Build a signer for `key`.
    ///
    /// A `ttl` under one second is replaced with one minute. An empty key is
    /// rejected with [`CoreError::Misconfigured`].
    pub fn new(ttl: Duration, key: &[u8]) -> Result<Self, CoreError> {
        if key.is_empty() {
            return Err(CoreError::Misconfigured(
                "access token signing key must not be empty".into(),
            ));
        }
        let ttl = if ttl < MIN_TTL { FALLBACK_TTL } else { ttl };

        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        })
    }

    /// Effective access token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign an access token for the given session.
    pub fn create(
        &self,
        session_id: &str,
        user_id: &str,
        user_ip: &str,
    ) -> Result<String, CoreError> {
        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);

        let claims = Claims {
            jti: session_id.to_string(),
            sub: user_id.to_string(),
            uip: user_ip.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding)
            .map_err(|e| CoreError::Internal(format!("access token signing failed: {e}")))
    }

    /// Verify signature and expiry, returning the embedded [`Claims`].
    ///
    /// Every failure (bad signature, malformed token, expired) is reported as
    /// [`CoreError::InvalidToken`].
    pub fn validate(&self, token: &str) -> Result<Claims, CoreError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| CoreError::InvalidToken(e.to_string()))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("algorithm", &Algorithm::HS512)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
