use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use keyturn_core::error::CoreError;
use keyturn_events::EmailConfig;

/// Default access token lifetime in seconds (15 minutes).
const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;

/// Fixed destination for security alerts unless overridden by the operator.
const DEFAULT_ALERT_DESTINATION: &str = "security@keyturn.local";

/// Access token signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Raw HMAC key bytes.
    pub secret: Vec<u8>,
    /// Access token lifetime. Values under one second are clamped by the signer.
    pub access_ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .finish()
    }
}

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var               | Required | Default |
    /// |-----------------------|----------|---------|
    /// | `JWT_SECRET`          | **yes**  | --      |
    /// | `JWT_ACCESS_TTL_SECS` | no       | `900`   |
    ///
    /// `JWT_SECRET` is standard base64 and must decode to at least one byte.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing, not base64, or empty.
    pub fn from_env() -> Self {
        let encoded =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        let secret = parse_secret(&encoded).unwrap_or_else(|e| panic!("JWT_SECRET: {e}"));

        let access_ttl_secs: u64 = std::env::var("JWT_ACCESS_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_TTL_SECS.to_string())
            .parse()
            .expect("JWT_ACCESS_TTL_SECS must be a valid u64");

        Self {
            secret,
            access_ttl: Duration::from_secs(access_ttl_secs),
        }
    }
}

/// Decode a base64 signing key, rejecting empty keys.
pub fn parse_secret(encoded: &str) -> Result<Vec<u8>, CoreError> {
    let secret = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CoreError::Misconfigured(format!("signing key is not valid base64: {e}")))?;
    if secret.is_empty() {
        return Err(CoreError::Misconfigured("signing key must not be empty".into()));
    }
    Ok(secret)
}

/// Which session store backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    /// PostgreSQL at `DATABASE_URL`.
    Postgres { database_url: String },
    /// Process-local store; sessions are lost on restart.
    Memory,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the signing key have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for queued alerts to drain (default: `5`).
    pub shutdown_timeout_secs: u64,
    pub store: StoreKind,
    /// Access token signing configuration.
    pub jwt: JwtConfig,
    /// Where IP drift alerts are sent.
    pub alert_destination: String,
    /// SMTP settings; `None` means alerts only go to the log.
    pub email: Option<EmailConfig>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                        |
    /// |-------------------------|--------------------------------|
    /// | `HOST`                  | `0.0.0.0`                      |
    /// | `PORT`                  | `3000`                         |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS`  | `60`                           |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `5`                            |
    /// | `SESSION_STORE`         | `postgres` (or `memory`)       |
    /// | `DATABASE_URL`          | required for `postgres`        |
    /// | `ALERT_DESTINATION`     | `security@keyturn.local`       |
    ///
    /// See [`JwtConfig::from_env`] and [`EmailConfig::from_env`] for the rest.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let store = match std::env::var("SESSION_STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            Ok("postgres") | Err(_) => StoreKind::Postgres {
                database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            },
            Ok(other) => panic!("SESSION_STORE must be `postgres` or `memory`, got `{other}`"),
        };

        let alert_destination = std::env::var("ALERT_DESTINATION")
            .unwrap_or_else(|_| DEFAULT_ALERT_DESTINATION.into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            store,
            jwt: JwtConfig::from_env(),
            alert_destination,
            email: EmailConfig::from_env(),
        }
    }
}
