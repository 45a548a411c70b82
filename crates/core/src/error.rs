/// The only message an unauthorized caller ever sees. Bad, expired, unknown,
/// replayed and mismatched credentials all look the same from outside.
pub const UNAUTHORIZED_MESSAGE: &str = "invalid token pair";

/// Coarse classification of a [`CoreError`], used by the HTTP boundary to
/// choose a status code without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed client input.
    Validation,
    /// Bad, expired, unknown or replayed credentials.
    Unauthorized,
    /// Database, entropy or hashing failure; safe for the caller to retry.
    Infrastructure,
    /// Misconfiguration detected while constructing the service.
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Access token signature, encoding or expiry check failed.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Misconfigured: {0}")]
    Misconfigured(String),
}

impl CoreError {
    /// Unauthorized with the shared [`UNAUTHORIZED_MESSAGE`].
    pub fn unauthorized() -> Self {
        CoreError::Unauthorized(UNAUTHORIZED_MESSAGE.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Unauthorized(_) | CoreError::InvalidToken(_) => ErrorKind::Unauthorized,
            CoreError::Internal(_) => ErrorKind::Infrastructure,
            CoreError::Misconfigured(_) => ErrorKind::Fatal,
        }
    }
}
