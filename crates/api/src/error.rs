use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keyturn_core::error::{CoreError, ErrorKind, UNAUTHORIZED_MESSAGE};
use serde_json::json;

const INTERNAL_ERROR: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds rejected client input.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `keyturn_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a [`CoreError`] to an HTTP status, error code, and wire message.
///
/// Every unauthorized sub-cause gets the same body. Its detail, like
/// infrastructure failures, never leaves the process.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err.kind() {
        ErrorKind::Validation => {
            let message = match err {
                CoreError::Validation(msg) => msg.clone(),
                other => other.to_string(),
            };
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
        }
        ErrorKind::Unauthorized => {
            tracing::debug!(detail = %err, "Credentials rejected");
            (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                UNAUTHORIZED_MESSAGE.to_string(),
            )
        }
        ErrorKind::Infrastructure | ErrorKind::Fatal => {
            tracing::error!(error = %err, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_ERROR.to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn invalid_token_hides_validation_detail() {
        let (status, body) =
            render(CoreError::InvalidToken("InvalidSignature".into()).into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["error"], UNAUTHORIZED_MESSAGE);
    }

    #[tokio::test]
    async fn unauthorized_causes_share_one_body() {
        let (_, forged) = render(CoreError::InvalidToken("ExpiredSignature".into()).into()).await;
        let (_, unknown) = render(CoreError::Unauthorized("unknown session".into()).into()).await;
        assert_eq!(forged, unknown);
    }

    #[tokio::test]
    async fn internal_errors_are_sanitized() {
        let (status, body) =
            render(CoreError::Internal("connection refused at 10.0.0.5".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn validation_keeps_its_message() {
        let (status, body) = render(CoreError::Validation("bad user id".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "bad user id");
    }
}
