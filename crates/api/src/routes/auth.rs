//! Route definitions for token pair issuance and refresh.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at the API root.
///
/// ```text
/// GET  /auth     -> issue
/// POST /refresh  -> refresh
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(auth::issue))
        .route("/refresh", post(auth::refresh))
}
