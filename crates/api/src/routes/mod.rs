pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth?user_id=<uuid>   issue a token pair (GET)
/// /refresh               rotate a token pair (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(auth::router())
}
