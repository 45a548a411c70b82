use std::sync::Arc;

use keyturn_db::SessionBackend;

use crate::auth::service::TokenService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Token issuance and rotation over the configured session store.
    pub tokens: Arc<TokenService<SessionBackend>>,
}
