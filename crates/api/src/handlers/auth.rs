//! Handlers for token pair issuance and refresh.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use keyturn_core::types::TokenPair;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::client_ip::ClientIp;
use crate::state::AppState;

/// Query string for `GET /auth`.
#[derive(Debug, Deserialize)]
pub struct IssueQuery {
    pub user_id: String,
}

/// GET /api/v1/auth?user_id=<uuid>
///
/// Open a session for `user_id` at the caller's address and return its pair.
/// The user id is normalized to its lowercase hyphenated form.
pub async fn issue(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    query: Result<Query<IssueQuery>, QueryRejection>,
) -> AppResult<Json<TokenPair>> {
    let Query(query) = query?;
    let user_id = Uuid::parse_str(query.user_id.trim())
        .map_err(|_| AppError::BadRequest("user_id must be a UUID".into()))?;

    let pair = state
        .tokens
        .auth(&user_id.hyphenated().to_string(), &ip)
        .await?;
    Ok(Json(pair))
}

/// POST /api/v1/refresh
///
/// Redeem a token pair for its successor. Each pair can be redeemed once.
/// The caller's address plays no part; the successor keeps the issuing IP.
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<TokenPair>, JsonRejection>,
) -> AppResult<Json<TokenPair>> {
    let Json(pair) = body?;

    let next = state.tokens.refresh(&pair).await?;
    Ok(Json(next))
}
