//! Client address extractor for Axum handlers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Address of the client as seen by this service.
///
/// Taken from the first entry of `X-Forwarded-For` when present and
/// non-empty, otherwise from the socket peer address. The router must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()` for the
/// fallback to be available.
///
/// ```ignore
/// async fn my_handler(ClientIp(ip): ClientIp) -> AppResult<Json<()>> {
///     tracing::info!(%ip, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ip) = forwarded_for(parts) {
            return Ok(ClientIp(ip));
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ClientIp(addr.ip().to_string()))
            .ok_or_else(|| AppError::BadRequest("Unable to determine client address".into()))
    }
}

fn forwarded_for(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = header.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}
