//! Caller identity. Authentication itself happens upstream: the gateway
//! terminates the session and forwards the resolved user id in a trusted
//! header. This service only parses it and makes it available to extractors.

use crate::error::AppError;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// Set by the gateway after session validation. Requests arriving without it
/// never reach a business route.
pub const CALLER_ID_HEADER: &str = "x-user-id";

/// Middleware for the API routes: extract the resolved caller id and add it
/// to the request extensions.
pub async fn identity_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    let raw = req
        .headers()
        .get(CALLER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let caller_id =
        Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("invalid caller id".into()))?;

    req.extensions_mut().insert(caller_id);

    Ok(next.run(req).await)
}
