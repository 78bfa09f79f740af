use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use pipeboard_auth::SessionResolver;

use crate::app::errors::ApiError;
use crate::context::SessionContext;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionResolver>,
}

/// Resolve the bearer token into a [`SessionContext`], or answer 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(_) => return ApiError::Unauthorized.into_response(),
    };

    let session = match state.sessions.resolve(token, Utc::now()) {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return ApiError::Unauthorized.into_response();
        }
    };

    req.extensions_mut().insert(SessionContext::new(session));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
