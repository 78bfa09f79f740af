use axum::{extract::Extension, http::StatusCode, Json};

use crate::app::dto::WhoAmIResponse;
use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<SessionContext>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        user_id: session.user_id(),
        organization_id: session.organization_id(),
        role: session.role().map(|r| r.as_str()),
    })
}
