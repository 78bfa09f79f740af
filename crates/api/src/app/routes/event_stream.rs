//! Board event stream (Server-Sent Events).

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::Extension,
    response::sse::{Event as SseEvent, Sse},
    routing::get,
    Router,
};
use tokio_stream::{Stream, StreamExt};

use pipeboard_auth::authorize;
use pipeboard_auth::permissions::PIPELINE_READ;

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::SessionContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new().route("/events", get(stream_events))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /pipeline/events
///
/// Streams every board event of the caller's organization:
/// - `retry: <ms>` once, first
/// - `data: {"type","organizationId","payload"}` per event
/// - `:` comment keepalives on a fixed interval
///
/// Sessions without an organization get 401 before the stream opens. The
/// subscription lives exactly as long as the response body.
pub async fn stream_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let organization_id = authorize(session.session(), &PIPELINE_READ)?;

    let frames = services
        .open_stream(organization_id)
        .map(|frame| Ok::<_, Infallible>(frame.into_sse()));

    Ok(Sse::new(frames))
}
