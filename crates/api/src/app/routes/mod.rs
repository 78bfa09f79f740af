use axum::{routing::get, Router};

pub mod event_stream;
pub mod pipeline;
pub mod system;

/// Router for all authenticated (session-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/pipeline", pipeline::router().merge(event_stream::router()))
}
