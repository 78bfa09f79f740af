//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/bus wiring shared by all handlers
//! - `gateway.rs`: authorize → validate → commit → publish for every mutation
//! - `stream.rs`: per-connection event stream session
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod gateway;
pub mod routes;
pub mod services;
pub mod stream;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(config, services))
}

/// Router over already-built services.
pub fn router(config: &ApiConfig, services: services::AppServices) -> Router {
    let sessions = Arc::new(pipeboard_auth::Hs256SessionResolver::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { sessions };

    // Protected routes: require a resolved session.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
