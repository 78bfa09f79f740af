//! HTTP API: config, auth, the mutation gateway and the board event stream.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
