//! `pipeboard-auth`: session and authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it turns a bearer token into
//! a [`Session`] and answers "may this session do that" questions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;
pub mod session;

pub use authorize::{authorize, AuthzError};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256SessionResolver, SessionResolver};
pub use permissions::Permission;
pub use roles::OrgRole;
pub use session::Session;
