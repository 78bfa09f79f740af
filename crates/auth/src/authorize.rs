//! Authorization decisions for organization-scoped operations.
//!
//! - No IO
//! - No panics
//! - Pure policy: role → permissions → allow/deny

use thiserror::Error;

use pipeboard_core::OrganizationId;

use crate::{Permission, Session};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The session is not bound to any organization.
    #[error("session is not linked to an organization")]
    NoOrganization,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize `session` for `required` within its own organization.
///
/// Returns the organization the operation must be scoped to. Callers use this
/// value for every read and write; organization ids sent by clients are never
/// trusted for scoping.
pub fn authorize(session: &Session, required: &Permission) -> Result<OrganizationId, AuthzError> {
    let organization_id = session.organization_id.ok_or(AuthzError::NoOrganization)?;
    let role = session.effective_role().ok_or(AuthzError::NoOrganization)?;

    let granted = role
        .permissions()
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(organization_id)
    } else {
        tracing::debug!(user_id = %session.user_id, role = %role, permission = %required, "authorization denied");
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
