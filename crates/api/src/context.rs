use pipeboard_auth::{OrgRole, Session};
use pipeboard_core::{OrganizationId, UserId};

/// Session context for a request.
///
/// Inserted by the auth middleware; immutable for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    session: Session,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user_id(&self) -> UserId {
        self.session.user_id
    }

    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.session.organization_id
    }

    pub fn role(&self) -> Option<OrgRole> {
        self.session.effective_role()
    }
}
