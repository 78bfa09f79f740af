use serde::{Deserialize, Serialize};

use pipeboard_core::{OrganizationId, UserId};

use crate::OrgRole;

/// Resolved caller identity, as supplied by the session provider.
///
/// Read-only input to the board: nothing here is mutated by pipeline
/// operations. A session may exist without an organization (e.g. a user who
/// has not joined one yet); such sessions cannot reach organization data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub role: Option<OrgRole>,
}

impl Session {
    pub fn new(user_id: UserId, organization_id: Option<OrganizationId>, role: Option<OrgRole>) -> Self {
        Self {
            user_id,
            organization_id,
            role,
        }
    }

    /// Convenience for a session bound to an organization.
    pub fn member_of(organization_id: OrganizationId, role: OrgRole) -> Self {
        Self::new(UserId::new(), Some(organization_id), Some(role))
    }

    /// Role used for authorization. Being bound to an organization without an
    /// explicit role means plain membership.
    pub fn effective_role(&self) -> Option<OrgRole> {
        self.organization_id.map(|_| self.role.unwrap_or(OrgRole::Member))
    }
}
