use pipeboard_core::OrganizationId;

use crate::PipelineEvent;

/// Messages that belong to exactly one organization.
///
/// The organization id is the bus topic: a message is only ever delivered to
/// subscribers of the organization it names, so routing cannot be pointed at
/// another tenant by the publisher.
pub trait OrganizationScoped {
    fn organization_id(&self) -> OrganizationId;
}

impl OrganizationScoped for PipelineEvent {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}
