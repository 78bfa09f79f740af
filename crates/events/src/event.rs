//! The realtime board event (bus message and wire payload).

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use pipeboard_core::{Card, CardId, OrganizationId, Pipeline, PipelineId, Stage, StageId, StagePatch};

/// Closed set of board event types.
///
/// The serialized names are the wire names clients switch on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "pipeline:update")]
    PipelineUpdate,
    #[serde(rename = "stage:create")]
    StageCreate,
    #[serde(rename = "stage:update")]
    StageUpdate,
    #[serde(rename = "stage:delete")]
    StageDelete,
    /// Covers both card creation and card field updates.
    #[serde(rename = "card:update")]
    CardUpdate,
    #[serde(rename = "card:delete")]
    CardDelete,
    #[serde(rename = "card:move")]
    CardMove,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PipelineUpdate => "pipeline:update",
            EventType::StageCreate => "stage:create",
            EventType::StageUpdate => "stage:update",
            EventType::StageDelete => "stage:delete",
            EventType::CardUpdate => "card:update",
            EventType::CardDelete => "card:delete",
            EventType::CardMove => "card:move",
        }
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized notification that a committed mutation happened.
///
/// Built once after the durable write, published once, then dropped. Never
/// stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub organization_id: OrganizationId,
    pub payload: JsonValue,
}

impl PipelineEvent {
    pub fn new(event_type: EventType, organization_id: OrganizationId, payload: JsonValue) -> Self {
        Self {
            event_type,
            organization_id,
            payload,
        }
    }

    pub fn pipeline_updated(pipeline: &Pipeline) -> Self {
        Self::new(EventType::PipelineUpdate, pipeline.organization_id, json!(pipeline))
    }

    pub fn pipeline_deleted(organization_id: OrganizationId, pipeline_id: PipelineId) -> Self {
        Self::new(
            EventType::PipelineUpdate,
            organization_id,
            json!({ "id": pipeline_id, "deleted": true }),
        )
    }

    pub fn stage_created(stage: &Stage) -> Self {
        Self::new(EventType::StageCreate, stage.organization_id, json!(stage))
    }

    /// The payload is the submitted patch array, as the caller sent it.
    pub fn stages_updated(organization_id: OrganizationId, patches: &[StagePatch]) -> Self {
        Self::new(EventType::StageUpdate, organization_id, json!(patches))
    }

    pub fn stage_deleted(organization_id: OrganizationId, pipeline_id: PipelineId, stage_id: StageId) -> Self {
        Self::new(
            EventType::StageDelete,
            organization_id,
            json!({ "id": stage_id, "pipelineId": pipeline_id }),
        )
    }

    pub fn card_updated(card: &Card) -> Self {
        Self::new(EventType::CardUpdate, card.organization_id, json!(card))
    }

    pub fn card_deleted(organization_id: OrganizationId, pipeline_id: PipelineId, card_id: CardId) -> Self {
        Self::new(
            EventType::CardDelete,
            organization_id,
            json!({ "id": card_id, "pipelineId": pipeline_id }),
        )
    }

    pub fn card_moved(card: &Card, from_stage_id: StageId) -> Self {
        Self::new(
            EventType::CardMove,
            card.organization_id,
            json!({
                "id": card.id,
                "pipelineId": card.pipeline_id,
                "fromStageId": from_stage_id,
                "stageId": card.stage_id,
                "position": card.position,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_uses_type_and_organization_id() {
        let org = OrganizationId::new();
        let card_id = CardId::new();
        let pipeline_id = PipelineId::new();
        let event = PipelineEvent::card_deleted(org, pipeline_id, card_id);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "card:delete");
        assert_eq!(value["organizationId"], org.to_string());
        assert_eq!(value["payload"]["id"], card_id.to_string());
    }

    #[test]
    fn stage_update_payload_is_the_submitted_array() {
        let org = OrganizationId::new();
        let patches = vec![StagePatch {
            id: StageId::new(),
            position: Some(500),
            name: None,
            color: None,
        }];
        let event = PipelineEvent::stages_updated(org, &patches);

        assert_eq!(event.event_type, EventType::StageUpdate);
        let back: Vec<StagePatch> = serde_json::from_value(event.payload).unwrap();
        assert_eq!(back, patches);
    }

    #[test]
    fn pipeline_delete_is_flagged() {
        let event = PipelineEvent::pipeline_deleted(OrganizationId::new(), PipelineId::new());
        assert_eq!(event.event_type.as_str(), "pipeline:update");
        assert_eq!(event.payload["deleted"], true);
    }
}
