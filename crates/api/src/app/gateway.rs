//! Mutation gateway: the only path by which board data changes.
//!
//! Every mutating operation runs the same pipeline:
//!
//! ```text
//! authorize (role gate) → validate → BoardStore (commit) → EventBus::publish → return
//! ```
//!
//! Nothing is published unless the write committed. A publish failure is logged
//! and swallowed: the event is a notification, the commit already happened.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use pipeboard_auth::permissions::{CARDS_WRITE, PIPELINE_MANAGE, PIPELINE_READ};
use pipeboard_auth::{authorize, Session};
use pipeboard_core::{Card, CardId, Pipeline, PipelineBoard, PipelineId, Stage, StageId, StagePatch};
use pipeboard_events::{EventBus, PipelineEvent};
use pipeboard_infra::{BoardStore, CardChanges, CreatedCard, NewCard, NewStage};

use crate::app::dto::{CreateCardRequest, CreateStageRequest, MoveCardRequest, PipelineNameRequest, UpdateCardRequest};
use crate::app::errors::{ApiError, ApiResult};

#[derive(Clone)]
pub struct MutationGateway {
    store: Arc<dyn BoardStore>,
    bus: Arc<dyn EventBus<PipelineEvent>>,
}

impl MutationGateway {
    pub fn new(store: Arc<dyn BoardStore>, bus: Arc<dyn EventBus<PipelineEvent>>) -> Self {
        Self { store, bus }
    }

    fn publish(&self, event: PipelineEvent) {
        let event_type = event.event_type;
        let organization_id = event.organization_id;
        if let Err(e) = self.bus.publish(event) {
            tracing::warn!(%organization_id, %event_type, error = %e, "event publish failed; mutation kept");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pipelines
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn list_pipelines(&self, session: &Session) -> ApiResult<Vec<Pipeline>> {
        let org = authorize(session, &PIPELINE_READ)?;
        Ok(self.store.list_pipelines(org).await?)
    }

    pub async fn get_board(&self, session: &Session, pipeline: PipelineId) -> ApiResult<PipelineBoard> {
        let org = authorize(session, &PIPELINE_READ)?;
        self.store.load_board(org, pipeline).await?.ok_or(ApiError::NotFound)
    }

    pub async fn create_pipeline(&self, session: &Session, req: PipelineNameRequest) -> ApiResult<Pipeline> {
        let org = authorize(session, &PIPELINE_MANAGE)?;
        let name = required_text(req.name, "name")?;

        let pipeline = self.store.create_pipeline(org, name).await?;
        self.publish(PipelineEvent::pipeline_updated(&pipeline));
        Ok(pipeline)
    }

    pub async fn rename_pipeline(
        &self,
        session: &Session,
        pipeline: PipelineId,
        req: PipelineNameRequest,
    ) -> ApiResult<Pipeline> {
        let org = authorize(session, &PIPELINE_MANAGE)?;
        let name = required_text(req.name, "name")?;

        let pipeline = self.store.rename_pipeline(org, pipeline, name).await?;
        self.publish(PipelineEvent::pipeline_updated(&pipeline));
        Ok(pipeline)
    }

    pub async fn delete_pipeline(&self, session: &Session, pipeline: PipelineId) -> ApiResult<()> {
        let org = authorize(session, &PIPELINE_MANAGE)?;

        self.store.delete_pipeline(org, pipeline).await?;
        self.publish(PipelineEvent::pipeline_deleted(org, pipeline));
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stages
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_stage(
        &self,
        session: &Session,
        pipeline: PipelineId,
        req: CreateStageRequest,
    ) -> ApiResult<Stage> {
        let org = authorize(session, &PIPELINE_MANAGE)?;
        let stage = NewStage {
            name: required_text(req.name, "title")?,
            position: req.position,
            color: req.color,
        };

        let stage = self.store.create_stage(org, pipeline, stage).await?;
        self.publish(PipelineEvent::stage_created(&stage));
        Ok(stage)
    }

    /// Bulk reorder/rename. The event payload is the submitted array.
    pub async fn update_stages(
        &self,
        session: &Session,
        pipeline: PipelineId,
        patches: Vec<StagePatch>,
    ) -> ApiResult<Vec<Stage>> {
        let org = authorize(session, &PIPELINE_MANAGE)?;
        if patches.is_empty() {
            return Err(ApiError::bad_request("at least one stage update is required"));
        }

        let stages = self.store.update_stages(org, pipeline, &patches).await?;
        self.publish(PipelineEvent::stages_updated(org, &patches));
        Ok(stages)
    }

    pub async fn delete_stage(&self, session: &Session, pipeline: PipelineId, stage: StageId) -> ApiResult<()> {
        let org = authorize(session, &PIPELINE_MANAGE)?;

        self.store.delete_stage(org, pipeline, stage).await?;
        self.publish(PipelineEvent::stage_deleted(org, pipeline, stage));
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cards
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_card(
        &self,
        session: &Session,
        pipeline: PipelineId,
        req: CreateCardRequest,
    ) -> ApiResult<CreatedCard> {
        let org = authorize(session, &CARDS_WRITE)?;
        let stage_id = req.stage_id.ok_or_else(|| ApiError::bad_request("stageId is required"))?;
        let card = NewCard {
            stage_id,
            client_id: req.client_id,
            client_name: req.client_name.filter(|n| !n.trim().is_empty()),
            title: required_text(req.title, "title")?,
            value: finite_value(req.value)?.unwrap_or(0.0),
            metadata: req.metadata.unwrap_or_else(|| JsonValue::Object(Default::default())),
            position: req.position,
        };

        let created = self.store.create_card(org, pipeline, card).await?;
        self.publish(PipelineEvent::card_updated(&created.card));
        Ok(created)
    }

    pub async fn update_card(&self, session: &Session, pipeline: PipelineId, req: UpdateCardRequest) -> ApiResult<Card> {
        let org = authorize(session, &CARDS_WRITE)?;
        let card_id = req.id.ok_or_else(|| ApiError::bad_request("id is required"))?;
        let changes = CardChanges {
            title: req.title.map(|t| required_text(Some(t), "title")).transpose()?,
            value: finite_value(req.value)?,
            metadata: req.metadata,
            client_id: req.client_id,
        };
        if changes.is_empty() {
            return Err(ApiError::bad_request("no card fields to update"));
        }

        let card = self.store.update_card(org, pipeline, card_id, changes).await?;
        self.publish(PipelineEvent::card_updated(&card));
        Ok(card)
    }

    pub async fn move_card(
        &self,
        session: &Session,
        pipeline: PipelineId,
        card: CardId,
        req: MoveCardRequest,
    ) -> ApiResult<Card> {
        let org = authorize(session, &CARDS_WRITE)?;
        let stage_id = req.stage_id.ok_or_else(|| ApiError::bad_request("stageId is required"))?;

        let moved = self.store.move_card(org, pipeline, card, stage_id, req.position).await?;
        self.publish(PipelineEvent::card_moved(&moved.card, moved.from_stage_id));
        Ok(moved.card)
    }

    pub async fn delete_card(&self, session: &Session, pipeline: PipelineId, card: CardId) -> ApiResult<()> {
        let org = authorize(session, &CARDS_WRITE)?;

        self.store.delete_card(org, pipeline, card).await?;
        self.publish(PipelineEvent::card_deleted(org, pipeline, card));
        Ok(())
    }
}

fn required_text(value: Option<String>, field: &str) -> ApiResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("{field} is required"))),
    }
}

fn finite_value(value: Option<f64>) -> ApiResult<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() => Err(ApiError::bad_request("value must be a finite number")),
        other => Ok(other),
    }
}
