//! Transactional board storage.
//!
//! The store is the sole authority for pipeline/stage/card data races: every
//! method is one transaction, scoped by the caller's organization. Rows that
//! belong to another organization are indistinguishable from missing rows.

mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pipeboard_core::{
    Card, CardId, Client, ClientId, DomainError, OrganizationId, Pipeline, PipelineBoard, PipelineId, Stage,
    StageId, StagePatch,
};

pub use in_memory::InMemoryBoardStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBoardStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Missing, or owned by another organization.
    #[error("not found")]
    NotFound,

    /// The write was rejected before anything was committed.
    #[error(transparent)]
    Rejected(DomainError),

    /// Unexpected backend failure; the transaction was rolled back.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound => StoreError::NotFound,
            other => StoreError::Rejected(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewStage {
    pub name: String,
    /// `None` appends after the current last stage.
    pub position: Option<i64>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub stage_id: StageId,
    /// `None` creates a placeholder client in the same transaction.
    pub client_id: Option<ClientId>,
    /// Name for the placeholder client; defaults to the card title.
    pub client_name: Option<String>,
    pub title: String,
    pub value: f64,
    pub metadata: serde_json::Value,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardChanges {
    pub title: Option<String>,
    pub value: Option<f64>,
    pub metadata: Option<serde_json::Value>,
    pub client_id: Option<ClientId>,
}

impl CardChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.value.is_none() && self.metadata.is_none() && self.client_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCard {
    pub card: Card,
    /// Set when the client was created implicitly for this card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovedCard {
    pub card: Card,
    pub from_stage_id: StageId,
}

/// Durable CRUD collaborator consumed by the mutation gateway.
#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn list_pipelines(&self, org: OrganizationId) -> StoreResult<Vec<Pipeline>>;

    async fn create_pipeline(&self, org: OrganizationId, name: String) -> StoreResult<Pipeline>;

    /// Pipeline plus stages and cards in read order.
    async fn load_board(&self, org: OrganizationId, pipeline: PipelineId) -> StoreResult<Option<PipelineBoard>>;

    async fn rename_pipeline(&self, org: OrganizationId, pipeline: PipelineId, name: String) -> StoreResult<Pipeline>;

    /// Deletes the pipeline with its stages and cards.
    async fn delete_pipeline(&self, org: OrganizationId, pipeline: PipelineId) -> StoreResult<()>;

    async fn create_stage(&self, org: OrganizationId, pipeline: PipelineId, stage: NewStage) -> StoreResult<Stage>;

    /// Applies all patches atomically and returns the full collection.
    async fn update_stages(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        patches: &[StagePatch],
    ) -> StoreResult<Vec<Stage>>;

    /// Deletes the stage and the cards it holds.
    async fn delete_stage(&self, org: OrganizationId, pipeline: PipelineId, stage: StageId) -> StoreResult<()>;

    async fn create_card(&self, org: OrganizationId, pipeline: PipelineId, card: NewCard) -> StoreResult<CreatedCard>;

    async fn update_card(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        card: CardId,
        changes: CardChanges,
    ) -> StoreResult<Card>;

    async fn move_card(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        card: CardId,
        to_stage: StageId,
        position: Option<i64>,
    ) -> StoreResult<MovedCard>;

    async fn delete_card(&self, org: OrganizationId, pipeline: PipelineId, card: CardId) -> StoreResult<()>;

    async fn get_client(&self, org: OrganizationId, client: ClientId) -> StoreResult<Option<Client>>;
}

#[async_trait]
impl<S> BoardStore for Arc<S>
where
    S: BoardStore + ?Sized,
{
    async fn list_pipelines(&self, org: OrganizationId) -> StoreResult<Vec<Pipeline>> {
        (**self).list_pipelines(org).await
    }

    async fn create_pipeline(&self, org: OrganizationId, name: String) -> StoreResult<Pipeline> {
        (**self).create_pipeline(org, name).await
    }

    async fn load_board(&self, org: OrganizationId, pipeline: PipelineId) -> StoreResult<Option<PipelineBoard>> {
        (**self).load_board(org, pipeline).await
    }

    async fn rename_pipeline(&self, org: OrganizationId, pipeline: PipelineId, name: String) -> StoreResult<Pipeline> {
        (**self).rename_pipeline(org, pipeline, name).await
    }

    async fn delete_pipeline(&self, org: OrganizationId, pipeline: PipelineId) -> StoreResult<()> {
        (**self).delete_pipeline(org, pipeline).await
    }

    async fn create_stage(&self, org: OrganizationId, pipeline: PipelineId, stage: NewStage) -> StoreResult<Stage> {
        (**self).create_stage(org, pipeline, stage).await
    }

    async fn update_stages(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        patches: &[StagePatch],
    ) -> StoreResult<Vec<Stage>> {
        (**self).update_stages(org, pipeline, patches).await
    }

    async fn delete_stage(&self, org: OrganizationId, pipeline: PipelineId, stage: StageId) -> StoreResult<()> {
        (**self).delete_stage(org, pipeline, stage).await
    }

    async fn create_card(&self, org: OrganizationId, pipeline: PipelineId, card: NewCard) -> StoreResult<CreatedCard> {
        (**self).create_card(org, pipeline, card).await
    }

    async fn update_card(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        card: CardId,
        changes: CardChanges,
    ) -> StoreResult<Card> {
        (**self).update_card(org, pipeline, card, changes).await
    }

    async fn move_card(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        card: CardId,
        to_stage: StageId,
        position: Option<i64>,
    ) -> StoreResult<MovedCard> {
        (**self).move_card(org, pipeline, card, to_stage, position).await
    }

    async fn delete_card(&self, org: OrganizationId, pipeline: PipelineId, card: CardId) -> StoreResult<()> {
        (**self).delete_card(org, pipeline, card).await
    }

    async fn get_client(&self, org: OrganizationId, client: ClientId) -> StoreResult<Option<Client>> {
        (**self).get_client(org, client).await
    }
}
