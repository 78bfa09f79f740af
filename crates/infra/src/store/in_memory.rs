//! In-memory board store for tests/dev.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use pipeboard_core::ordering::{apply_stage_patches, claim_position};
use pipeboard_core::{
    Card, CardId, Client, ClientId, DomainError, OrganizationId, Pipeline, PipelineBoard, PipelineId, Stage,
    StageId, StagePatch,
};

use super::{BoardStore, CardChanges, CreatedCard, MovedCard, NewCard, NewStage, StoreError, StoreResult};

#[derive(Debug, Default)]
struct BoardState {
    pipelines: HashMap<PipelineId, Pipeline>,
    stages: HashMap<StageId, Stage>,
    cards: HashMap<CardId, Card>,
    clients: HashMap<ClientId, Client>,
}

impl BoardState {
    fn pipeline(&self, org: OrganizationId, id: PipelineId) -> StoreResult<&Pipeline> {
        self.pipelines
            .get(&id)
            .filter(|p| p.organization_id == org)
            .ok_or(StoreError::NotFound)
    }

    fn stages_of(&self, pipeline: PipelineId) -> Vec<Stage> {
        self.stages
            .values()
            .filter(|s| s.pipeline_id == pipeline)
            .cloned()
            .collect()
    }

    fn stage(&self, org: OrganizationId, pipeline: PipelineId, id: StageId) -> Option<&Stage> {
        self.stages
            .get(&id)
            .filter(|s| s.organization_id == org && s.pipeline_id == pipeline)
    }

    fn card_positions(&self, stage: StageId, except: Option<CardId>) -> Vec<i64> {
        self.cards
            .values()
            .filter(|c| c.stage_id == stage && Some(c.id) != except)
            .map(|c| c.position)
            .collect()
    }

    fn card_mut(&mut self, org: OrganizationId, pipeline: PipelineId, id: CardId) -> StoreResult<&mut Card> {
        self.cards
            .get_mut(&id)
            .filter(|c| c.organization_id == org && c.pipeline_id == pipeline)
            .ok_or(StoreError::NotFound)
    }
}

/// Board store holding everything behind one lock.
///
/// Every mutation runs under a single write guard and every read under a read
/// guard, so readers observe either the state before a mutation or after it,
/// never a partial bulk reorder.
#[derive(Debug, Default)]
pub struct InMemoryBoardStore {
    inner: RwLock<BoardState>,
}

impl InMemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BoardState>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("board state lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BoardState>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("board state lock poisoned".to_string()))
    }
}

#[async_trait]
impl BoardStore for InMemoryBoardStore {
    async fn list_pipelines(&self, org: OrganizationId) -> StoreResult<Vec<Pipeline>> {
        let state = self.read()?;
        let mut pipelines: Vec<Pipeline> = state
            .pipelines
            .values()
            .filter(|p| p.organization_id == org)
            .cloned()
            .collect();
        pipelines.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(pipelines)
    }

    async fn create_pipeline(&self, org: OrganizationId, name: String) -> StoreResult<Pipeline> {
        let pipeline = Pipeline::new(org, name);
        self.write()?.pipelines.insert(pipeline.id, pipeline.clone());
        Ok(pipeline)
    }

    async fn load_board(&self, org: OrganizationId, pipeline: PipelineId) -> StoreResult<Option<PipelineBoard>> {
        let state = self.read()?;
        let Ok(found) = state.pipeline(org, pipeline) else {
            return Ok(None);
        };
        let cards = state
            .cards
            .values()
            .filter(|c| c.pipeline_id == pipeline)
            .cloned()
            .collect();
        Ok(Some(PipelineBoard::assemble(found.clone(), state.stages_of(pipeline), cards)))
    }

    async fn rename_pipeline(&self, org: OrganizationId, pipeline: PipelineId, name: String) -> StoreResult<Pipeline> {
        let mut state = self.write()?;
        state.pipeline(org, pipeline)?;
        let entry = state.pipelines.get_mut(&pipeline).ok_or(StoreError::NotFound)?;
        entry.name = name;
        Ok(entry.clone())
    }

    async fn delete_pipeline(&self, org: OrganizationId, pipeline: PipelineId) -> StoreResult<()> {
        let mut state = self.write()?;
        state.pipeline(org, pipeline)?;
        state.pipelines.remove(&pipeline);
        state.stages.retain(|_, s| s.pipeline_id != pipeline);
        state.cards.retain(|_, c| c.pipeline_id != pipeline);
        Ok(())
    }

    async fn create_stage(&self, org: OrganizationId, pipeline: PipelineId, stage: NewStage) -> StoreResult<Stage> {
        let mut state = self.write()?;
        state.pipeline(org, pipeline)?;
        // Max is read under the same guard that inserts, so concurrent appends
        // cannot compute the same position.
        let siblings = state.stages_of(pipeline).into_iter().map(|s| s.position);
        let position = claim_position(siblings, stage.position)?;
        let created = Stage::new(org, pipeline, stage.name, position, stage.color);
        state.stages.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_stages(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        patches: &[StagePatch],
    ) -> StoreResult<Vec<Stage>> {
        let mut state = self.write()?;
        state.pipeline(org, pipeline)?;
        let next = apply_stage_patches(&state.stages_of(pipeline), patches)?;
        for stage in &next {
            state.stages.insert(stage.id, stage.clone());
        }
        Ok(next)
    }

    async fn delete_stage(&self, org: OrganizationId, pipeline: PipelineId, stage: StageId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.stage(org, pipeline, stage).is_none() {
            return Err(StoreError::NotFound);
        }
        state.stages.remove(&stage);
        state.cards.retain(|_, c| c.stage_id != stage);
        Ok(())
    }

    async fn create_card(&self, org: OrganizationId, pipeline: PipelineId, card: NewCard) -> StoreResult<CreatedCard> {
        let mut state = self.write()?;
        state.pipeline(org, pipeline)?;
        if state.stage(org, pipeline, card.stage_id).is_none() {
            return Err(DomainError::validation("stageId does not belong to this pipeline").into());
        }
        let position = claim_position(state.card_positions(card.stage_id, None), card.position)?;

        let (client_id, client) = match card.client_id {
            Some(id) => {
                if !state.clients.get(&id).is_some_and(|c| c.organization_id == org) {
                    return Err(DomainError::validation("clientId does not exist").into());
                }
                (id, None)
            }
            None => {
                let client = Client::placeholder(org, card.client_name.unwrap_or_else(|| card.title.clone()));
                (client.id, Some(client))
            }
        };

        let now = Utc::now();
        let created = Card {
            id: CardId::new(),
            organization_id: org,
            pipeline_id: pipeline,
            stage_id: card.stage_id,
            client_id,
            title: card.title,
            value: card.value,
            metadata: card.metadata,
            position,
            created_at: now,
            updated_at: now,
        };

        if let Some(client) = &client {
            state.clients.insert(client.id, client.clone());
        }
        state.cards.insert(created.id, created.clone());
        Ok(CreatedCard { card: created, client })
    }

    async fn update_card(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        card: CardId,
        changes: CardChanges,
    ) -> StoreResult<Card> {
        let mut state = self.write()?;
        if let Some(client_id) = changes.client_id {
            if !state.clients.get(&client_id).is_some_and(|c| c.organization_id == org) {
                return Err(DomainError::validation("clientId does not exist").into());
            }
        }
        let entry = state.card_mut(org, pipeline, card)?;
        if let Some(title) = changes.title {
            entry.title = title;
        }
        if let Some(value) = changes.value {
            entry.value = value;
        }
        if let Some(metadata) = changes.metadata {
            entry.metadata = metadata;
        }
        if let Some(client_id) = changes.client_id {
            entry.client_id = client_id;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn move_card(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        card: CardId,
        to_stage: StageId,
        position: Option<i64>,
    ) -> StoreResult<MovedCard> {
        let mut state = self.write()?;
        if state.stage(org, pipeline, to_stage).is_none() {
            return Err(DomainError::validation("stageId does not belong to this pipeline").into());
        }
        let siblings = state.card_positions(to_stage, Some(card));
        let position = claim_position(siblings, position)?;

        let entry = state.card_mut(org, pipeline, card)?;
        let from_stage_id = entry.stage_id;
        entry.stage_id = to_stage;
        entry.position = position;
        entry.updated_at = Utc::now();
        Ok(MovedCard {
            card: entry.clone(),
            from_stage_id,
        })
    }

    async fn delete_card(&self, org: OrganizationId, pipeline: PipelineId, card: CardId) -> StoreResult<()> {
        let mut state = self.write()?;
        state.card_mut(org, pipeline, card)?;
        state.cards.remove(&card);
        Ok(())
    }

    async fn get_client(&self, org: OrganizationId, client: ClientId) -> StoreResult<Option<Client>> {
        let state = self.read()?;
        Ok(state.clients.get(&client).filter(|c| c.organization_id == org).cloned())
    }
}
