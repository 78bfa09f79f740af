//! Board entities: pipelines, stages, cards and clients.
//!
//! These are plain data records. Persistence is owned by the store; the only
//! behavior here is construction and the ordering hooks used by [`crate::ordering`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::{CardId, ClientId, OrganizationId, PipelineId, StageId};
use crate::ordering::{self, Positioned};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: PipelineId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(organization_id: OrganizationId, name: impl Into<String>) -> Self {
        Self {
            id: PipelineId::new(),
            organization_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// An ordered column of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: StageId,
    pub organization_id: OrganizationId,
    pub pipeline_id: PipelineId,
    pub name: String,
    pub position: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Stage {
    pub fn new(
        organization_id: OrganizationId,
        pipeline_id: PipelineId,
        name: impl Into<String>,
        position: i64,
        color: Option<String>,
    ) -> Self {
        Self {
            id: StageId::new(),
            organization_id,
            pipeline_id,
            name: name.into(),
            position,
            color,
            created_at: Utc::now(),
        }
    }
}

impl Positioned for Stage {
    fn position(&self) -> i64 {
        self.position
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn tiebreak(&self) -> Uuid {
        *self.id.as_uuid()
    }
}

/// A deal placed in exactly one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub organization_id: OrganizationId,
    pub pipeline_id: PipelineId,
    pub stage_id: StageId,
    pub client_id: ClientId,
    pub title: String,
    pub value: f64,
    pub metadata: serde_json::Value,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Positioned for Card {
    fn position(&self) -> i64 {
        self.position
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn tiebreak(&self) -> Uuid {
        *self.id.as_uuid()
    }
}

/// Contact / counterpart of a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Client created implicitly for a card that named none.
    ///
    /// The email is synthesized from the client id so it is unique and never
    /// routable.
    pub fn placeholder(organization_id: OrganizationId, name: impl Into<String>) -> Self {
        let id = ClientId::new();
        Self {
            email: format!("client-{}@placeholder.invalid", id.as_uuid().simple()),
            id,
            organization_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Read view of one pipeline: the pipeline plus its ordered stages and cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineBoard {
    #[serde(flatten)]
    pub pipeline: Pipeline,
    pub stages: Vec<Stage>,
    pub cards: Vec<Card>,
}

impl PipelineBoard {
    /// Assemble a board, sorting stages and cards into display order.
    pub fn assemble(pipeline: Pipeline, mut stages: Vec<Stage>, mut cards: Vec<Card>) -> Self {
        ordering::sort_by_position(&mut stages);
        let stage_rank = |id: StageId| stages.iter().position(|s| s.id == id).unwrap_or(usize::MAX);
        cards.sort_by(|a, b| {
            stage_rank(a.stage_id)
                .cmp(&stage_rank(b.stage_id))
                .then_with(|| ordering::compare(a, b))
        });
        Self {
            pipeline,
            stages,
            cards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_client_has_synthesized_email() {
        let client = Client::placeholder(OrganizationId::new(), "Acme");
        assert!(!client.email.is_empty());
        assert!(client.email.contains(&client.id.as_uuid().simple().to_string()));
        assert!(client.email.ends_with("@placeholder.invalid"));
    }

    #[test]
    fn assemble_orders_cards_by_stage_then_position() {
        let org = OrganizationId::new();
        let pipeline = Pipeline::new(org, "Sales");
        let late = Stage::new(org, pipeline.id, "Won", 2000, None);
        let early = Stage::new(org, pipeline.id, "Lead", 1000, None);
        let client = ClientId::new();
        let card = |stage: &Stage, title: &str, position: i64| Card {
            id: CardId::new(),
            organization_id: org,
            pipeline_id: pipeline.id,
            stage_id: stage.id,
            client_id: client,
            title: title.to_string(),
            value: 0.0,
            metadata: serde_json::Value::Null,
            position,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let cards = vec![card(&late, "c", 1000), card(&early, "b", 2000), card(&early, "a", 1000)];

        let board = PipelineBoard::assemble(pipeline, vec![late.clone(), early.clone()], cards);

        assert_eq!(board.stages[0].id, early.id);
        let titles: Vec<_> = board.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }
}
