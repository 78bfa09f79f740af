//! Postgres-backed board store.
//!
//! ## Concurrency
//!
//! Every mutation runs in one transaction that first locks the pipeline row
//! (`SELECT ... FOR UPDATE`). Appends and reorders of the same pipeline are
//! therefore serialized, and `max + step` is always computed against committed
//! data.
//!
//! Stage and card positions carry `UNIQUE ... DEFERRABLE INITIALLY DEFERRED`
//! constraints, so a bulk reorder may pass through intermediate duplicates but
//! cannot commit one.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError |
//! |-----------------------|------------|
//! | `23505` (unique violation) | `Rejected(InvariantViolation)` |
//! | `23503` (foreign key violation) | `Rejected(Validation)` |
//! | anything else | `Backend` |

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use async_trait::async_trait;
use pipeboard_core::ordering::{apply_stage_patches, claim_position};
use pipeboard_core::{
    Card, CardId, Client, ClientId, DomainError, OrganizationId, Pipeline, PipelineBoard, PipelineId, Stage,
    StageId, StagePatch,
};

use super::{BoardStore, CardChanges, CreatedCard, MovedCard, NewCard, NewStage, StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pipelines (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS pipelines_organization_idx ON pipelines (organization_id);

CREATE TABLE IF NOT EXISTS stages (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    pipeline_id UUID NOT NULL REFERENCES pipelines (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    position BIGINT NOT NULL,
    color TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT stages_position_unique UNIQUE (pipeline_id, position) DEFERRABLE INITIALLY DEFERRED
);

CREATE TABLE IF NOT EXISTS clients (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS cards (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    pipeline_id UUID NOT NULL REFERENCES pipelines (id) ON DELETE CASCADE,
    stage_id UUID NOT NULL REFERENCES stages (id) ON DELETE CASCADE,
    client_id UUID NOT NULL REFERENCES clients (id),
    title TEXT NOT NULL,
    value DOUBLE PRECISION NOT NULL DEFAULT 0,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    position BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT cards_position_unique UNIQUE (stage_id, position) DEFERRABLE INITIALLY DEFERRED
);
"#;

/// Board store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PostgresBoardStore {
    pool: PgPool,
}

impl PostgresBoardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))
    }
}

async fn commit(tx: Transaction<'static, Postgres>, operation: &str) -> StoreResult<()> {
    // Deferred position constraints are checked here.
    tx.commit().await.map_err(|e| map_sqlx_error(operation, e))
}

/// Lock the pipeline row for the rest of the transaction.
async fn lock_pipeline(
    tx: &mut Transaction<'static, Postgres>,
    org: OrganizationId,
    pipeline: PipelineId,
) -> StoreResult<Pipeline> {
    let row = sqlx::query(
        r#"
        SELECT id, organization_id, name, created_at
        FROM pipelines
        WHERE id = $1 AND organization_id = $2
        FOR UPDATE
        "#,
    )
    .bind(*pipeline.as_uuid())
    .bind(*org.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_pipeline", e))?;

    row.as_ref().map(pipeline_from_row).transpose()?.ok_or(StoreError::NotFound)
}

async fn fetch_stages(tx: &mut Transaction<'static, Postgres>, pipeline: PipelineId) -> StoreResult<Vec<Stage>> {
    let rows = sqlx::query(
        r#"
        SELECT id, organization_id, pipeline_id, name, position, color, created_at
        FROM stages
        WHERE pipeline_id = $1
        ORDER BY position, created_at, id
        "#,
    )
    .bind(*pipeline.as_uuid())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("fetch_stages", e))?;

    rows.iter().map(stage_from_row).collect()
}

async fn stage_in_pipeline(
    tx: &mut Transaction<'static, Postgres>,
    org: OrganizationId,
    pipeline: PipelineId,
    stage: StageId,
) -> StoreResult<bool> {
    let row = sqlx::query("SELECT 1 FROM stages WHERE id = $1 AND pipeline_id = $2 AND organization_id = $3")
        .bind(*stage.as_uuid())
        .bind(*pipeline.as_uuid())
        .bind(*org.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("stage_in_pipeline", e))?;
    Ok(row.is_some())
}

async fn card_positions(
    tx: &mut Transaction<'static, Postgres>,
    stage: StageId,
    except: Option<CardId>,
) -> StoreResult<Vec<i64>> {
    let rows = sqlx::query("SELECT position FROM cards WHERE stage_id = $1 AND ($2::uuid IS NULL OR id <> $2)")
        .bind(*stage.as_uuid())
        .bind(except.map(|id| *id.as_uuid()))
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("card_positions", e))?;

    rows.iter()
        .map(|row| row.try_get::<i64, _>("position").map_err(|e| map_sqlx_error("card_positions", e)))
        .collect()
}

async fn client_exists(
    tx: &mut Transaction<'static, Postgres>,
    org: OrganizationId,
    client: ClientId,
) -> StoreResult<bool> {
    let row = sqlx::query("SELECT 1 FROM clients WHERE id = $1 AND organization_id = $2")
        .bind(*client.as_uuid())
        .bind(*org.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("client_exists", e))?;
    Ok(row.is_some())
}

const CARD_COLUMNS: &str = "id, organization_id, pipeline_id, stage_id, client_id, title, value, metadata, position, created_at, updated_at";

#[async_trait]
impl BoardStore for PostgresBoardStore {
    #[instrument(skip(self), fields(organization_id = %org))]
    async fn list_pipelines(&self, org: OrganizationId) -> StoreResult<Vec<Pipeline>> {
        let rows = sqlx::query(
            r#"
            SELECT id, organization_id, name, created_at
            FROM pipelines
            WHERE organization_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(*org.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_pipelines", e))?;

        rows.iter().map(pipeline_from_row).collect()
    }

    #[instrument(skip(self, name), fields(organization_id = %org))]
    async fn create_pipeline(&self, org: OrganizationId, name: String) -> StoreResult<Pipeline> {
        let pipeline = Pipeline::new(org, name);
        sqlx::query("INSERT INTO pipelines (id, organization_id, name, created_at) VALUES ($1, $2, $3, $4)")
            .bind(*pipeline.id.as_uuid())
            .bind(*org.as_uuid())
            .bind(&pipeline.name)
            .bind(pipeline.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_pipeline", e))?;
        Ok(pipeline)
    }

    #[instrument(skip(self), fields(organization_id = %org, pipeline_id = %pipeline))]
    async fn load_board(&self, org: OrganizationId, pipeline: PipelineId) -> StoreResult<Option<PipelineBoard>> {
        // REPEATABLE READ gives one snapshot for the three reads.
        let mut tx = self.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("load_board", e))?;

        let row = sqlx::query("SELECT id, organization_id, name, created_at FROM pipelines WHERE id = $1 AND organization_id = $2")
            .bind(*pipeline.as_uuid())
            .bind(*org.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("load_board", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let found = pipeline_from_row(&row)?;
        let stages = fetch_stages(&mut tx, pipeline).await?;

        let card_rows = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE pipeline_id = $1"))
            .bind(*pipeline.as_uuid())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("load_board", e))?;
        let cards = card_rows.iter().map(card_from_row).collect::<StoreResult<Vec<_>>>()?;

        commit(tx, "load_board").await?;
        Ok(Some(PipelineBoard::assemble(found, stages, cards)))
    }

    #[instrument(skip(self, name), fields(organization_id = %org, pipeline_id = %pipeline))]
    async fn rename_pipeline(&self, org: OrganizationId, pipeline: PipelineId, name: String) -> StoreResult<Pipeline> {
        let mut tx = self.begin().await?;
        let mut current = lock_pipeline(&mut tx, org, pipeline).await?;
        sqlx::query("UPDATE pipelines SET name = $1 WHERE id = $2")
            .bind(&name)
            .bind(*pipeline.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("rename_pipeline", e))?;
        commit(tx, "rename_pipeline").await?;
        current.name = name;
        Ok(current)
    }

    #[instrument(skip(self), fields(organization_id = %org, pipeline_id = %pipeline))]
    async fn delete_pipeline(&self, org: OrganizationId, pipeline: PipelineId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM pipelines WHERE id = $1 AND organization_id = $2")
            .bind(*pipeline.as_uuid())
            .bind(*org.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_pipeline", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, stage), fields(organization_id = %org, pipeline_id = %pipeline))]
    async fn create_stage(&self, org: OrganizationId, pipeline: PipelineId, stage: NewStage) -> StoreResult<Stage> {
        let mut tx = self.begin().await?;
        lock_pipeline(&mut tx, org, pipeline).await?;
        let siblings = fetch_stages(&mut tx, pipeline).await?;
        let position = claim_position(siblings.iter().map(|s| s.position), stage.position)?;
        let created = Stage::new(org, pipeline, stage.name, position, stage.color);

        sqlx::query(
            r#"
            INSERT INTO stages (id, organization_id, pipeline_id, name, position, color, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*created.id.as_uuid())
        .bind(*org.as_uuid())
        .bind(*pipeline.as_uuid())
        .bind(&created.name)
        .bind(created.position)
        .bind(created.color.as_deref())
        .bind(created.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_stage", e))?;

        commit(tx, "create_stage").await?;
        Ok(created)
    }

    #[instrument(skip(self, patches), fields(organization_id = %org, pipeline_id = %pipeline, patches = patches.len()))]
    async fn update_stages(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        patches: &[StagePatch],
    ) -> StoreResult<Vec<Stage>> {
        let mut tx = self.begin().await?;
        lock_pipeline(&mut tx, org, pipeline).await?;
        let current = fetch_stages(&mut tx, pipeline).await?;
        // Validation failure drops `tx`, which rolls back.
        let next = apply_stage_patches(&current, patches)?;

        for stage in next.iter().filter(|s| !current.contains(s)) {
            sqlx::query("UPDATE stages SET name = $1, position = $2, color = $3 WHERE id = $4")
                .bind(&stage.name)
                .bind(stage.position)
                .bind(stage.color.as_deref())
                .bind(*stage.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_stages", e))?;
        }

        commit(tx, "update_stages").await?;
        Ok(next)
    }

    #[instrument(skip(self), fields(organization_id = %org, pipeline_id = %pipeline, stage_id = %stage))]
    async fn delete_stage(&self, org: OrganizationId, pipeline: PipelineId, stage: StageId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        lock_pipeline(&mut tx, org, pipeline).await?;
        let result = sqlx::query("DELETE FROM stages WHERE id = $1 AND pipeline_id = $2")
            .bind(*stage.as_uuid())
            .bind(*pipeline.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_stage", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        commit(tx, "delete_stage").await
    }

    #[instrument(skip(self, card), fields(organization_id = %org, pipeline_id = %pipeline))]
    async fn create_card(&self, org: OrganizationId, pipeline: PipelineId, card: NewCard) -> StoreResult<CreatedCard> {
        let mut tx = self.begin().await?;
        lock_pipeline(&mut tx, org, pipeline).await?;
        if !stage_in_pipeline(&mut tx, org, pipeline, card.stage_id).await? {
            return Err(DomainError::validation("stageId does not belong to this pipeline").into());
        }
        let siblings = card_positions(&mut tx, card.stage_id, None).await?;
        let position = claim_position(siblings, card.position)?;

        let (client_id, client) = match card.client_id {
            Some(id) => {
                if !client_exists(&mut tx, org, id).await? {
                    return Err(DomainError::validation("clientId does not exist").into());
                }
                (id, None)
            }
            None => {
                let client = Client::placeholder(org, card.client_name.unwrap_or_else(|| card.title.clone()));
                sqlx::query("INSERT INTO clients (id, organization_id, name, email, created_at) VALUES ($1, $2, $3, $4, $5)")
                    .bind(*client.id.as_uuid())
                    .bind(*org.as_uuid())
                    .bind(&client.name)
                    .bind(&client.email)
                    .bind(client.created_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("create_card", e))?;
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

        sqlx::query(&format!(
            "INSERT INTO cards ({CARD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(*created.id.as_uuid())
        .bind(*org.as_uuid())
        .bind(*pipeline.as_uuid())
        .bind(*created.stage_id.as_uuid())
        .bind(*created.client_id.as_uuid())
        .bind(&created.title)
        .bind(created.value)
        .bind(&created.metadata)
        .bind(created.position)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_card", e))?;

        commit(tx, "create_card").await?;
        Ok(CreatedCard { card: created, client })
    }

    #[instrument(skip(self, changes), fields(organization_id = %org, pipeline_id = %pipeline, card_id = %card))]
    async fn update_card(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        card: CardId,
        changes: CardChanges,
    ) -> StoreResult<Card> {
        let mut tx = self.begin().await?;
        if let Some(client_id) = changes.client_id {
            if !client_exists(&mut tx, org, client_id).await? {
                return Err(DomainError::validation("clientId does not exist").into());
            }
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE cards SET
                title = COALESCE($1, title),
                value = COALESCE($2, value),
                metadata = COALESCE($3, metadata),
                client_id = COALESCE($4, client_id),
                updated_at = NOW()
            WHERE id = $5 AND pipeline_id = $6 AND organization_id = $7
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(changes.title)
        .bind(changes.value)
        .bind(changes.metadata)
        .bind(changes.client_id.map(|id| *id.as_uuid()))
        .bind(*card.as_uuid())
        .bind(*pipeline.as_uuid())
        .bind(*org.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_card", e))?;

        let updated = row.as_ref().map(card_from_row).transpose()?.ok_or(StoreError::NotFound)?;
        commit(tx, "update_card").await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(organization_id = %org, pipeline_id = %pipeline, card_id = %card))]
    async fn move_card(
        &self,
        org: OrganizationId,
        pipeline: PipelineId,
        card: CardId,
        to_stage: StageId,
        position: Option<i64>,
    ) -> StoreResult<MovedCard> {
        let mut tx = self.begin().await?;
        lock_pipeline(&mut tx, org, pipeline).await?;
        if !stage_in_pipeline(&mut tx, org, pipeline, to_stage).await? {
            return Err(DomainError::validation("stageId does not belong to this pipeline").into());
        }

        let from = sqlx::query("SELECT stage_id FROM cards WHERE id = $1 AND pipeline_id = $2 AND organization_id = $3")
            .bind(*card.as_uuid())
            .bind(*pipeline.as_uuid())
            .bind(*org.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("move_card", e))?
            .ok_or(StoreError::NotFound)?;
        let from_stage_id = StageId::from_uuid(from.try_get::<Uuid, _>("stage_id").map_err(|e| map_sqlx_error("move_card", e))?);

        let siblings = card_positions(&mut tx, to_stage, Some(card)).await?;
        let position = claim_position(siblings, position)?;

        let row = sqlx::query(&format!(
            "UPDATE cards SET stage_id = $1, position = $2, updated_at = NOW() WHERE id = $3 RETURNING {CARD_COLUMNS}"
        ))
        .bind(*to_stage.as_uuid())
        .bind(position)
        .bind(*card.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("move_card", e))?;
        let moved = card_from_row(&row)?;

        commit(tx, "move_card").await?;
        Ok(MovedCard {
            card: moved,
            from_stage_id,
        })
    }

    #[instrument(skip(self), fields(organization_id = %org, pipeline_id = %pipeline, card_id = %card))]
    async fn delete_card(&self, org: OrganizationId, pipeline: PipelineId, card: CardId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1 AND pipeline_id = $2 AND organization_id = $3")
            .bind(*card.as_uuid())
            .bind(*pipeline.as_uuid())
            .bind(*org.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_card", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(organization_id = %org, client_id = %client))]
    async fn get_client(&self, org: OrganizationId, client: ClientId) -> StoreResult<Option<Client>> {
        let row = sqlx::query("SELECT id, organization_id, name, email, created_at FROM clients WHERE id = $1 AND organization_id = $2")
            .bind(*client.as_uuid())
            .bind(*org.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_client", e))?;
        row.as_ref().map(client_from_row).transpose()
    }
}

// Row mapping

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|e| map_sqlx_error("decode", e))
}

fn pipeline_from_row(row: &PgRow) -> StoreResult<Pipeline> {
    Ok(Pipeline {
        id: PipelineId::from_uuid(column(row, "id")?),
        organization_id: OrganizationId::from_uuid(column(row, "organization_id")?),
        name: column(row, "name")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn stage_from_row(row: &PgRow) -> StoreResult<Stage> {
    Ok(Stage {
        id: StageId::from_uuid(column(row, "id")?),
        organization_id: OrganizationId::from_uuid(column(row, "organization_id")?),
        pipeline_id: PipelineId::from_uuid(column(row, "pipeline_id")?),
        name: column(row, "name")?,
        position: column(row, "position")?,
        color: column(row, "color")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn card_from_row(row: &PgRow) -> StoreResult<Card> {
    Ok(Card {
        id: CardId::from_uuid(column(row, "id")?),
        organization_id: OrganizationId::from_uuid(column(row, "organization_id")?),
        pipeline_id: PipelineId::from_uuid(column(row, "pipeline_id")?),
        stage_id: StageId::from_uuid(column(row, "stage_id")?),
        client_id: ClientId::from_uuid(column(row, "client_id")?),
        title: column(row, "title")?,
        value: column(row, "value")?,
        metadata: column(row, "metadata")?,
        position: column(row, "position")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
        updated_at: column::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn client_from_row(row: &PgRow) -> StoreResult<Client> {
    Ok(Client {
        id: ClientId::from_uuid(column(row, "id")?),
        organization_id: OrganizationId::from_uuid(column(row, "organization_id")?),
        name: column(row, "name")?,
        email: column(row, "email")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = format!("{operation}: {}", db_err.message());
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::Rejected(DomainError::invariant(msg)),
            Some("23503") => return StoreError::Rejected(DomainError::validation(msg)),
            _ => {}
        }
    }
    tracing::error!(operation, error = %err, "store backend error");
    StoreError::Backend(format!("{operation}: {err}"))
}
