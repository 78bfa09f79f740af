use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value as JsonValue;

use pipeboard_core::{Card, CardId, Pipeline, PipelineBoard, PipelineId, Stage, StageId};
use pipeboard_infra::CreatedCard;

use crate::app::dto::{self, DeletedResponse};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::SessionContext;

type Body<T> = Result<Json<T>, JsonRejection>;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_pipelines).post(create_pipeline))
        .route("/:id", get(get_pipeline).patch(rename_pipeline).delete(delete_pipeline))
        .route("/:id/stages", post(create_stage).patch(update_stages))
        .route("/:id/stages/:stage_id", axum::routing::delete(delete_stage))
        .route("/:id/cards", post(create_card).patch(update_card))
        .route("/:id/cards/:card_id", axum::routing::delete(delete_card))
        .route("/:id/cards/:card_id/move", post(move_card))
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipelines
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_pipelines(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<Pipeline>>> {
    Ok(Json(services.gateway().list_pipelines(session.session()).await?))
}

pub async fn create_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    body: Body<dto::PipelineNameRequest>,
) -> ApiResult<(StatusCode, Json<Pipeline>)> {
    let Json(body) = body?;
    let pipeline = services.gateway().create_pipeline(session.session(), body).await?;
    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// GET /pipeline/:id
///
/// Pipeline with stages in position order and cards grouped by stage.
pub async fn get_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<PipelineBoard>> {
    let id: PipelineId = id.parse()?;
    Ok(Json(services.gateway().get_board(session.session(), id).await?))
}

pub async fn rename_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Body<dto::PipelineNameRequest>,
) -> ApiResult<Json<Pipeline>> {
    let id: PipelineId = id.parse()?;
    let Json(body) = body?;
    Ok(Json(services.gateway().rename_pipeline(session.session(), id, body).await?))
}

pub async fn delete_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse<PipelineId>>> {
    let id: PipelineId = id.parse()?;
    services.gateway().delete_pipeline(session.session(), id).await?;
    Ok(Json(DeletedResponse::new(id)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

pub async fn create_stage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Body<dto::CreateStageRequest>,
) -> ApiResult<(StatusCode, Json<Stage>)> {
    let id: PipelineId = id.parse()?;
    let Json(body) = body?;
    let stage = services.gateway().create_stage(session.session(), id, body).await?;
    Ok((StatusCode::CREATED, Json(stage)))
}

/// PATCH /pipeline/:id/stages
///
/// Body is an array of `{ id, position?, name?, color? }`, applied atomically.
/// Returns the full stage collection in its new order.
pub async fn update_stages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Body<JsonValue>,
) -> ApiResult<Json<Vec<Stage>>> {
    let id: PipelineId = id.parse()?;
    let Json(body) = body?;
    let patches = dto::parse_stage_patches(body)?;
    Ok(Json(services.gateway().update_stages(session.session(), id, patches).await?))
}

pub async fn delete_stage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path((id, stage_id)): Path<(String, String)>,
) -> ApiResult<Json<DeletedResponse<StageId>>> {
    let id: PipelineId = id.parse()?;
    let stage_id: StageId = stage_id.parse()?;
    services.gateway().delete_stage(session.session(), id, stage_id).await?;
    Ok(Json(DeletedResponse::new(stage_id)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Cards
// ─────────────────────────────────────────────────────────────────────────────

/// POST /pipeline/:id/cards
///
/// Without `clientId` a placeholder client is created alongside the card and
/// returned as `client`.
pub async fn create_card(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Body<dto::CreateCardRequest>,
) -> ApiResult<(StatusCode, Json<CreatedCard>)> {
    let id: PipelineId = id.parse()?;
    let Json(body) = body?;
    let created = services.gateway().create_card(session.session(), id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_card(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Body<dto::UpdateCardRequest>,
) -> ApiResult<Json<Card>> {
    let id: PipelineId = id.parse()?;
    let Json(body) = body?;
    Ok(Json(services.gateway().update_card(session.session(), id, body).await?))
}

pub async fn move_card(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path((id, card_id)): Path<(String, String)>,
    body: Body<dto::MoveCardRequest>,
) -> ApiResult<Json<Card>> {
    let id: PipelineId = id.parse()?;
    let card_id: CardId = card_id.parse()?;
    let Json(body) = body?;
    Ok(Json(services.gateway().move_card(session.session(), id, card_id, body).await?))
}

pub async fn delete_card(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path((id, card_id)): Path<(String, String)>,
) -> ApiResult<Json<DeletedResponse<CardId>>> {
    let id: PipelineId = id.parse()?;
    let card_id: CardId = card_id.parse()?;
    services.gateway().delete_card(session.session(), id, card_id).await?;
    Ok(Json(DeletedResponse::new(card_id)))
}
