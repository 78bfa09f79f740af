//! Request/response DTOs.
//!
//! Request fields are optional at the serde level so that a missing field is
//! reported as `400` by the gateway rather than as a deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use pipeboard_core::{CardId, ClientId, OrganizationId, StageId, StagePatch, UserId};

use crate::app::errors::{ApiError, ApiResult};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PipelineNameRequest {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStageRequest {
    #[serde(alias = "title")]
    pub name: Option<String>,
    pub position: Option<i64>,
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub stage_id: Option<StageId>,
    pub title: Option<String>,
    pub value: Option<f64>,
    pub metadata: Option<JsonValue>,
    pub client_id: Option<ClientId>,
    pub client_name: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    pub id: Option<CardId>,
    pub title: Option<String>,
    pub value: Option<f64>,
    pub metadata: Option<JsonValue>,
    pub client_id: Option<ClientId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardRequest {
    pub stage_id: Option<StageId>,
    pub position: Option<i64>,
}

/// Body of `PATCH /pipeline/{id}/stages`: must be a JSON array of patches.
pub fn parse_stage_patches(body: JsonValue) -> ApiResult<Vec<StagePatch>> {
    if !body.is_array() {
        return Err(ApiError::bad_request("expected an array of stage updates"));
    }
    serde_json::from_value(body).map_err(|e| ApiError::bad_request(format!("invalid stage update: {e}")))
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub role: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse<I> {
    pub id: I,
    pub deleted: bool,
}

impl<I> DeletedResponse<I> {
    pub fn new(id: I) -> Self {
        Self { id, deleted: true }
    }
}
