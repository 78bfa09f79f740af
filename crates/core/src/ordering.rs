//! Ordering rules for stages within a pipeline and cards within a stage.
//!
//! Positions are sparse integers. Appending takes `max + POSITION_STEP` so that
//! inserting at the end never renumbers existing rows. Read order is
//! `(position, created_at, id)`; the last two only matter while a bulk reorder
//! is being built, since committed collections never hold duplicate positions.
//!
//! These functions are pure. Callers must run them inside the same store
//! transaction (or write guard) that persists the result, otherwise two
//! concurrent appends can both compute the same `max + step`.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::Stage;
use crate::error::{DomainError, DomainResult};
use crate::id::StageId;

/// Gap left between consecutive appended rows.
pub const POSITION_STEP: i64 = 1000;

/// Anything placed in an ordered collection.
pub trait Positioned {
    fn position(&self) -> i64;
    fn created_at(&self) -> DateTime<Utc>;
    fn tiebreak(&self) -> Uuid;
}

/// Read-order comparison: position, then creation time, then id.
pub fn compare<T: Positioned>(a: &T, b: &T) -> Ordering {
    a.position()
        .cmp(&b.position())
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.tiebreak().cmp(&b.tiebreak()))
}

pub fn sort_by_position<T: Positioned>(items: &mut [T]) {
    items.sort_by(compare);
}

/// Position for a row appended at the end of a collection.
///
/// Fails when the maximum is within one step of `i64::MAX`; the caller must
/// reorder (renumber) the collection before appending again.
pub fn next_position<I>(existing: I) -> DomainResult<i64>
where
    I: IntoIterator<Item = i64>,
{
    match existing.into_iter().max() {
        None => Ok(POSITION_STEP),
        Some(max) => max
            .checked_add(POSITION_STEP)
            .ok_or_else(|| DomainError::invariant("position space exhausted")),
    }
}

/// Resolve the position of a single inserted or moved row.
///
/// `None` appends at the end. An explicit position must not collide with a
/// sibling.
pub fn claim_position<I>(siblings: I, requested: Option<i64>) -> DomainResult<i64>
where
    I: IntoIterator<Item = i64>,
{
    match requested {
        None => next_position(siblings),
        Some(position) => {
            if siblings.into_iter().any(|p| p == position) {
                Err(DomainError::invariant(format!("position {position} is already taken")))
            } else {
                Ok(position)
            }
        }
    }
}

/// One entry of a bulk stage update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePatch {
    pub id: StageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Apply a bulk reorder/rename to a pipeline's full stage collection.
///
/// Returns the complete collection after the update, in read order. Nothing is
/// returned unless every patch is valid and the final positions are unique, so
/// the caller can commit the result as one unit or not at all.
pub fn apply_stage_patches(current: &[Stage], patches: &[StagePatch]) -> DomainResult<Vec<Stage>> {
    let mut seen = HashSet::with_capacity(patches.len());
    for patch in patches {
        if !seen.insert(patch.id) {
            return Err(DomainError::validation(format!("stage {} listed more than once", patch.id)));
        }
        if patch.position.is_none() && patch.name.is_none() && patch.color.is_none() {
            return Err(DomainError::validation(format!("stage {} has nothing to update", patch.id)));
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(DomainError::validation("stage name must not be empty"));
        }
    }

    let by_id: HashMap<StageId, &StagePatch> = patches.iter().map(|p| (p.id, p)).collect();
    if by_id.keys().any(|id| !current.iter().any(|s| s.id == *id)) {
        return Err(DomainError::not_found());
    }

    let mut next: Vec<Stage> = current
        .iter()
        .map(|stage| {
            let mut stage = stage.clone();
            if let Some(patch) = by_id.get(&stage.id) {
                if let Some(position) = patch.position {
                    stage.position = position;
                }
                if let Some(name) = &patch.name {
                    stage.name = name.trim().to_string();
                }
                if let Some(color) = &patch.color {
                    stage.color = Some(color.clone());
                }
            }
            stage
        })
        .collect();

    sort_by_position(&mut next);
    if let Some(pair) = next.windows(2).find(|w| w[0].position == w[1].position) {
        return Err(DomainError::invariant(format!(
            "stages {} and {} would share position {}",
            pair[0].id, pair[1].id, pair[0].position
        )));
    }

    Ok(next)
}
