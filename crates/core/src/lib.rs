//! `pipeboard-core`: domain foundation for the pipeline board.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! identifiers, board entities, the error model and the ordering rules for
//! stages and cards.

pub mod board;
pub mod error;
pub mod id;
pub mod ordering;

pub use board::{Card, Client, Pipeline, PipelineBoard, Stage};
pub use error::{DomainError, DomainResult};
pub use id::{CardId, ClientId, OrganizationId, PipelineId, StageId, UserId};
pub use ordering::{Positioned, StagePatch, POSITION_STEP};
