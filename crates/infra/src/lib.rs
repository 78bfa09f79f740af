//! Infrastructure layer: the durable board store behind the mutation gateway.

pub mod store;

pub use store::{BoardStore, CardChanges, CreatedCard, InMemoryBoardStore, MovedCard, NewCard, NewStage, StoreError, StoreResult};

#[cfg(feature = "postgres")]
pub use store::PostgresBoardStore;
