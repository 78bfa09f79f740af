//! Service wiring: one store, one bus, shared by every handler.

use std::sync::Arc;

use pipeboard_core::OrganizationId;
use pipeboard_events::{EventBus, InMemoryEventBus, PipelineEvent};
use pipeboard_infra::{BoardStore, InMemoryBoardStore};

use crate::app::gateway::MutationGateway;
use crate::app::stream::StreamSession;
use crate::config::{ApiConfig, StreamSettings};

#[derive(Clone)]
pub struct AppServices {
    gateway: MutationGateway,
    bus: Arc<dyn EventBus<PipelineEvent>>,
    stream: StreamSettings,
}

impl AppServices {
    pub fn new(store: Arc<dyn BoardStore>, bus: Arc<dyn EventBus<PipelineEvent>>, stream: StreamSettings) -> Self {
        Self {
            gateway: MutationGateway::new(store, bus.clone()),
            bus,
            stream,
        }
    }

    pub fn gateway(&self) -> &MutationGateway {
        &self.gateway
    }

    /// Subscribe a new stream session to `organization_id`.
    pub fn open_stream(&self, organization_id: OrganizationId) -> StreamSession {
        StreamSession::open(self.bus.as_ref(), organization_id, self.stream)
    }
}

/// Build services from config. The bus is created here, once per process.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let bus: Arc<dyn EventBus<PipelineEvent>> = Arc::new(InMemoryEventBus::<PipelineEvent>::new());
    let store = build_store(config).await?;
    Ok(AppServices::new(store, bus, config.stream))
}

#[cfg(feature = "postgres")]
async fn build_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn BoardStore>> {
    if let Some(url) = config.database_url.as_deref() {
        let store = pipeboard_infra::PostgresBoardStore::connect(url).await?;
        tracing::info!("using postgres board store");
        return Ok(Arc::new(store));
    }
    tracing::info!("DATABASE_URL not set; using in-memory board store");
    Ok(Arc::new(InMemoryBoardStore::new()))
}

#[cfg(not(feature = "postgres"))]
async fn build_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn BoardStore>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the postgres feature is not enabled; using in-memory board store");
    }
    Ok(Arc::new(InMemoryBoardStore::new()))
}
