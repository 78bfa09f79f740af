//! Per-connection board event stream.
//!
//! A [`StreamSession`] owns everything one connection holds on to: the bus
//! subscription, its bounded event buffer and the keepalive timer. All of it
//! is released when the session is dropped, which is what happens on client
//! disconnect, transport error or cancellation of the response future.
//!
//! Frame order: one `Retry` first, then `Event`s and `KeepAlive`s as they
//! arrive.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::response::sse::Event as SseEvent;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_stream::Stream;

use pipeboard_core::OrganizationId;
use pipeboard_events::{DeliveryError, EventBus, PipelineEvent, Subscription};

use crate::config::StreamSettings;

/// One wire message of the stream.
///
/// Rendered by axum as `retry:5000`, `: ` (empty comment) and `data:{json}`,
/// each followed by a blank line. Event-stream parsers strip one optional
/// space after the colon, so these are the same messages as `retry: 5000` and
/// a bare `:` keepalive.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Retry(Duration),
    Event(PipelineEvent),
    KeepAlive,
}

impl Frame {
    pub fn into_sse(self) -> SseEvent {
        match self {
            Frame::Retry(retry) => SseEvent::default().retry(retry),
            Frame::Event(event) => SseEvent::default().json_data(&event).unwrap_or_else(|e| {
                tracing::warn!(error = %e, event_type = %event.event_type, "failed to encode event; sending keepalive");
                SseEvent::default().comment("")
            }),
            Frame::KeepAlive => SseEvent::default().comment(""),
        }
    }
}

pub struct StreamSession {
    organization_id: OrganizationId,
    retry: Option<Duration>,
    events: mpsc::Receiver<PipelineEvent>,
    keepalive: Interval,
    lagged: Arc<AtomicBool>,
    subscription: Subscription,
    opened_at: Instant,
}

impl StreamSession {
    /// Subscribe to `organization_id` and start the keepalive timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(bus: &dyn EventBus<PipelineEvent>, organization_id: OrganizationId, settings: StreamSettings) -> Self {
        let (tx, rx) = mpsc::channel(settings.buffer.max(1));
        let lagged = Arc::new(AtomicBool::new(false));

        let flag = lagged.clone();
        let subscription = bus.subscribe(
            organization_id,
            Box::new(move |event: &PipelineEvent| {
                // Once lagged the session is finished; let the bus drop us even
                // if the response body is never polled again.
                if flag.load(Ordering::Acquire) {
                    return Err(DeliveryError::Closed);
                }
                match tx.try_send(event.clone()) {
                    Ok(()) => Ok(()),
                    Err(TrySendError::Full(_)) => {
                        flag.store(true, Ordering::Release);
                        Err(DeliveryError::Lagged)
                    }
                    Err(TrySendError::Closed(_)) => Err(DeliveryError::Closed),
                }
            }),
        );

        let mut keepalive = tokio::time::interval_at(Instant::now() + settings.keepalive, settings.keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(%organization_id, "event stream opened");

        Self {
            organization_id,
            retry: Some(settings.retry),
            events: rx,
            keepalive,
            lagged,
            subscription,
            opened_at: Instant::now(),
        }
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Whether this session fell behind and stopped.
    pub fn is_lagged(&self) -> bool {
        self.lagged.load(Ordering::Acquire)
    }
}

impl Stream for StreamSession {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        let this = self.get_mut();

        if let Some(retry) = this.retry.take() {
            return Poll::Ready(Some(Frame::Retry(retry)));
        }

        // A lagged client has missed events; end so it reconnects and reloads.
        if this.is_lagged() {
            return Poll::Ready(None);
        }

        match this.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => return Poll::Ready(Some(Frame::Event(event))),
            Poll::Ready(None) => return Poll::Ready(None),
            Poll::Pending => {}
        }

        match this.keepalive.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(Some(Frame::KeepAlive)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
        tracing::info!(
            organization_id = %self.organization_id,
            lagged = self.is_lagged(),
            open_ms = self.opened_at.elapsed().as_millis() as u64,
            "event stream closed"
        );
    }
}
