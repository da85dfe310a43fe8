//! Bounded handoff between HTTP ingress and the single reaction worker.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::event_processor::{EventOutcome, ReactionTicketProcessor};
use crate::reaction_event::ReactionEvent;

pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("reaction event queue is closed")]
pub struct QueueClosed;

#[derive(Debug, Clone)]
/// Producer half. Cloned into every request handler.
pub struct EventSender {
    inner: mpsc::Sender<ReactionEvent>,
}

impl EventSender {
    /// Waits for queue space when the worker is behind.
    pub async fn enqueue(&self, event: ReactionEvent) -> Result<(), QueueClosed> {
        self.inner.send(event).await.map_err(|_| QueueClosed)
    }
}

pub type EventReceiver = mpsc::Receiver<ReactionEvent>;

pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (inner, receiver) = mpsc::channel(capacity.max(1));
    (EventSender { inner }, receiver)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub processed: u64,
    pub created: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Drains events in arrival order until every sender is dropped.
pub async fn run_event_worker(
    mut processor: ReactionTicketProcessor,
    mut receiver: EventReceiver,
) -> WorkerSummary {
    let mut summary = WorkerSummary::default();
    info!("reaction worker started");
    while let Some(event) = receiver.recv().await {
        summary.processed = summary.processed.saturating_add(1);
        match processor.handle_event(&event).await {
            EventOutcome::TicketCreated { .. } => {
                summary.created = summary.created.saturating_add(1)
            }
            EventOutcome::AlreadyFiled => summary.skipped = summary.skipped.saturating_add(1),
            EventOutcome::Failed(_) => summary.failed = summary.failed.saturating_add(1),
        }
        debug!(processed = summary.processed, "reaction event finished");
    }
    info!(
        processed = summary.processed,
        created = summary.created,
        skipped = summary.skipped,
        failed = summary.failed,
        "reaction worker stopped"
    );
    summary
}
