use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::{sanitize_summary, TicketCreator, TrackerError};

#[derive(Debug, Default)]
/// Ticket backend that never contacts a tracker.
///
/// Each call succeeds with a synthetic `<PROJECT>-DRYRUN-<n>` key so the full
/// reaction pipeline can be exercised against a live Slack workspace.
pub struct DryRunTicketCreator {
    issued: AtomicU64,
}

impl DryRunTicketCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued_count(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TicketCreator for DryRunTicketCreator {
    async fn create_ticket(
        &self,
        project: &str,
        title: &str,
        body: &str,
    ) -> Result<String, TrackerError> {
        let sequence = self.issued.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        let key = format!("{project}-DRYRUN-{sequence}");
        info!(
            project,
            ticket = %key,
            title = %sanitize_summary(title),
            body_chars = body.chars().count(),
            "dry-run ticket creation skipped tracker call"
        );
        Ok(key)
    }
}
