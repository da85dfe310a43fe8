//! Issue-tracker boundary for ticketbot.
//!
//! `TicketCreator` is the single capability the reaction processor needs.
//! `JiraTicketClient` files tickets through the Jira REST API and
//! `DryRunTicketCreator` accepts every request without network access.

mod dry_run;
mod jira_client;

use async_trait::async_trait;
use thiserror::Error;

pub use dry_run::DryRunTicketCreator;
pub use jira_client::{JiraClientConfig, JiraTicketClient, DEFAULT_JIRA_ISSUE_TYPE};

#[derive(Debug, Error)]
/// Failures surfaced by ticket backends.
pub enum TrackerError {
    #[error("missing tracker credentials: {0}")]
    MissingCredentials(&'static str),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tracker returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid tracker response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
/// Trait contract for filing a ticket and returning its identifier.
pub trait TicketCreator: Send + Sync {
    async fn create_ticket(
        &self,
        project: &str,
        title: &str,
        body: &str,
    ) -> Result<String, TrackerError>;
}

/// Replaces line breaks with spaces so the title is a valid single-line
/// summary. Other whitespace is kept as is.
pub fn sanitize_summary(title: &str) -> String {
    title.replace("\r\n", " ").replace(['\r', '\n'], " ")
}
