//! Jira REST API ticket backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use ticketbot_core::{parse_retry_after, retry_delay, truncate_for_error};
use tracing::{debug, info};

use crate::{sanitize_summary, TicketCreator, TrackerError};

pub const DEFAULT_JIRA_ISSUE_TYPE: &str = "Task";
const JIRA_CREATE_ISSUE_PATH: &str = "/rest/api/2/issue";
const RETRY_ATTEMPT_HEADER: &str = "x-ticketbot-retry-attempt";

#[derive(Debug, Clone)]
/// Connection settings for [`JiraTicketClient`].
pub struct JiraClientConfig {
    pub api_base: String,
    pub username: String,
    pub token: String,
    pub issue_type: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraCreateIssueResponse {
    key: Option<String>,
    id: Option<String>,
}

#[derive(Clone)]
pub struct JiraTicketClient {
    http: reqwest::Client,
    create_issue_url: String,
    username: String,
    token: String,
    issue_type: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl JiraTicketClient {
    pub fn new(config: JiraClientConfig) -> Result<Self, TrackerError> {
        let api_base = config.api_base.trim().trim_end_matches('/');
        if api_base.is_empty() {
            return Err(TrackerError::MissingCredentials("jira url"));
        }
        if config.username.trim().is_empty() {
            return Err(TrackerError::MissingCredentials("jira username"));
        }
        if config.token.trim().is_empty() {
            return Err(TrackerError::MissingCredentials("jira token"));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("ticketbot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        let issue_type = match config.issue_type.trim() {
            "" => DEFAULT_JIRA_ISSUE_TYPE.to_string(),
            value => value.to_string(),
        };

        Ok(Self {
            http,
            create_issue_url: format!("{api_base}{JIRA_CREATE_ISSUE_PATH}"),
            username: config.username.trim().to_string(),
            token: config.token.trim().to_string(),
            issue_type,
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }
}

#[async_trait]
impl TicketCreator for JiraTicketClient {
    async fn create_ticket(
        &self,
        project: &str,
        title: &str,
        body: &str,
    ) -> Result<String, TrackerError> {
        let payload = json!({
            "fields": {
                "project": {"key": project},
                "summary": sanitize_summary(title),
                "description": body,
                "issuetype": {"name": self.issue_type},
            }
        });

        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = self
                .http
                .post(&self.create_issue_url)
                .basic_auth(&self.username, Some(&self.token))
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .json(&payload)
                .send()
                .await;
            let response = match response {
                Ok(response) => response,
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_replay_safe_transport_error(&error)
                    {
                        debug!(attempt, %error, "retrying jira issue creation");
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(TrackerError::Http(error));
                }
            };

            let status = response.status();
            if status.is_success() {
                let created: JiraCreateIssueResponse = response
                    .json()
                    .await
                    .map_err(|error| TrackerError::InvalidResponse(error.to_string()))?;
                let key = created
                    .key
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| {
                        TrackerError::InvalidResponse(
                            "jira create issue response missing key".to_string(),
                        )
                    })?;
                info!(
                    project,
                    ticket = %key,
                    issue_id = created.id.as_deref().unwrap_or_default(),
                    "jira issue created"
                );
                return Ok(key);
            }

            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            if attempt < self.retry_max_attempts && is_replay_safe_status(status.as_u16()) {
                debug!(attempt, status = status.as_u16(), "retrying jira issue creation");
                tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, retry_after))
                    .await;
                continue;
            }
            return Err(TrackerError::HttpStatus {
                status: status.as_u16(),
                body: truncate_for_error(&body, 800),
            });
        }
    }
}

// Issue creation is not idempotent. Only failures where Jira cannot have
// created the issue are retried.
fn is_replay_safe_transport_error(error: &reqwest::Error) -> bool {
    error.is_connect()
}

fn is_replay_safe_status(status: u16) -> bool {
    status == 429
}
