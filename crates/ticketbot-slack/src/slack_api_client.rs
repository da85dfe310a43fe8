//! Slack Web API client used by the reaction processor and webhook ingress.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use ticketbot_core::{
    is_retryable_http_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use tracing::debug;

use crate::slack_api::{SlackApi, SlackMessage, SlackUserProfile};

const RETRY_ATTEMPT_HEADER: &str = "x-ticketbot-retry-attempt";

#[derive(Debug, Clone, Deserialize)]
struct SlackAckResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackAuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUserInfoResponse {
    ok: bool,
    user: Option<SlackUserPayload>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUserPayload {
    id: String,
    #[serde(default)]
    profile: SlackUserProfilePayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackUserProfilePayload {
    email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackMessagesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackPermalinkResponse {
    ok: bool,
    permalink: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
/// Connection settings for [`SlackApiClient`].
pub struct SlackApiClientConfig {
    pub api_base: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Clone)]
/// reqwest-backed [`SlackApi`] implementation.
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl SlackApiClient {
    pub fn new(config: SlackApiClientConfig) -> Result<Self> {
        let bot_token = config.bot_token.trim().to_string();
        if bot_token.is_empty() {
            bail!("slack bot token cannot be empty");
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
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    async fn post_json_ack(&self, method: &str, payload: &Value) -> Result<()> {
        let response: SlackAckResponse = self
            .request_json(method, || {
                self.http
                    .post(self.method_url(method))
                    .bearer_auth(&self.bot_token)
                    .json(payload)
            })
            .await?;
        ensure_slack_ok(method, response.ok, response.error)
    }

    async fn request_json<T, F>(&self, operation: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode slack {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_http_status(status.as_u16())
                    {
                        debug!(
                            operation,
                            attempt,
                            status = status.as_u16(),
                            "retrying slack api call"
                        );
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "slack api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        debug!(operation, attempt, %error, "retrying slack api transport error");
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("slack api {operation} request failed"));
                }
            }
        }
    }
}

#[async_trait]
impl SlackApi for SlackApiClient {
    async fn resolve_bot_user_id(&self) -> Result<String> {
        let response: SlackAuthTestResponse = self
            .request_json("auth.test", || {
                self.http
                    .post(self.method_url("auth.test"))
                    .bearer_auth(&self.bot_token)
            })
            .await?;
        ensure_slack_ok("auth.test", response.ok, response.error)?;
        response
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    async fn user_profile(&self, user_id: &str) -> Result<SlackUserProfile> {
        let response: SlackUserInfoResponse = self
            .request_json("users.info", || {
                self.http
                    .get(self.method_url("users.info"))
                    .bearer_auth(&self.bot_token)
                    .query(&[("user", user_id)])
            })
            .await?;
        ensure_slack_ok("users.info", response.ok, response.error)?;
        let user = response
            .user
            .ok_or_else(|| anyhow!("slack users.info response missing user"))?;
        Ok(SlackUserProfile {
            user_id: user.id,
            email: user
                .profile
                .email
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty()),
        })
    }

    async fn conversation_history(
        &self,
        channel: &str,
        latest_ts: &str,
    ) -> Result<Vec<SlackMessage>> {
        let response: SlackMessagesResponse = self
            .request_json("conversations.history", || {
                self.http
                    .get(self.method_url("conversations.history"))
                    .bearer_auth(&self.bot_token)
                    .query(&[
                        ("channel", channel),
                        ("latest", latest_ts),
                        ("inclusive", "true"),
                        ("limit", "1"),
                    ])
            })
            .await?;
        ensure_slack_ok("conversations.history", response.ok, response.error)?;
        Ok(with_channel(response.messages, channel))
    }

    async fn conversation_replies(&self, channel: &str, ts: &str) -> Result<Vec<SlackMessage>> {
        let response: SlackMessagesResponse = self
            .request_json("conversations.replies", || {
                self.http
                    .get(self.method_url("conversations.replies"))
                    .bearer_auth(&self.bot_token)
                    .query(&[("channel", channel), ("ts", ts)])
            })
            .await?;
        ensure_slack_ok("conversations.replies", response.ok, response.error)?;
        Ok(with_channel(response.messages, channel))
    }

    async fn permalink(&self, channel: &str, ts: &str) -> Result<String> {
        let response: SlackPermalinkResponse = self
            .request_json("chat.getPermalink", || {
                self.http
                    .get(self.method_url("chat.getPermalink"))
                    .bearer_auth(&self.bot_token)
                    .query(&[("channel", channel), ("message_ts", ts)])
            })
            .await?;
        ensure_slack_ok("chat.getPermalink", response.ok, response.error)?;
        response
            .permalink
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack chat.getPermalink did not return permalink"))
    }

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }
        self.post_json_ack("chat.postMessage", &payload).await
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user_id: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({
            "channel": channel,
            "user": user_id,
            "text": text,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }
        self.post_json_ack("chat.postEphemeral", &payload).await
    }

    async fn add_reaction(&self, name: &str, channel: &str, ts: &str) -> Result<()> {
        let payload = json!({
            "name": name,
            "channel": channel,
            "timestamp": ts,
        });
        self.post_json_ack("reactions.add", &payload).await
    }

    async fn remove_reaction(&self, name: &str, channel: &str, ts: &str) -> Result<()> {
        let payload = json!({
            "name": name,
            "channel": channel,
            "timestamp": ts,
        });
        self.post_json_ack("reactions.remove", &payload).await
    }
}

fn ensure_slack_ok(operation: &str, ok: bool, error: Option<String>) -> Result<()> {
    if ok {
        return Ok(());
    }
    bail!(
        "slack {operation} failed: {}",
        error.unwrap_or_else(|| "unknown error".to_string())
    )
}

fn with_channel(mut messages: Vec<SlackMessage>, channel: &str) -> Vec<SlackMessage> {
    for message in &mut messages {
        if message.channel.is_empty() {
            message.channel = channel.to_string();
        }
    }
    messages
}
