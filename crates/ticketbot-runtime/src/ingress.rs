//! Slack Events API ingress: verifies, filters and enqueues trigger reactions.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use ticketbot_core::current_unix_timestamp;
use ticketbot_slack::{
    parse_slack_event_payload, verify_slack_signature, AppMentionEvent, SlackApi,
    SlackCallbackEvent, SlackEventPayload, SLACK_SIGNATURE_HEADER, SLACK_TIMESTAMP_HEADER,
};
use tracing::{debug, info, trace, warn};

use crate::event_queue::EventSender;
use crate::reaction_event::ReactionEvent;

pub const SLACK_EVENTS_ENDPOINT: &str = "/slack";
pub const HEALTH_ENDPOINT: &str = "/health";
pub const ROOT_ENDPOINT: &str = "/";
pub const ROOT_BANNER: &str = "ticketbot: slack reactions to jira tickets";
pub const DEFAULT_MENTION_REPLY: &str = "Yes, hello.";

#[derive(Debug, Clone)]
pub struct IngressConfig {
    pub trigger_emoji: String,
    pub verification_token: Option<String>,
    pub signing_secret: Option<String>,
    /// Empty disables mention replies.
    pub mention_reply: String,
}

impl IngressConfig {
    pub fn new(trigger_emoji: impl Into<String>) -> Self {
        Self {
            trigger_emoji: trigger_emoji.into(),
            verification_token: None,
            signing_secret: None,
            mention_reply: DEFAULT_MENTION_REPLY.to_string(),
        }
    }
}

pub struct IngressState {
    config: IngressConfig,
    bot_user_id: String,
    sender: EventSender,
    slack: Arc<dyn SlackApi>,
}

impl IngressState {
    pub fn new(
        config: IngressConfig,
        bot_user_id: impl Into<String>,
        sender: EventSender,
        slack: Arc<dyn SlackApi>,
    ) -> Self {
        Self {
            config,
            bot_user_id: bot_user_id.into(),
            sender,
            slack,
        }
    }

    fn verify_signature(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), IngressError> {
        let Some(secret) = self.config.signing_secret.as_deref() else {
            return Ok(());
        };
        let timestamp = header_str(headers, SLACK_TIMESTAMP_HEADER)
            .ok_or_else(|| IngressError::SignatureRejected("missing timestamp header".into()))?;
        let signature = header_str(headers, SLACK_SIGNATURE_HEADER)
            .ok_or_else(|| IngressError::SignatureRejected("missing signature header".into()))?;
        verify_slack_signature(secret, timestamp, signature, body, current_unix_timestamp())
            .map_err(|error| IngressError::SignatureRejected(format!("{error:#}")))
    }

    fn verify_token(&self, payload: &SlackEventPayload) -> Result<(), IngressError> {
        match self.config.verification_token.as_deref() {
            Some(expected) if payload.token() != Some(expected) => {
                Err(IngressError::VerificationFailed)
            }
            _ => Ok(()),
        }
    }

    fn spawn_mention_reply(&self, mention: AppMentionEvent) {
        if self.config.mention_reply.is_empty()
            || mention.user.as_deref() == Some(self.bot_user_id.as_str())
        {
            return;
        }
        let slack = Arc::clone(&self.slack);
        let reply = self.config.mention_reply.clone();
        tokio::spawn(async move {
            let thread_ts = mention
                .thread_ts
                .as_deref()
                .filter(|value| !value.is_empty())
                .unwrap_or(&mention.ts);
            if let Err(error) = slack
                .post_message(&mention.channel, &reply, Some(thread_ts))
                .await
            {
                warn!(
                    channel = %mention.channel,
                    error = %format!("{error:#}"),
                    "failed to answer app mention"
                );
            }
        });
    }
}

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("invalid slack event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("slack verification token mismatch")]
    VerificationFailed,
    #[error("slack request signature rejected: {0}")]
    SignatureRejected(String),
    #[error("reaction event queue is closed")]
    QueueClosed,
}

impl IngressError {
    fn status(&self) -> StatusCode {
        match self {
            Self::SignatureRejected(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidPayload(_) | Self::VerificationFailed | Self::QueueClosed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "rejected slack webhook request");
        (status, self.to_string()).into_response()
    }
}

pub fn build_ingress_router(state: Arc<IngressState>) -> Router {
    Router::new()
        .route(SLACK_EVENTS_ENDPOINT, post(handle_slack_events))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .route(ROOT_ENDPOINT, get(handle_root))
        .with_state(state)
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_root() -> &'static str {
    ROOT_BANNER
}

async fn handle_slack_events(
    State(state): State<Arc<IngressState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, IngressError> {
    state.verify_signature(&headers, &body)?;
    let payload = parse_slack_event_payload(&body)?;
    state.verify_token(&payload)?;

    match payload {
        SlackEventPayload::UrlVerification { challenge, .. } => {
            info!("answering slack url verification challenge");
            Ok(([(CONTENT_TYPE, "text/plain")], challenge).into_response())
        }
        SlackEventPayload::EventCallback { event, .. } => {
            dispatch_callback_event(&state, event).await?;
            Ok(StatusCode::OK.into_response())
        }
        SlackEventPayload::Other { kind, .. } => {
            info!(kind = %kind, "ignoring unsupported slack payload type");
            Ok(StatusCode::OK.into_response())
        }
    }
}

async fn dispatch_callback_event(
    state: &IngressState,
    event: SlackCallbackEvent,
) -> Result<(), IngressError> {
    match event {
        SlackCallbackEvent::ReactionAdded(reaction) => {
            let Some(accepted) =
                ReactionEvent::accept(reaction, &state.config.trigger_emoji, &state.bot_user_id)
            else {
                trace!("discarding non-trigger reaction");
                return Ok(());
            };
            debug!(
                channel = %accepted.item_channel,
                ts = %accepted.item_ts,
                user = %accepted.reacting_user_id,
                "queueing ticket reaction"
            );
            state
                .sender
                .enqueue(accepted)
                .await
                .map_err(|_| IngressError::QueueClosed)
        }
        SlackCallbackEvent::AppMention(mention) => {
            state.spawn_mention_reply(mention);
            Ok(())
        }
        SlackCallbackEvent::Other { kind } => {
            info!(kind = %kind, "ignoring unsupported slack event");
            Ok(())
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
