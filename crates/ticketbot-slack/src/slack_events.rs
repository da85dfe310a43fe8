//! Slack Events API payload decoding.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::Value;

const URL_VERIFICATION: &str = "url_verification";
const EVENT_CALLBACK: &str = "event_callback";
const REACTION_ADDED: &str = "reaction_added";
const APP_MENTION: &str = "app_mention";

#[derive(Debug, Clone, Deserialize)]
struct SlackEventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    event: Option<Value>,
}

/// Item a reaction was attached to. File reactions carry no channel/ts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionAddedEvent {
    pub user: String,
    pub reaction: String,
    pub item: ReactionItem,
    #[serde(default)]
    pub event_ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppMentionEvent {
    #[serde(default)]
    pub user: Option<String>,
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackCallbackEvent {
    ReactionAdded(ReactionAddedEvent),
    AppMention(AppMentionEvent),
    Other { kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outer Events API payload after decoding.
pub enum SlackEventPayload {
    UrlVerification {
        challenge: String,
        token: Option<String>,
    },
    EventCallback {
        token: Option<String>,
        event: SlackCallbackEvent,
    },
    Other {
        kind: String,
        token: Option<String>,
    },
}

impl SlackEventPayload {
    /// Legacy verification token carried in the payload body, if any.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::UrlVerification { token, .. }
            | Self::EventCallback { token, .. }
            | Self::Other { token, .. } => token.as_deref(),
        }
    }
}

/// Decodes a raw Events API request body.
pub fn parse_slack_event_payload(body: &[u8]) -> Result<SlackEventPayload, serde_json::Error> {
    let envelope: SlackEventEnvelope = serde_json::from_slice(body)?;
    match envelope.kind.as_str() {
        URL_VERIFICATION => {
            let challenge = envelope
                .challenge
                .ok_or_else(|| serde_json::Error::custom("url_verification missing challenge"))?;
            Ok(SlackEventPayload::UrlVerification {
                challenge,
                token: envelope.token,
            })
        }
        EVENT_CALLBACK => {
            let event = envelope
                .event
                .ok_or_else(|| serde_json::Error::custom("event_callback missing event"))?;
            Ok(SlackEventPayload::EventCallback {
                token: envelope.token,
                event: parse_callback_event(event)?,
            })
        }
        _ => Ok(SlackEventPayload::Other {
            kind: envelope.kind,
            token: envelope.token,
        }),
    }
}

fn parse_callback_event(event: Value) -> Result<SlackCallbackEvent, serde_json::Error> {
    let kind = event
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| serde_json::Error::custom("callback event missing type"))?
        .to_string();
    match kind.as_str() {
        REACTION_ADDED => Ok(SlackCallbackEvent::ReactionAdded(serde_json::from_value(
            event,
        )?)),
        APP_MENTION => Ok(SlackCallbackEvent::AppMention(serde_json::from_value(event)?)),
        _ => Ok(SlackCallbackEvent::Other { kind }),
    }
}
