//! Slack boundary for ticketbot.
//!
//! Holds the Web API capability consumed by the reaction processor, its
//! reqwest-backed implementation, Events API payload decoding, and inbound
//! request verification.

pub mod slack_api;
pub mod slack_api_client;
pub mod slack_events;
pub mod slack_verification;

pub use slack_api::{SlackApi, SlackMessage, SlackMessageReaction, SlackUserProfile};
pub use slack_api_client::{SlackApiClient, SlackApiClientConfig};
pub use slack_events::{
    parse_slack_event_payload, AppMentionEvent, ReactionAddedEvent, ReactionItem,
    SlackCallbackEvent, SlackEventPayload,
};
pub use slack_verification::{
    verify_slack_signature, SLACK_SIGNATURE_HEADER, SLACK_SIGNATURE_MAX_AGE_SECONDS,
    SLACK_TIMESTAMP_HEADER,
};
