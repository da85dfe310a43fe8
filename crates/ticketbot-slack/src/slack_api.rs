//! Slack Web API capability consumed by the reaction processor and ingress.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Profile fields ticketbot reads from `users.info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackUserProfile {
    pub user_id: String,
    pub email: Option<String>,
}

/// One reaction entry attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlackMessageReaction {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
}

/// A message as returned by the conversations APIs, keyed by `(channel, ts)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reactions: Vec<SlackMessageReaction>,
}

impl SlackMessage {
    /// Timestamp a threaded reply must target: the thread root when the
    /// message belongs to a thread, otherwise the message itself.
    pub fn reply_thread_ts(&self) -> &str {
        self.thread_ts
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(self.ts.as_str())
    }

    /// Returns true when `user_id` is among the users who added `reaction`.
    pub fn has_reaction_from(&self, reaction: &str, user_id: &str) -> bool {
        self.reactions
            .iter()
            .filter(|entry| entry.name == reaction)
            .any(|entry| entry.users.iter().any(|user| user == user_id))
    }
}

#[async_trait]
/// Trait contract for the Slack Web API calls ticketbot performs.
pub trait SlackApi: Send + Sync {
    /// Resolves the bot's own user id (`auth.test`).
    async fn resolve_bot_user_id(&self) -> Result<String>;

    async fn user_profile(&self, user_id: &str) -> Result<SlackUserProfile>;

    /// Returns at most one message at or before `latest_ts` (inclusive).
    async fn conversation_history(&self, channel: &str, latest_ts: &str)
        -> Result<Vec<SlackMessage>>;

    /// Returns the thread that contains `ts`, root first.
    async fn conversation_replies(&self, channel: &str, ts: &str) -> Result<Vec<SlackMessage>>;

    async fn permalink(&self, channel: &str, ts: &str) -> Result<String>;

    async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>)
        -> Result<()>;

    async fn post_ephemeral(
        &self,
        channel: &str,
        user_id: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<()>;

    async fn add_reaction(&self, name: &str, channel: &str, ts: &str) -> Result<()>;

    async fn remove_reaction(&self, name: &str, channel: &str, ts: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::{SlackMessage, SlackMessageReaction};

    fn message(ts: &str, thread_ts: Option<&str>) -> SlackMessage {
        SlackMessage {
            channel: "C1".to_string(),
            ts: ts.to_string(),
            thread_ts: thread_ts.map(ToOwned::to_owned),
            text: "hello".to_string(),
            reactions: Vec::new(),
        }
    }

    #[test]
    fn unit_reply_thread_ts_prefers_thread_root() {
        assert_eq!(message("100.1", None).reply_thread_ts(), "100.1");
        assert_eq!(message("100.1", Some("100.1")).reply_thread_ts(), "100.1");
        assert_eq!(message("100.2", Some("100.1")).reply_thread_ts(), "100.1");
    }

    #[test]
    fn regression_reply_thread_ts_ignores_blank_thread_ts() {
        assert_eq!(message("100.1", Some("")).reply_thread_ts(), "100.1");
    }

    #[test]
    fn unit_has_reaction_from_requires_matching_name_and_user() {
        let mut message = message("1.0", None);
        message.reactions = vec![
            SlackMessageReaction {
                name: "+1".to_string(),
                users: vec!["U1".to_string()],
            },
            SlackMessageReaction {
                name: "eyes".to_string(),
                users: vec!["UBOT".to_string()],
            },
        ];
        assert!(message.has_reaction_from("+1", "U1"));
        assert!(!message.has_reaction_from("+1", "UBOT"));
        assert!(message.has_reaction_from("eyes", "UBOT"));
    }
}
