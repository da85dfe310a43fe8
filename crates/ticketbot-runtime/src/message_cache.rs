//! Short-lived message cache keyed by `(channel, ts)`.
//!
//! Entries expire lazily: a lookup past the TTL evicts the entry and reports
//! a miss, and every insert sweeps expired entries so the map stays bounded
//! by the number of messages touched within one TTL window.

use std::collections::HashMap;

use ticketbot_core::is_expired_unix_ms;
use ticketbot_slack::SlackMessage;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub channel: String,
    pub ts: String,
}

impl MessageKey {
    pub fn new(channel: &str, ts: &str) -> Self {
        Self {
            channel: channel.to_string(),
            ts: ts.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedMessage {
    message: SlackMessage,
    stored_unix_ms: u64,
}

#[derive(Debug)]
pub struct MessageCache {
    ttl_ms: u64,
    entries: HashMap<MessageKey, CachedMessage>,
}

impl MessageCache {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &MessageKey, now_unix_ms: u64) -> Option<SlackMessage> {
        let cached = self.entries.get(key)?;
        if is_expired_unix_ms(cached.stored_unix_ms, self.ttl_ms, now_unix_ms) {
            self.entries.remove(key);
            return None;
        }
        Some(cached.message.clone())
    }

    pub fn insert(&mut self, key: MessageKey, message: SlackMessage, now_unix_ms: u64) {
        self.purge_expired(now_unix_ms);
        self.entries.insert(
            key,
            CachedMessage {
                message,
                stored_unix_ms: now_unix_ms,
            },
        );
    }

    pub fn invalidate(&mut self, key: &MessageKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn purge_expired(&mut self, now_unix_ms: u64) {
        let ttl_ms = self.ttl_ms;
        self.entries
            .retain(|_, cached| !is_expired_unix_ms(cached.stored_unix_ms, ttl_ms, now_unix_ms));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
